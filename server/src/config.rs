//! Server configuration

use serde::Deserialize;

use crate::domain::execution::Language;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Wall-clock timeout for transient code runs, in seconds
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout_secs: u64,

    /// How long to wait before probing a freshly launched dashboard process
    #[serde(default = "default_probe_delay")]
    pub probe_delay_secs: u64,

    /// Grace period between SIGTERM and SIGKILL when terminating a dashboard
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    /// Python interpreter command
    #[serde(default = "default_python_cmd")]
    pub python_cmd: String,

    /// Node.js interpreter command
    #[serde(default = "default_node_cmd")]
    pub node_cmd: String,

    /// Streamlit launcher command
    #[serde(default = "default_streamlit_cmd")]
    pub streamlit_cmd: String,

    /// Google API key for the step generator
    #[serde(default)]
    pub google_api_key: Option<String>,

    /// Gemini model used for project and step generation
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Base URL of the Generative Language API
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8001
}

fn default_exec_timeout() -> u64 {
    10
}

fn default_probe_delay() -> u64 {
    2
}

fn default_grace_period() -> u64 {
    3
}

fn default_python_cmd() -> String {
    "python3".to_string()
}

fn default_node_cmd() -> String {
    "node".to_string()
}

fn default_streamlit_cmd() -> String {
    "streamlit".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Config::default();

        if let Ok(val) = std::env::var("CODEAWARE_HTTP_HOST") {
            config.http_host = val;
        }
        if let Ok(val) = std::env::var("CODEAWARE_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http_port = port;
            }
        }
        if let Ok(val) = std::env::var("CODEAWARE_EXEC_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                config.exec_timeout_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("CODEAWARE_PROBE_DELAY") {
            if let Ok(secs) = val.parse() {
                config.probe_delay_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("CODEAWARE_GRACE_PERIOD") {
            if let Ok(secs) = val.parse() {
                config.grace_period_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("CODEAWARE_PYTHON_CMD") {
            config.python_cmd = val;
        }
        if let Ok(val) = std::env::var("CODEAWARE_NODE_CMD") {
            config.node_cmd = val;
        }
        if let Ok(val) = std::env::var("CODEAWARE_STREAMLIT_CMD") {
            config.streamlit_cmd = val;
        }
        if let Ok(val) = std::env::var("GOOGLE_API_KEY") {
            config.google_api_key = Some(val);
        }
        if let Ok(val) = std::env::var("CODEAWARE_GEMINI_MODEL") {
            config.gemini_model = val;
        }
        if let Ok(val) = std::env::var("CODEAWARE_GEMINI_BASE_URL") {
            config.gemini_base_url = val;
        }

        Ok(config)
    }

    /// Resolve the interpreter command for a process-backed language.
    ///
    /// Markup languages are rendered statically and have no interpreter.
    pub fn interpreter_for(&self, language: Language) -> Option<&str> {
        match language {
            Language::Python => Some(&self.python_cmd),
            Language::Javascript => Some(&self.node_cmd),
            Language::Html | Language::Css => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            exec_timeout_secs: default_exec_timeout(),
            probe_delay_secs: default_probe_delay(),
            grace_period_secs: default_grace_period(),
            python_cmd: default_python_cmd(),
            node_cmd: default_node_cmd(),
            streamlit_cmd: default_streamlit_cmd(),
            google_api_key: None,
            gemini_model: default_gemini_model(),
            gemini_base_url: default_gemini_base_url(),
        }
    }
}
