//! Execution domain model

use serde::{Deserialize, Serialize};

/// Languages accepted by the execution endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Html,
    Css,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Html => "html",
            Language::Css => "css",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "python" => Some(Language::Python),
            "javascript" => Some(Language::Javascript),
            "html" => Some(Language::Html),
            "css" => Some(Language::Css),
            _ => None,
        }
    }

    /// File extension used when persisting source to a temporary file
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Python => ".py",
            Language::Javascript => ".js",
            Language::Html => ".html",
            Language::Css => ".css",
        }
    }
}

/// Structured result of one execution request.
///
/// Produced exactly once per request and returned synchronously, even when
/// the underlying work (a dashboard process) continues after the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub execution_id: String,
    pub is_dashboard: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_port: Option<u16>,

    /// Set when a dashboard launch was attempted but the process died early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_error: Option<bool>,

    /// Markup echoed back for client-side rendering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,

    /// Stylesheet echoed back for client-side rendering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_content: Option<String>,
}

impl ExecutionOutcome {
    /// Empty successful outcome for the given execution id
    pub fn new(execution_id: String) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            execution_id,
            is_dashboard: false,
            dashboard_url: None,
            dashboard_port: None,
            dashboard_error: None,
            html_content: None,
            css_content: None,
        }
    }

    /// Outcome for a failure of the launch machinery (missing interpreter,
    /// permission denied). Reported as data, not as a protocol error.
    pub fn launch_failure(execution_id: String, message: String) -> Self {
        Self {
            stderr: message,
            exit_code: -1,
            ..Self::new(execution_id)
        }
    }

    /// Outcome for a run that exceeded the wall-clock budget
    pub fn timed_out(execution_id: String) -> Self {
        Self {
            stderr: "Execution timed out".to_string(),
            exit_code: -1,
            ..Self::new(execution_id)
        }
    }
}

/// Coarse language classification of arbitrary source text.
///
/// Deliberately crude substring heuristics, kept for compatibility with the
/// historical behavior; callers fall back to the session's project type when
/// classification fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedLanguage {
    Known(Language),
    Unknown,
}

/// Classify source text by its most telling substrings
pub fn classify_source(code: &str) -> DetectedLanguage {
    if code.is_empty() {
        return DetectedLanguage::Unknown;
    }

    if code.contains("<html") || code.contains("<body") || code.contains("<div") {
        DetectedLanguage::Known(Language::Html)
    } else if code.contains('{')
        && (code.contains("font") || code.contains("color") || code.contains("margin"))
    {
        DetectedLanguage::Known(Language::Css)
    } else if code.contains("function")
        || code.contains("var ")
        || code.contains("const ")
        || code.contains("let ")
    {
        DetectedLanguage::Known(Language::Javascript)
    } else if code.contains("import") || code.contains("def ") || code.contains("print(") {
        DetectedLanguage::Known(Language::Python)
    } else {
        DetectedLanguage::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_round_trip() {
        for tag in ["python", "javascript", "html", "css"] {
            let lang = Language::from_str(tag).unwrap();
            assert_eq!(lang.as_str(), tag);
        }
        assert_eq!(Language::from_str("ruby"), None);
        assert_eq!(Language::from_str("Python"), None);
    }

    #[test]
    fn classify_markup() {
        assert_eq!(
            classify_source("<div>hello</div>"),
            DetectedLanguage::Known(Language::Html)
        );
        assert_eq!(
            classify_source("p { color: red; }"),
            DetectedLanguage::Known(Language::Css)
        );
    }

    #[test]
    fn classify_scripts() {
        assert_eq!(
            classify_source("const x = 1;"),
            DetectedLanguage::Known(Language::Javascript)
        );
        assert_eq!(
            classify_source("def main():\n    print('hi')"),
            DetectedLanguage::Known(Language::Python)
        );
    }

    #[test]
    fn classify_unknown() {
        assert_eq!(classify_source(""), DetectedLanguage::Unknown);
        assert_eq!(classify_source("hello world"), DetectedLanguage::Unknown);
    }
}
