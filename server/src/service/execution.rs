//! Code execution service
//!
//! Dispatches submitted code to an execution strategy by language: a
//! transient interpreter run for Python and JavaScript, a detached dashboard
//! launch for Streamlit-style Python, or a static render for markup.

use std::io::Write;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::Signal;
use tokio::process::Command;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::execution::{ExecutionOutcome, Language};
use crate::error::{Error, Result};
use crate::service::registry::{self, DashboardRegistry};

/// Executes user-submitted code and produces structured outcomes.
///
/// A crashing or timing-out user program is an expected result, reported in
/// the outcome record; only failures of the machinery itself (temp file
/// creation, and similar) surface as errors.
pub struct ExecutionService {
    config: Arc<Config>,
    registry: Arc<DashboardRegistry>,
}

impl ExecutionService {
    pub fn new(config: Arc<Config>, registry: Arc<DashboardRegistry>) -> Self {
        Self { config, registry }
    }

    /// Execute code in the given language.
    ///
    /// A fresh execution id is generated per call, static renders included,
    /// for API uniformity. Callers resubmitting a dashboard may pass the
    /// previous id so the old process is replaced instead of leaked.
    #[instrument(skip(self, code), fields(language = language.as_str()))]
    pub async fn execute(
        &self,
        code: &str,
        language: Language,
        requested_id: Option<String>,
    ) -> Result<ExecutionOutcome> {
        let execution_id = requested_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        debug!(execution_id, code_len = code.len(), "Executing code");

        match language {
            Language::Python if is_dashboard_source(code) => {
                self.start_dashboard(code, execution_id).await
            }
            Language::Python | Language::Javascript => {
                let program = self
                    .config
                    .interpreter_for(language)
                    .ok_or_else(|| Error::UnsupportedLanguage(language.as_str().to_string()))?;
                self.run_transient(code, program, language.extension(), execution_id)
                    .await
            }
            Language::Html => {
                let mut outcome = ExecutionOutcome::new(execution_id);
                outcome.html_content = Some(code.to_string());
                Ok(outcome)
            }
            Language::Css => {
                let mut outcome = ExecutionOutcome::new(execution_id);
                outcome.css_content = Some(code.to_string());
                Ok(outcome)
            }
        }
    }

    /// Run a short-lived interpreter process against a temporary source file.
    ///
    /// Output is captured in full; no streaming, since snippets are expected to
    /// finish well inside the timeout. On timeout the whole process group is
    /// killed so no interpreter (or anything it spawned) is left behind. The
    /// temporary file is removed when this function returns.
    async fn run_transient(
        &self,
        code: &str,
        program: &str,
        extension: &str,
        execution_id: String,
    ) -> Result<ExecutionOutcome> {
        let mut file = tempfile::Builder::new()
            .prefix("codeaware-")
            .suffix(extension)
            .tempfile()?;
        file.write_all(code.as_bytes())?;
        file.flush()?;

        let mut cmd = Command::new(program);
        cmd.arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Ok(ExecutionOutcome::launch_failure(
                    execution_id,
                    format!("Failed to launch {program}: {e}"),
                ));
            }
        };

        let pid = child.id();
        let timeout = Duration::from_secs(self.config.exec_timeout_secs);

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let mut outcome = ExecutionOutcome::new(execution_id);
                outcome.stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                outcome.stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                outcome.exit_code = output.status.code().unwrap_or(-1);
                debug!(exit_code = outcome.exit_code, "Transient run completed");
                Ok(outcome)
            }
            Ok(Err(e)) => Ok(ExecutionOutcome::launch_failure(
                execution_id,
                format!("Failed to collect process output: {e}"),
            )),
            Err(_) => {
                // The child future is dropped at this point (SIGKILL via
                // kill_on_drop); the group signal also reaches anything the
                // interpreter spawned.
                if let Some(pid) = pid {
                    registry::signal_group(pid, Signal::SIGKILL);
                }
                debug!(execution_id, "Transient run timed out");
                Ok(ExecutionOutcome::timed_out(execution_id))
            }
        }
    }

    /// Launch a Streamlit dashboard via the registry.
    ///
    /// The source file is persisted (not auto-deleted): the dashboard keeps
    /// reading it for as long as it runs, and nothing tracks when that ends.
    /// The file leaks with the process, an accepted cost of the detached
    /// design.
    async fn start_dashboard(&self, code: &str, execution_id: String) -> Result<ExecutionOutcome> {
        let mut file = tempfile::Builder::new()
            .prefix("codeaware-")
            .suffix(".py")
            .tempfile()?;
        file.write_all(code.as_bytes())?;
        file.flush()?;
        let (_persisted, path) = file
            .keep()
            .map_err(|e| Error::Internal(e.to_string()))?;

        let port = registry::derive_port(&execution_id);
        let args = dashboard_args(&path.to_string_lossy(), port);

        Ok(self
            .registry
            .start(&execution_id, port, &self.config.streamlit_cmd, &args)
            .await)
    }
}

/// Whether Python source is a Streamlit-style dashboard app
pub fn is_dashboard_source(code: &str) -> bool {
    code.contains("import streamlit") || code.contains("from streamlit")
}

/// Streamlit launch arguments: headless, fixed bind address, computed port
fn dashboard_args(path: &str, port: u16) -> Vec<String> {
    vec![
        "run".to_string(),
        path.to_string(),
        "--server.address".to_string(),
        "localhost".to_string(),
        "--server.port".to_string(),
        port.to_string(),
        "--server.headless".to_string(),
        "true".to_string(),
        "--server.runOnSave".to_string(),
        "true".to_string(),
        "--browser.serverAddress".to_string(),
        "localhost".to_string(),
        "--browser.gatherUsageStats".to_string(),
        "false".to_string(),
    ]
}

/// Compose markup and stylesheet into one self-contained document.
///
/// Pure text interleaving with no sanitization, since the result is rendered
/// back to the user who submitted it.
pub fn render_website(html_code: &str, css_code: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
             <style>\n\
             {css_code}\n\
             </style>\n\
         </head>\n\
         <body>\n\
         {html_code}\n\
         </body>\n\
         </html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn service_with_timeout(secs: u64) -> ExecutionService {
        let config = Arc::new(Config {
            exec_timeout_secs: secs,
            ..Config::default()
        });
        let registry = Arc::new(DashboardRegistry::new(
            Duration::from_millis(300),
            Duration::from_secs(1),
        ));
        ExecutionService::new(config, registry)
    }

    #[test]
    fn dashboard_detection() {
        assert!(is_dashboard_source("import streamlit as st\nst.title('x')"));
        assert!(is_dashboard_source("from streamlit import title"));
        assert!(!is_dashboard_source("import os\nprint('hi')"));
    }

    #[test]
    fn rendered_document_embeds_both_fragments() {
        let doc = render_website("<p>hi</p>", "p{color:red}");
        assert!(doc.contains("<p>hi</p>"));
        assert!(doc.contains("p{color:red}"));
        // Style block comes before the body content
        let style_at = doc.find("p{color:red}").unwrap();
        let body_at = doc.find("<p>hi</p>").unwrap();
        assert!(style_at < body_at);
        // Verbatim, no escaping
        assert!(!doc.contains("&lt;"));
    }

    #[tokio::test]
    async fn transient_run_captures_output() {
        let service = service_with_timeout(10);
        let outcome = service
            .run_transient("echo hello", "sh", ".sh", "t-1".to_string())
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "hello\n");
        assert_eq!(outcome.stderr, "");
        assert!(!outcome.is_dashboard);
    }

    #[tokio::test]
    async fn transient_run_reports_real_exit_code() {
        let service = service_with_timeout(10);
        let outcome = service
            .run_transient("echo oops >&2; exit 7", "sh", ".sh", "t-2".to_string())
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 7);
        assert!(outcome.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn transient_run_times_out() {
        let service = service_with_timeout(1);
        let start = Instant::now();
        let outcome = service
            .run_transient("sleep 10", "sh", ".sh", "t-3".to_string())
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, -1);
        assert!(outcome.stderr.contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_interpreter_is_reported_as_data() {
        let service = service_with_timeout(10);
        let outcome = service
            .run_transient("whatever", "definitely-not-a-binary", ".sh", "t-4".to_string())
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, -1);
        assert!(!outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn empty_code_does_not_break_machinery() {
        let service = service_with_timeout(10);
        let outcome = service
            .run_transient("", "sh", ".sh", "t-5".to_string())
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 0);
    }

    #[tokio::test]
    async fn static_render_gets_fresh_execution_id() {
        let service = service_with_timeout(10);
        let a = service
            .execute("<p>x</p>", Language::Html, None)
            .await
            .unwrap();
        let b = service
            .execute("<p>x</p>", Language::Html, None)
            .await
            .unwrap();
        assert_ne!(a.execution_id, b.execution_id);
        assert_eq!(a.html_content.as_deref(), Some("<p>x</p>"));
        assert_eq!(a.exit_code, 0);
    }

    #[tokio::test]
    async fn css_render_echoes_stylesheet() {
        let service = service_with_timeout(10);
        let outcome = service
            .execute("p{margin:0}", Language::Css, None)
            .await
            .unwrap();
        assert_eq!(outcome.css_content.as_deref(), Some("p{margin:0}"));
    }

    // Requires python3 on PATH; opt in via CODEAWARE_INTERPRETER_TESTS=1
    #[tokio::test]
    async fn python_hello_world() {
        if std::env::var("CODEAWARE_INTERPRETER_TESTS").is_err() {
            return;
        }

        let service = service_with_timeout(10);
        let outcome = service
            .execute("print(\"hello\")", Language::Python, None)
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "hello\n");
        assert_eq!(outcome.stderr, "");
    }

    #[tokio::test]
    async fn empty_code_across_interpreters() {
        if std::env::var("CODEAWARE_INTERPRETER_TESTS").is_err() {
            return;
        }

        let service = service_with_timeout(10);
        for language in [Language::Python, Language::Javascript] {
            let outcome = service.execute("", language, None).await.unwrap();
            assert!(
                outcome.exit_code == 0 || !outcome.stderr.is_empty(),
                "expected a structured outcome for {language:?}"
            );
        }
    }
}
