//! CodeAware Tutoring Server
//!
//! HTTP backend for guided coding projects: generates step-by-step project
//! plans, executes user code in sandboxed child processes, and manages
//! long-running dashboard processes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod error;
mod infra;
mod service;

pub use config::Config;
pub use error::{Error, Result};

use infra::gemini::GeminiClient;
use service::execution::ExecutionService;
use service::registry::DashboardRegistry;
use service::session::SessionStore;
use service::tutor::TutorService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub executions: Arc<ExecutionService>,
    pub registry: Arc<DashboardRegistry>,
    pub sessions: Arc<SessionStore>,
    pub tutor: Arc<TutorService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::load()?);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let http_addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port).parse()?;

    info!("Starting CodeAware Tutoring Server");
    info!("HTTP listening on {}", http_addr);

    let api_key = match &config.google_api_key {
        Some(key) => key.clone(),
        None => {
            warn!("GOOGLE_API_KEY is not set; step generation requests will fail");
            String::new()
        }
    };
    let generator = Arc::new(GeminiClient::new(
        api_key,
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
    ));

    let registry = Arc::new(DashboardRegistry::new(
        Duration::from_secs(config.probe_delay_secs),
        Duration::from_secs(config.grace_period_secs),
    ));
    let sessions = Arc::new(SessionStore::new());
    let executions = Arc::new(ExecutionService::new(config.clone(), registry.clone()));
    let tutor = Arc::new(TutorService::new(generator, sessions.clone()));

    let state = AppState {
        config: config.clone(),
        executions,
        registry,
        sessions,
        tutor,
    };

    info!(
        exec_timeout_secs = state.config.exec_timeout_secs,
        probe_delay_secs = state.config.probe_delay_secs,
        "Execution limits configured"
    );

    let app = api::http::create_router(state);

    axum::serve(
        tokio::net::TcpListener::bind(http_addr).await?,
        app.into_make_service(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
