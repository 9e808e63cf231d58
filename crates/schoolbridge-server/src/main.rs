//! SchoolBridge Server: Application entry point.

use std::process::ExitCode;

use schoolbridge_server::config::ServerConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("schoolbridge=info")),
        )
        .json()
        .init();

    tracing::info!("Starting SchoolBridge server...");

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = schoolbridge_server::start_server(config).await {
        tracing::error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("SchoolBridge server stopped.");
    ExitCode::SUCCESS
}
