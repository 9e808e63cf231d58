//! SchoolBridge Server: HTTP transport for the request workflow.
//!
//! Wires the SurrealDB repositories into the workflow facade, verifies
//! session tokens into caller identities and exposes the facade over axum.

use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

use config::ServerConfig;
use error::StartupError;
use schoolbridge_db::{DbError, DbManager, run_migrations};
use session::SessionVerifier;
use state::AppState;

pub async fn start_server(config: ServerConfig) -> Result<(), StartupError> {
    info!("Initializing state...");
    let db = DbManager::connect(&config.db)
        .await
        .map_err(DbError::from)?;
    run_migrations(db.client()).await?;
    let sessions = SessionVerifier::new(&config.session)?;
    let state = AppState::new(db, sessions, config.workflow.clone());

    let app = routes::router(state);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
