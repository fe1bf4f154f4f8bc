//! Observer startup helper for embedding in the engine binary.
//!
//! [`spawn_observer`] binds the listening socket up front, so a port
//! conflict fails engine startup, and then serves on a background Tokio
//! task that runs alongside the scheduler.

use std::sync::Arc;

use liftsim_db::EntityStore;
use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Spawn the Observer HTTP server on a background Tokio task.
///
/// The server runs until the task is aborted. Hold the returned handle
/// and abort it during shutdown.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn spawn_observer<S: EntityStore + 'static>(
    config: &ServerConfig,
    state: Arc<AppState<S>>,
) -> Result<JoinHandle<()>, ServerError> {
    let listener = server::bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(port = config.port, "Observer server spawned on background task");
    Ok(handle)
}
