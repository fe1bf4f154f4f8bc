//! Operator REST API handlers for runtime scheduler control.
//!
//! These endpoints act on the shared [`SchedulerControl`]. They return
//! 503 when the server runs without a scheduler attached.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause before the next cycle |
//! | `POST` | `/api/operator/resume` | Resume the tick loop |
//! | `POST` | `/api/operator/speed` | Set tick interval (ms) |
//! | `GET` | `/api/operator/status` | Tick, pause and speed |
//! | `POST` | `/api/operator/stop` | Stop the scheduler |
//!
//! [`SchedulerControl`]: liftsim_core::SchedulerControl

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use liftsim_core::SchedulerControl;
use liftsim_core::config::MIN_TICK_INTERVAL_MS;

use crate::error::ObserverError;
use crate::state::AppState;

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds.
    pub tick_interval_ms: u64,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    ok: bool,
    message: String,
}

fn control<S>(state: &AppState<S>) -> Result<&SchedulerControl, ObserverError> {
    state
        .control
        .as_deref()
        .ok_or_else(|| ObserverError::Unavailable("scheduler control not attached".to_owned()))
}

/// Pause the scheduler. The cycle in progress completes.
pub async fn pause<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    control(&state)?.pause();
    Ok(Json(OperatorResponse {
        ok: true,
        message: "Scheduler paused".to_owned(),
    }))
}

/// Resume a paused scheduler.
pub async fn resume<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    control(&state)?.resume();
    Ok(Json(OperatorResponse {
        ok: true,
        message: "Scheduler resumed".to_owned(),
    }))
}

/// Change the tick interval. Takes effect after the current sleep.
pub async fn set_speed<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let prev = control(&state)?
        .set_tick_interval_ms(body.tick_interval_ms)
        .ok_or_else(|| {
            ObserverError::InvalidRequest(format!(
                "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            ))
        })?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("Tick interval changed from {prev}ms to {}ms", body.tick_interval_ms),
        "previous_interval_ms": prev,
        "new_interval_ms": body.tick_interval_ms,
    })))
}

/// Current scheduler status.
pub async fn status<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(control(&state)?.status()))
}

/// Stop the scheduler after the current cycle. The engine shuts down
/// once the scheduler returns.
pub async fn stop<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    control(&state)?.request_stop();
    Ok(Json(OperatorResponse {
        ok: true,
        message: "Stop requested, scheduler will end after the current cycle".to_owned(),
    }))
}
