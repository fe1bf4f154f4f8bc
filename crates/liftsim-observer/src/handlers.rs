//! REST API endpoint handlers for the Observer server.
//!
//! Building and call handlers are thin wrappers over
//! [`liftsim_core::calls`]: validation and deduplication live there, and
//! the scheduler picks up new work on its next tick. Elevator reads come
//! from the latest-snapshot map the scheduler's notifier keeps current.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness and current tick |
//! | `GET` | `/api/buildings` | Every building, oldest first |
//! | `POST` | `/api/buildings` | Create a building and its elevator |
//! | `GET` | `/api/buildings/{id}` | Building, elevator, latest snapshot |
//! | `GET` | `/api/buildings/{id}/calls` | Calls placed in a building |
//! | `POST` | `/api/calls` | Place a call |
//! | `PUT` | `/api/calls/{id}/destination` | Set a call's destination |
//! | `GET` | `/api/elevators/{id}` | Latest elevator snapshot |

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use liftsim_core::calls;
use liftsim_db::EntityStore;
use liftsim_types::{BuildingId, CallId, ElevatorId, ElevatorSnapshot};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request structs
// ---------------------------------------------------------------------------

/// Request body for `POST /api/buildings`.
#[derive(Debug, serde::Deserialize)]
pub struct CreateBuildingRequest {
    /// Display name.
    pub name: String,
    /// Number of floors, numbered `0..floor_count`.
    pub floor_count: u32,
}

/// Request body for `POST /api/calls`.
#[derive(Debug, serde::Deserialize)]
pub struct CreateCallRequest {
    /// Building the call is placed in.
    pub building_id: BuildingId,
    /// Floor where service is requested.
    pub requested_floor: u32,
    /// Optional in-cab selection.
    #[serde(default)]
    pub destination_floor: Option<u32>,
}

/// Request body for `PUT /api/calls/{id}/destination`.
#[derive(Debug, serde::Deserialize)]
pub struct SetDestinationRequest {
    /// Floor the passenger wants to reach.
    pub destination_floor: u32,
}

/// Query parameters for `GET /api/buildings/{id}/calls`.
#[derive(Debug, serde::Deserialize)]
pub struct CallsQuery {
    /// Only calls with this handled flag.
    pub handled: Option<bool>,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe. Reports the current tick when a scheduler is attached.
pub async fn health<S: EntityStore>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    let tick = state.control.as_ref().map(|c| c.current_tick());
    Json(serde_json::json!({
        "status": "ok",
        "tick": tick,
    }))
}

// ---------------------------------------------------------------------------
// Buildings
// ---------------------------------------------------------------------------

/// Create a building with one elevator parked at floor 0.
pub async fn create_building<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CreateBuildingRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let (building, elevator) = calls::create_building(
        state.store.as_ref(),
        &state.limits,
        &body.name,
        body.floor_count,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "building": building,
            "elevator": elevator,
        })),
    ))
}

/// List every building, oldest first.
pub async fn list_buildings<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let buildings = calls::list_buildings(state.store.as_ref()).await?;
    Ok(Json(serde_json::json!({
        "count": buildings.len(),
        "buildings": buildings,
    })))
}

/// Return a building with its elevator and the elevator's latest snapshot.
pub async fn get_building<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let building_id: BuildingId = parse_id(&id_str)?;
    let (building, elevator) =
        calls::building_with_elevator(state.store.as_ref(), building_id).await?;
    let snapshot = state.latest_snapshot(elevator.id).await;

    Ok(Json(serde_json::json!({
        "building": building,
        "elevator": elevator,
        "snapshot": snapshot,
    })))
}

/// List the calls placed in a building, newest first.
///
/// # Query Parameters
///
/// - `handled`: `true` | `false` to filter by the handled flag.
pub async fn list_building_calls<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id_str): Path<String>,
    Query(params): Query<CallsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let building_id: BuildingId = parse_id(&id_str)?;
    let mut calls = calls::building_calls(state.store.as_ref(), building_id).await?;
    if let Some(handled) = params.handled {
        calls.retain(|c| c.is_handled == handled);
    }

    Ok(Json(serde_json::json!({
        "count": calls.len(),
        "calls": calls,
    })))
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// Place a call. A repeated hall call returns the existing one.
pub async fn create_call<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CreateCallRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let call = calls::create_call(
        state.store.as_ref(),
        body.building_id,
        body.requested_floor,
        body.destination_floor,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(call)))
}

/// Set the destination of an unhandled call.
pub async fn set_destination<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id_str): Path<String>,
    Json(body): Json<SetDestinationRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let call_id: CallId = parse_id(&id_str)?;
    let call =
        calls::set_destination(state.store.as_ref(), call_id, body.destination_floor).await?;
    Ok(Json(call))
}

// ---------------------------------------------------------------------------
// GET /api/elevators/{id}
// ---------------------------------------------------------------------------

/// Latest snapshot of an elevator.
///
/// Before the scheduler has stepped it, the stored row is returned as a
/// tick-0 snapshot.
pub async fn get_elevator<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let elevator_id: ElevatorId = parse_id(&id_str)?;
    let snapshot = if let Some(snapshot) = state.latest_snapshot(elevator_id).await {
        snapshot
    } else {
        let elevator = state
            .store
            .elevator(elevator_id)
            .await?
            .ok_or_else(|| ObserverError::NotFound(format!("elevator {elevator_id}")))?;
        ElevatorSnapshot::capture(&elevator, 0)
    };
    Ok(Json(snapshot))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a typed id from a path segment.
pub(crate) fn parse_id<T: FromStr<Err = uuid::Error>>(s: &str) -> Result<T, ObserverError> {
    s.parse::<T>()
        .map_err(|e| ObserverError::InvalidUuid(format!("{s}: {e}")))
}
