//! Building and call services: the validated entry points through which
//! the outside world adds work for the scheduler.
//!
//! Nothing here touches runtime state. A new call or destination is
//! written to the store and picked up by the assigner on the next tick.

use liftsim_db::{DbError, EntityStore};
use liftsim_types::{Building, BuildingId, Call, CallId, Elevator};
use tracing::{debug, info};

use crate::config::BuildingLimits;

/// Errors returned by the building and call services.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// No building has this id.
    #[error("building {0} not found")]
    UnknownBuilding(BuildingId),

    /// No call has this id.
    #[error("call {0} not found")]
    UnknownCall(CallId),

    /// A floor outside `0..floor_count`.
    #[error("floor {floor} is outside 0..{floor_count}")]
    InvalidFloor {
        /// The rejected floor.
        floor: u32,
        /// The building's floor count.
        floor_count: u32,
    },

    /// The call was already served.
    #[error("call {0} is already handled")]
    AlreadyHandled(CallId),

    /// Building parameters were rejected.
    #[error("invalid building: {0}")]
    InvalidBuilding(String),

    /// The store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: DbError,
    },
}

/// Create a building and its elevator, parked at floor 0.
///
/// # Errors
///
/// Returns [`CallError::InvalidBuilding`] if the name or floor count
/// breaks `limits`, or [`CallError::Store`].
pub async fn create_building<S: EntityStore>(
    store: &S,
    limits: &BuildingLimits,
    name: &str,
    floor_count: u32,
) -> Result<(Building, Elevator), CallError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CallError::InvalidBuilding("name is required".to_owned()));
    }
    if name.chars().count() > limits.max_name_length {
        return Err(CallError::InvalidBuilding(format!(
            "name is longer than {} characters",
            limits.max_name_length
        )));
    }
    if floor_count < limits.min_floors || floor_count > limits.max_floors {
        return Err(CallError::InvalidBuilding(format!(
            "floor count must be between {} and {}",
            limits.min_floors, limits.max_floors
        )));
    }

    let building = Building::new(name, floor_count);
    let elevator = Elevator::parked(building.id);
    store.insert_building(&building, &elevator).await?;

    info!(
        building_id = %building.id,
        elevator_id = %elevator.id,
        floor_count,
        "Building created"
    );
    Ok((building, elevator))
}

/// Look up a building with its elevator.
///
/// # Errors
///
/// Returns [`CallError::UnknownBuilding`] or [`CallError::Store`].
pub async fn building_with_elevator<S: EntityStore>(
    store: &S,
    building_id: BuildingId,
) -> Result<(Building, Elevator), CallError> {
    let building = store
        .building(building_id)
        .await?
        .ok_or(CallError::UnknownBuilding(building_id))?;
    let elevator = store
        .elevator_for_building(building_id)
        .await?
        .ok_or(CallError::UnknownBuilding(building_id))?;
    Ok((building, elevator))
}

/// Place a call.
///
/// A call without a destination is a hall call: if an unhandled hall call
/// already exists on the same floor, that call is returned instead of
/// creating a second one.
///
/// # Errors
///
/// Returns [`CallError::UnknownBuilding`], [`CallError::InvalidFloor`],
/// or [`CallError::Store`].
pub async fn create_call<S: EntityStore>(
    store: &S,
    building_id: BuildingId,
    requested_floor: u32,
    destination_floor: Option<u32>,
) -> Result<Call, CallError> {
    let building = store
        .building(building_id)
        .await?
        .ok_or(CallError::UnknownBuilding(building_id))?;
    check_floor(&building, requested_floor)?;
    if let Some(dest) = destination_floor {
        check_floor(&building, dest)?;
    }

    let call = Call::new(building_id, requested_floor, destination_floor);
    if destination_floor.is_none() {
        let open = store.insert_hall_call(&call).await?;
        if open.id != call.id {
            debug!(
                call_id = %open.id,
                %building_id,
                requested_floor,
                "Duplicate hall call, returning existing"
            );
            return Ok(open);
        }
    } else {
        store.insert_call(&call).await?;
    }
    info!(
        call_id = %call.id,
        %building_id,
        requested_floor,
        destination_floor = ?destination_floor,
        "Call created"
    );
    Ok(call)
}

/// Set the in-cab destination of an unhandled call.
///
/// # Errors
///
/// Returns [`CallError::UnknownCall`], [`CallError::AlreadyHandled`],
/// [`CallError::InvalidFloor`], or [`CallError::Store`].
pub async fn set_destination<S: EntityStore>(
    store: &S,
    call_id: CallId,
    destination_floor: u32,
) -> Result<Call, CallError> {
    let call = store
        .call(call_id)
        .await?
        .ok_or(CallError::UnknownCall(call_id))?;
    if call.is_handled {
        return Err(CallError::AlreadyHandled(call_id));
    }
    let building = store
        .building(call.building_id)
        .await?
        .ok_or(CallError::UnknownBuilding(call.building_id))?;
    check_floor(&building, destination_floor)?;

    // The call may have been handled by a tick since it was read above.
    let call = store
        .set_call_destination(call_id, destination_floor)
        .await?
        .ok_or(CallError::AlreadyHandled(call_id))?;
    info!(%call_id, destination_floor, "Destination set");
    Ok(call)
}

/// Every building, oldest first.
///
/// # Errors
///
/// Returns [`CallError::Store`].
pub async fn list_buildings<S: EntityStore>(store: &S) -> Result<Vec<Building>, CallError> {
    Ok(store.buildings().await?)
}

/// Every call placed in a building, newest first.
///
/// # Errors
///
/// Returns [`CallError::UnknownBuilding`] or [`CallError::Store`].
pub async fn building_calls<S: EntityStore>(
    store: &S,
    building_id: BuildingId,
) -> Result<Vec<Call>, CallError> {
    if store.building(building_id).await?.is_none() {
        return Err(CallError::UnknownBuilding(building_id));
    }
    Ok(store.building_calls(building_id).await?)
}

fn check_floor(building: &Building, floor: u32) -> Result<(), CallError> {
    if building.has_floor(floor) {
        Ok(())
    } else {
        Err(CallError::InvalidFloor {
            floor,
            floor_count: building.floor_count,
        })
    }
}
