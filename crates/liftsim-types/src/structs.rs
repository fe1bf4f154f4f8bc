//! Entity structs: buildings, elevators, calls, assignments, and the
//! per-tick elevator snapshot pushed to observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Direction, DoorStatus, ElevatorStatus};
use crate::ids::{AssignmentId, BuildingId, CallId, ElevatorId};

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// A building served by exactly one elevator.
///
/// Floors are numbered `0..floor_count`. The floor count never changes
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Building {
    /// Unique identifier.
    pub id: BuildingId,
    /// Display name.
    pub name: String,
    /// Number of floors (at least 1).
    pub floor_count: u32,
    /// When the building was created.
    pub created_at: DateTime<Utc>,
}

impl Building {
    /// Create a building record with a fresh id.
    pub fn new(name: &str, floor_count: u32) -> Self {
        Self {
            id: BuildingId::new(),
            name: name.to_owned(),
            floor_count,
            created_at: Utc::now(),
        }
    }

    /// Highest valid floor number.
    pub const fn top_floor(&self) -> u32 {
        self.floor_count.saturating_sub(1)
    }

    /// Whether `floor` exists in this building.
    pub const fn has_floor(&self, floor: u32) -> bool {
        floor < self.floor_count
    }
}

// ---------------------------------------------------------------------------
// Elevator
// ---------------------------------------------------------------------------

/// Persisted state of a building's elevator.
///
/// Only the simulation engine mutates this record after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Elevator {
    /// Unique identifier.
    pub id: ElevatorId,
    /// The building this elevator serves.
    pub building_id: BuildingId,
    /// Floor the cab is at, always within the building's range.
    pub current_floor: u32,
    /// Operational status.
    pub status: ElevatorStatus,
    /// Committed direction of travel.
    pub direction: Direction,
    /// Door state.
    pub door_status: DoorStatus,
}

impl Elevator {
    /// A new elevator parked at floor 0, idle, doors closed.
    pub fn parked(building_id: BuildingId) -> Self {
        Self {
            id: ElevatorId::new(),
            building_id,
            current_floor: 0,
            status: ElevatorStatus::Idle,
            direction: Direction::None,
            door_status: DoorStatus::Closed,
        }
    }

    /// Whether the cab is idle with its doors shut.
    pub fn is_parked(&self) -> bool {
        self.status == ElevatorStatus::Idle && self.door_status == DoorStatus::Closed
    }
}

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// A request for service at a floor, optionally carrying the floor the
/// passenger wants to reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Call {
    /// Unique identifier.
    pub id: CallId,
    /// The building the call was placed in.
    pub building_id: BuildingId,
    /// Floor where service was requested.
    pub requested_floor: u32,
    /// In-cab selection, set at creation or later.
    pub destination_floor: Option<u32>,
    /// When the call was placed. Calls are served oldest first.
    pub call_time: DateTime<Utc>,
    /// Set once the doors open at a floor that satisfies the call.
    pub is_handled: bool,
}

impl Call {
    /// Create an unhandled call stamped with the current time.
    pub fn new(building_id: BuildingId, requested_floor: u32, destination_floor: Option<u32>) -> Self {
        Self {
            id: CallId::new(),
            building_id,
            requested_floor,
            destination_floor,
            call_time: Utc::now(),
            is_handled: false,
        }
    }

    /// Whether doors opening at `floor` satisfy this call.
    pub fn is_served_at(&self, floor: u32) -> bool {
        self.requested_floor == floor || self.destination_floor == Some(floor)
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// Write-once audit record: a call was folded into an elevator's targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Assignment {
    /// Unique identifier.
    pub id: AssignmentId,
    /// The elevator that took the call.
    pub elevator_id: ElevatorId,
    /// The call that was taken.
    pub call_id: CallId,
    /// When the call was folded in.
    pub assigned_at: DateTime<Utc>,
}

impl Assignment {
    /// Record that `elevator_id` took `call_id` now.
    pub fn new(elevator_id: ElevatorId, call_id: CallId) -> Self {
        Self {
            id: AssignmentId::new(),
            elevator_id,
            call_id,
            assigned_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable point-in-time view of one elevator, broadcast after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ElevatorSnapshot {
    /// The elevator described.
    pub elevator_id: ElevatorId,
    /// The building it serves.
    pub building_id: BuildingId,
    /// Scheduler cycle that produced this snapshot.
    pub tick: u64,
    /// Floor the cab is at.
    pub current_floor: u32,
    /// Operational status.
    pub status: ElevatorStatus,
    /// Committed direction of travel.
    pub direction: Direction,
    /// Door state.
    pub door_status: DoorStatus,
}

impl ElevatorSnapshot {
    /// Capture `elevator` as of scheduler cycle `tick`.
    pub const fn capture(elevator: &Elevator, tick: u64) -> Self {
        Self {
            elevator_id: elevator.id,
            building_id: elevator.building_id,
            tick,
            current_floor: elevator.current_floor,
            status: elevator.status,
            direction: elevator.direction,
            door_status: elevator.door_status,
        }
    }
}
