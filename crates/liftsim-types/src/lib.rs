//! Shared type definitions for the Liftsim elevator simulation.
//!
//! This crate is the single source of truth for the entity and state
//! types used across the workspace. Types flow downstream to `TypeScript`
//! via `ts-rs` for the observer dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity identifiers
//! - [`enums`] -- Elevator status, direction, and door state
//! - [`structs`] -- Buildings, elevators, calls, assignments, snapshots

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Direction, DoorStatus, ElevatorStatus, UnknownVariant};
pub use ids::{AssignmentId, BuildingId, CallId, ElevatorId};
pub use structs::{Assignment, Building, Call, Elevator, ElevatorSnapshot};
