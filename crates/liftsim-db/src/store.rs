//! The entity store contract consumed by the simulation engine and the
//! call/building services.
//!
//! The engine only ever talks to storage through [`EntityStore`]. Two
//! implementations ship with this crate: [`InMemoryStore`] for tests and
//! store-less runs, and [`PgStore`] over `PostgreSQL`.
//!
//! [`InMemoryStore`]: crate::memory::InMemoryStore
//! [`PgStore`]: crate::pg_store::PgStore

use std::future::Future;

use liftsim_types::{
    Assignment, Building, BuildingId, Call, CallId, Elevator, ElevatorId,
};

use crate::error::DbError;

/// Everything one elevator's tick wants to persist.
///
/// [`EntityStore::commit_step`] applies a commit atomically: the elevator
/// row, the handled flags, and the assignment records land together or
/// not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommit {
    /// The elevator row as it stands at the end of the tick.
    pub elevator: Elevator,
    /// Calls whose doors opened this tick.
    pub handled_calls: Vec<CallId>,
    /// Calls folded into the elevator's targets this tick.
    pub assignments: Vec<Assignment>,
}

/// Read/write access to buildings, elevators, calls, and assignments.
///
/// All futures are `Send` so a store can be driven from a spawned Tokio
/// task.
pub trait EntityStore: Send + Sync {
    /// Insert a building together with its single elevator.
    fn insert_building(
        &self,
        building: &Building,
        elevator: &Elevator,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Look up a building.
    fn building(
        &self,
        id: BuildingId,
    ) -> impl Future<Output = Result<Option<Building>, DbError>> + Send;

    /// Look up an elevator.
    fn elevator(
        &self,
        id: ElevatorId,
    ) -> impl Future<Output = Result<Option<Elevator>, DbError>> + Send;

    /// The elevator that serves a building.
    fn elevator_for_building(
        &self,
        building_id: BuildingId,
    ) -> impl Future<Output = Result<Option<Elevator>, DbError>> + Send;

    /// Every building, oldest first (ties broken by id).
    fn buildings(&self) -> impl Future<Output = Result<Vec<Building>, DbError>> + Send;

    /// Every elevator with its building, ordered by elevator id ascending.
    fn elevators_with_buildings(
        &self,
    ) -> impl Future<Output = Result<Vec<(Elevator, Building)>, DbError>> + Send;

    /// Insert a new call.
    fn insert_call(&self, call: &Call) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Insert a hall call unless an unhandled call without a destination
    /// already exists on the same floor of the same building.
    ///
    /// The lookup and the insert are one atomic operation. Returns the
    /// call that is open on that floor afterwards: `call` itself, or the
    /// existing one.
    fn insert_hall_call(&self, call: &Call) -> impl Future<Output = Result<Call, DbError>> + Send;

    /// Look up a call.
    fn call(&self, id: CallId) -> impl Future<Output = Result<Option<Call>, DbError>> + Send;

    /// Set the destination of a call that is still unhandled.
    ///
    /// Only `destination_floor` is written, and only if the call is
    /// unhandled at the moment of the write. Returns the updated call, or
    /// `None` when no unhandled call has this id.
    fn set_call_destination(
        &self,
        id: CallId,
        destination_floor: u32,
    ) -> impl Future<Output = Result<Option<Call>, DbError>> + Send;

    /// Unhandled calls for a building, oldest first (ties broken by id).
    fn pending_calls(
        &self,
        building_id: BuildingId,
    ) -> impl Future<Output = Result<Vec<Call>, DbError>> + Send;

    /// Every call ever placed in a building, newest first.
    fn building_calls(
        &self,
        building_id: BuildingId,
    ) -> impl Future<Output = Result<Vec<Call>, DbError>> + Send;

    /// Assignments of this elevator whose call is still unhandled.
    fn active_assignments(
        &self,
        elevator_id: ElevatorId,
    ) -> impl Future<Output = Result<Vec<Assignment>, DbError>> + Send;

    /// Atomically persist one elevator's tick result.
    fn commit_step(&self, commit: &StepCommit) -> impl Future<Output = Result<(), DbError>> + Send;
}
