//! One elevator's simulation step.
//!
//! A step runs three phases against a [`StepDraft`], in this order:
//!
//! 1. [`assigner::assign_calls`] folds pending calls into the targets.
//! 2. [`doors::operate_doors`] advances the door sub-machine.
//! 3. [`movement::advance`] moves the cab, only while the doors are closed.
//!
//! The draft owns a clone of the elevator's runtime state. Nothing it
//! produces becomes visible (in the store or in the [`RuntimeArena`])
//! until [`EntityStore::commit_step`] succeeds, so a failed step leaves
//! the previous tick's state intact and the next tick simply retries.

use std::collections::BTreeSet;

use liftsim_db::{DbError, EntityStore, StepCommit};
use liftsim_types::{
    Assignment, Building, Call, CallId, Direction, DoorStatus, Elevator, ElevatorId,
    ElevatorSnapshot, ElevatorStatus,
};
use tracing::{debug, warn};

use crate::config::DoorTiming;
use crate::runtime::{ElevatorRuntime, RuntimeArena};
use crate::{assigner, doors, movement};

/// Errors that abort one elevator's step.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// Pending calls could not be loaded.
    #[error("loading calls for elevator {elevator_id}: {source}")]
    LoadCalls {
        /// The elevator being stepped.
        elevator_id: ElevatorId,
        /// The underlying store error.
        source: DbError,
    },

    /// Runtime state could not be rebuilt from stored assignments.
    #[error("restoring runtime state for elevator {elevator_id}: {source}")]
    Hydrate {
        /// The elevator being stepped.
        elevator_id: ElevatorId,
        /// The underlying store error.
        source: DbError,
    },

    /// The step result could not be persisted. Nothing was applied.
    #[error("committing step for elevator {elevator_id}: {source}")]
    Commit {
        /// The elevator being stepped.
        elevator_id: ElevatorId,
        /// The underlying store error.
        source: DbError,
    },
}

/// What a committed step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// State after the step, ready for the notifier.
    pub snapshot: ElevatorSnapshot,
    /// Calls marked handled this step.
    pub handled_calls: usize,
    /// Assignment records created this step.
    pub assignments: usize,
}

/// Mutable working copy of one elevator during a step.
#[derive(Debug, Clone)]
pub struct StepDraft {
    /// The elevator row being evolved.
    pub elevator: Elevator,
    /// The elevator's runtime state being evolved.
    pub runtime: ElevatorRuntime,
    top_floor: u32,
    handled: BTreeSet<CallId>,
    assignments: Vec<Assignment>,
}

impl StepDraft {
    /// Start a draft. A stored floor outside the building is clamped.
    pub fn new(mut elevator: Elevator, runtime: ElevatorRuntime, building: &Building) -> Self {
        let top_floor = building.top_floor();
        if elevator.current_floor > top_floor {
            warn!(
                elevator_id = %elevator.id,
                current_floor = elevator.current_floor,
                top_floor,
                "Stored floor outside building, clamping"
            );
            elevator.current_floor = top_floor;
        }
        Self {
            elevator,
            runtime,
            top_floor,
            handled: BTreeSet::new(),
            assignments: Vec::new(),
        }
    }

    /// Highest floor of the building.
    pub const fn top_floor(&self) -> u32 {
        self.top_floor
    }

    /// Floor the cab is at.
    pub const fn current_floor(&self) -> u32 {
        self.elevator.current_floor
    }

    /// Enter `OpeningDoors` with a fresh timer. Direction is kept.
    pub const fn begin_opening(&mut self) {
        self.elevator.status = ElevatorStatus::OpeningDoors;
        self.elevator.door_status = DoorStatus::Opening;
        self.runtime.door_timer = Some(0);
    }

    /// Enter `ClosingDoors` with a fresh timer.
    pub const fn begin_closing(&mut self) {
        self.elevator.status = ElevatorStatus::ClosingDoors;
        self.elevator.door_status = DoorStatus::Closing;
        self.runtime.door_timer = Some(0);
    }

    /// Advance the door timer and return the ticks spent in the phase.
    pub fn tick_door_timer(&mut self) -> u32 {
        let elapsed = self.runtime.door_timer.unwrap_or(0).saturating_add(1);
        self.runtime.door_timer = Some(elapsed);
        elapsed
    }

    /// Commit status and direction towards `target`.
    ///
    /// A target at the current floor is an arrival: it is removed and the
    /// doors start opening.
    pub fn head_for(&mut self, target: u32) {
        match Direction::between(self.current_floor(), target) {
            Direction::None => {
                self.runtime.targets.remove(target);
                self.begin_opening();
            }
            direction => {
                self.elevator.direction = direction;
                self.elevator.status = ElevatorStatus::moving(direction);
            }
        }
    }

    /// Stop with no committed direction.
    pub const fn settle(&mut self) {
        self.elevator.status = ElevatorStatus::Idle;
        self.elevator.direction = Direction::None;
    }

    /// Mark a call handled in this step's commit.
    pub fn mark_handled(&mut self, call: CallId) {
        self.handled.insert(call);
    }

    /// Whether a call was marked handled in this step.
    pub fn is_handled(&self, call: CallId) -> bool {
        self.handled.contains(&call)
    }

    /// Record that `call` was folded into this elevator's targets.
    pub fn record_assignment(&mut self, call: &Call) {
        self.runtime.record_fold(call.id, call.destination_floor);
        self.assignments.push(Assignment::new(self.elevator.id, call.id));
    }

    /// Split into the runtime state to keep and the commit to persist.
    pub fn finish(self) -> (ElevatorRuntime, StepCommit) {
        let commit = StepCommit {
            elevator: self.elevator,
            handled_calls: self.handled.into_iter().collect(),
            assignments: self.assignments,
        };
        (self.runtime, commit)
    }
}

/// Run the three phases on a draft. No I/O.
pub fn plan_step(draft: &mut StepDraft, pending: &[Call], timing: DoorTiming) {
    assigner::assign_calls(draft, pending);
    doors::operate_doors(draft, pending, timing);
    movement::advance(draft);
}

/// Step one elevator and persist the result.
///
/// On success the arena entry is replaced with the new runtime state.
/// On error neither the store nor the arena changed.
///
/// # Errors
///
/// Returns [`StepError`] if any store operation fails.
pub async fn step_elevator<S: EntityStore>(
    store: &S,
    arena: &mut RuntimeArena,
    elevator: Elevator,
    building: &Building,
    timing: DoorTiming,
    tick: u64,
) -> Result<StepOutcome, StepError> {
    let elevator_id = elevator.id;
    let pending = store
        .pending_calls(building.id)
        .await
        .map_err(|source| StepError::LoadCalls { elevator_id, source })?;

    let runtime = if let Some(existing) = arena.get(elevator_id) {
        existing.clone()
    } else {
        let assignments = store
            .active_assignments(elevator_id)
            .await
            .map_err(|source| StepError::Hydrate { elevator_id, source })?;
        let runtime = ElevatorRuntime::hydrate(&assignments, &pending);
        debug!(
            %elevator_id,
            targets = runtime.targets.len(),
            "Restored runtime state"
        );
        runtime
    };

    let mut draft = StepDraft::new(elevator, runtime, building);
    plan_step(&mut draft, &pending, timing);
    let (runtime, commit) = draft.finish();

    store
        .commit_step(&commit)
        .await
        .map_err(|source| StepError::Commit { elevator_id, source })?;
    arena.insert(elevator_id, runtime);

    Ok(StepOutcome {
        snapshot: ElevatorSnapshot::capture(&commit.elevator, tick),
        handled_calls: commit.handled_calls.len(),
        assignments: commit.assignments.len(),
    })
}
