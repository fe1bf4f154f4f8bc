//! Call Assigner: decides which pending calls become targets this tick.
//!
//! Policy:
//!
//! - An uncommitted elevator (idle, no direction, no targets) takes the
//!   oldest pending call and commits to its direction. A call at the
//!   current floor is a zero-distance arrival.
//! - A committed elevator folds every pending call whose requested floor
//!   is on the way in its direction. Other calls wait and are looked at
//!   again next tick.
//! - Folding a call queues its requested floor and, when present, its
//!   destination, and writes one [`Assignment`](liftsim_types::Assignment)
//!   per call. A destination set after the call was folded is queued once,
//!   on the tick it is first seen. A destination changed again replaces
//!   the old floor in the targets.
//!
//! Calls become handled only when the doors open at a matching floor
//! (see [`doors`](crate::doors)). The one exception is a call at the
//! current floor while the doors are already open: its passenger can
//! board right away.

use liftsim_types::{Call, Direction, DoorStatus, ElevatorStatus};

use crate::step::StepDraft;

/// Where a folded floor ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Added to (or already in) the target queue.
    Queued,
    /// At the current floor and covered by the door cycle in progress or
    /// just started.
    DoorCycle,
    /// At the current floor with the doors fully open.
    DoorsOpen,
}

/// Fold this tick's pending calls into the draft's targets.
///
/// `pending` must be the building's unhandled calls, oldest first.
pub fn assign_calls(draft: &mut StepDraft, pending: &[Call]) {
    draft.runtime.retain_pending(pending);
    fold_new_destinations(draft, pending);

    if is_uncommitted(draft) {
        if let Some(primary) = pending.iter().find(|c| !draft.runtime.is_folded(c.id)) {
            commit_to(draft, primary);
        }
    }

    if !accepts_on_the_way(draft) {
        return;
    }
    let direction = draft.elevator.direction;
    let current = draft.current_floor();
    for call in pending {
        if draft.runtime.is_folded(call.id) || draft.is_handled(call.id) {
            continue;
        }
        if direction.is_ahead(current, call.requested_floor) {
            fold_call(draft, call);
        }
    }
}

/// Idle with no direction and nothing queued.
fn is_uncommitted(draft: &StepDraft) -> bool {
    draft.elevator.status == ElevatorStatus::Idle
        && draft.elevator.direction == Direction::None
        && draft.runtime.targets.is_empty()
}

/// Whether on-the-way calls may be folded in the elevator's current state.
fn accepts_on_the_way(draft: &StepDraft) -> bool {
    match draft.elevator.status {
        ElevatorStatus::MovingUp
        | ElevatorStatus::MovingDown
        | ElevatorStatus::OpeningDoors
        | ElevatorStatus::ClosingDoors => true,
        ElevatorStatus::Idle => draft.elevator.direction != Direction::None,
    }
}

/// Commit an uncommitted elevator to serve `primary`.
fn commit_to(draft: &mut StepDraft, primary: &Call) {
    let current = draft.current_floor();
    match Direction::between(current, primary.requested_floor) {
        Direction::None if draft.elevator.door_status == DoorStatus::Open => {
            // Boards immediately; head for its destination if it has one.
            fold_call(draft, primary);
            if let Some(next) = draft.runtime.targets.next(Direction::None, current) {
                draft.elevator.direction = Direction::between(current, next);
            }
        }
        Direction::None => {
            draft.elevator.direction = if current < draft.top_floor() {
                Direction::Up
            } else {
                Direction::Down
            };
            fold_call(draft, primary);
        }
        direction => {
            draft.elevator.direction = direction;
            if draft.elevator.door_status == DoorStatus::Closed {
                draft.elevator.status = ElevatorStatus::moving(direction);
            }
            fold_call(draft, primary);
        }
    }
}

/// Fold one call: record the assignment and place both of its floors.
fn fold_call(draft: &mut StepDraft, call: &Call) {
    draft.record_assignment(call);
    if place_floor(draft, call.requested_floor) == Placement::DoorsOpen {
        draft.mark_handled(call.id);
    }
    if let Some(dest) = call.destination_floor {
        place_floor(draft, dest);
    }
}

/// Queue destinations set or changed on calls that were already folded.
///
/// A replaced destination leaves the targets unless another folded call
/// still needs that floor.
fn fold_new_destinations(draft: &mut StepDraft, pending: &[Call]) {
    for call in pending {
        let Some(dest) = call.destination_floor else {
            continue;
        };
        if !draft.runtime.is_folded(call.id) {
            continue;
        }
        let previous = draft.runtime.folded_destination(call.id);
        if previous == Some(dest) {
            continue;
        }
        draft.runtime.record_fold(call.id, Some(dest));
        if let Some(stale) = previous.filter(|f| !floor_still_needed(draft, pending, *f)) {
            draft.runtime.targets.remove(stale);
        }
        place_floor(draft, dest);
    }
}

/// Whether a folded call still wants the cab to stop at `floor`.
fn floor_still_needed(draft: &StepDraft, pending: &[Call], floor: u32) -> bool {
    pending.iter().any(|c| {
        draft.runtime.is_folded(c.id)
            && (c.requested_floor == floor || draft.runtime.folded_destination(c.id) == Some(floor))
    })
}

/// Put `floor` where it belongs given the elevator's state.
fn place_floor(draft: &mut StepDraft, floor: u32) -> Placement {
    if floor != draft.current_floor() {
        draft.runtime.targets.insert(floor);
        return Placement::Queued;
    }
    match draft.elevator.status {
        ElevatorStatus::MovingUp | ElevatorStatus::MovingDown => {
            // The movement phase stops here this tick.
            draft.runtime.targets.insert(floor);
            Placement::Queued
        }
        ElevatorStatus::Idle if draft.elevator.door_status == DoorStatus::Open => {
            Placement::DoorsOpen
        }
        ElevatorStatus::Idle | ElevatorStatus::ClosingDoors => {
            draft.begin_opening();
            Placement::DoorCycle
        }
        ElevatorStatus::OpeningDoors => Placement::DoorCycle,
    }
}
