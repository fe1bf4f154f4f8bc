//! Movement Engine: one floor per tick, stopping at targets.
//!
//! Runs only while the doors are closed. A cab moves in the same tick its
//! direction is decided, whichever phase decides it: the assigner
//! committing an idle cab, the doors finishing closing, an idle cab with
//! restored targets, or a moving cab reversing because nothing is left
//! ahead.

use liftsim_types::{Direction, DoorStatus, ElevatorStatus};

use crate::step::StepDraft;

/// Advance the cab by at most one floor.
pub fn advance(draft: &mut StepDraft) {
    if draft.elevator.door_status != DoorStatus::Closed {
        return;
    }
    let current = draft.current_floor();

    if draft.elevator.status == ElevatorStatus::Idle {
        let Some(next) = draft.runtime.targets.next(draft.elevator.direction, current) else {
            return;
        };
        draft.head_for(next);
    }

    let heading = draft.elevator.status.heading();
    if heading == Direction::None {
        return;
    }
    if draft.runtime.targets.remove(current) {
        draft.begin_opening();
        return;
    }
    let Some(next) = draft.runtime.targets.next(heading, current) else {
        draft.settle();
        return;
    };
    let direction = Direction::between(current, next);
    draft.elevator.direction = direction;
    draft.elevator.status = ElevatorStatus::moving(direction);
    draft.elevator.current_floor = direction.step(current, draft.top_floor());
}
