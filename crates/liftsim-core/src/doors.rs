//! Door Controller: the open/close sub-state-machine.
//!
//! ```text
//!   OpeningDoors/Opening --(open_ticks)--> Idle/Open
//!   Idle/Open --(target queued)--> ClosingDoors/Closing
//!   ClosingDoors/Closing --(close_ticks)--> Moving*/Closed or Idle/Closed
//! ```
//!
//! The open state has no timeout. It is left only when a target is
//! queued.

use liftsim_types::{Call, Direction, DoorStatus, ElevatorStatus};
use tracing::trace;

use crate::config::DoorTiming;
use crate::step::StepDraft;

/// Advance the door phase by one tick.
pub fn operate_doors(draft: &mut StepDraft, pending: &[Call], timing: DoorTiming) {
    match draft.elevator.status {
        ElevatorStatus::OpeningDoors => {
            draft.elevator.door_status = DoorStatus::Opening;
            if draft.tick_door_timer() >= timing.open_ticks {
                finish_opening(draft, pending);
            }
        }
        ElevatorStatus::ClosingDoors => {
            draft.elevator.door_status = DoorStatus::Closing;
            if draft.tick_door_timer() >= timing.close_ticks {
                finish_closing(draft);
            }
        }
        ElevatorStatus::Idle
            if draft.elevator.door_status == DoorStatus::Open
                && !draft.runtime.targets.is_empty() =>
        {
            draft.begin_closing();
        }
        ElevatorStatus::Idle | ElevatorStatus::MovingUp | ElevatorStatus::MovingDown => {}
    }
}

/// Doors are fully open: release every call this floor satisfies.
fn finish_opening(draft: &mut StepDraft, pending: &[Call]) {
    let floor = draft.current_floor();
    draft.elevator.door_status = DoorStatus::Open;
    draft.elevator.status = ElevatorStatus::Idle;
    draft.runtime.door_timer = None;
    draft.runtime.targets.remove(floor);

    for call in pending.iter().filter(|c| c.is_served_at(floor)) {
        draft.mark_handled(call.id);
    }
    if draft.runtime.targets.is_empty() {
        draft.elevator.direction = Direction::None;
    }
    trace!(elevator_id = %draft.elevator.id, floor, "Doors open");
}

/// Doors are fully closed: head for the next target or park.
fn finish_closing(draft: &mut StepDraft) {
    draft.elevator.door_status = DoorStatus::Closed;
    draft.runtime.door_timer = None;
    match draft
        .runtime
        .targets
        .next(draft.elevator.direction, draft.current_floor())
    {
        Some(next) => draft.head_for(next),
        None => draft.settle(),
    }
}

#[cfg(test)]
mod tests {
    use liftsim_types::{Building, Elevator};

    use super::*;
    use crate::runtime::ElevatorRuntime;

    const TIMING: DoorTiming = DoorTiming {
        open_ticks: 2,
        close_ticks: 2,
    };

    fn draft_at(floor: u32) -> (Building, StepDraft) {
        let building = Building::new("Door Tower", 10);
        let mut elevator = Elevator::parked(building.id);
        elevator.current_floor = floor;
        let draft = StepDraft::new(elevator, ElevatorRuntime::default(), &building);
        (building, draft)
    }

    #[test]
    fn opening_takes_configured_ticks() {
        let (building, mut draft) = draft_at(3);
        draft.elevator.direction = Direction::Up;
        draft.begin_opening();
        let here = Call::new(building.id, 3, None);
        let dest_here = Call::new(building.id, 0, Some(3));
        let elsewhere = Call::new(building.id, 5, None);
        let pending = [here.clone(), dest_here.clone(), elsewhere.clone()];

        operate_doors(&mut draft, &pending, TIMING);
        assert_eq!(draft.elevator.door_status, DoorStatus::Opening);
        assert_eq!(draft.runtime.door_timer, Some(1));

        operate_doors(&mut draft, &pending, TIMING);
        assert_eq!(draft.elevator.door_status, DoorStatus::Open);
        assert_eq!(draft.elevator.status, ElevatorStatus::Idle);
        assert_eq!(draft.runtime.door_timer, None);
        assert!(draft.is_handled(here.id));
        assert!(draft.is_handled(dest_here.id));
        assert!(!draft.is_handled(elsewhere.id));
        // Nothing left to visit.
        assert_eq!(draft.elevator.direction, Direction::None);
    }

    #[test]
    fn direction_survives_opening_with_targets_left() {
        let (_, mut draft) = draft_at(3);
        draft.elevator.direction = Direction::Up;
        draft.runtime.targets.insert(7);
        draft.begin_opening();
        operate_doors(&mut draft, &[], TIMING);
        operate_doors(&mut draft, &[], TIMING);
        assert_eq!(draft.elevator.door_status, DoorStatus::Open);
        assert_eq!(draft.elevator.direction, Direction::Up);
    }

    #[test]
    fn open_holds_without_targets() {
        let (_, mut draft) = draft_at(3);
        draft.elevator.door_status = DoorStatus::Open;
        for _ in 0..10 {
            operate_doors(&mut draft, &[], TIMING);
        }
        assert_eq!(draft.elevator.door_status, DoorStatus::Open);
        assert_eq!(draft.elevator.status, ElevatorStatus::Idle);
    }

    #[test]
    fn queued_target_closes_then_moves() {
        let (_, mut draft) = draft_at(2);
        draft.elevator.door_status = DoorStatus::Open;
        draft.runtime.targets.insert(6);

        operate_doors(&mut draft, &[], TIMING);
        assert_eq!(draft.elevator.status, ElevatorStatus::ClosingDoors);
        assert_eq!(draft.elevator.door_status, DoorStatus::Closing);
        assert_eq!(draft.runtime.door_timer, Some(0));

        operate_doors(&mut draft, &[], TIMING);
        assert_eq!(draft.elevator.door_status, DoorStatus::Closing);

        operate_doors(&mut draft, &[], TIMING);
        assert_eq!(draft.elevator.door_status, DoorStatus::Closed);
        assert_eq!(draft.elevator.status, ElevatorStatus::MovingUp);
        assert_eq!(draft.elevator.direction, Direction::Up);
        assert_eq!(draft.runtime.door_timer, None);
    }

    #[test]
    fn closing_without_targets_parks() {
        let (_, mut draft) = draft_at(4);
        draft.elevator.direction = Direction::Down;
        draft.begin_closing();
        operate_doors(&mut draft, &[], DoorTiming { open_ticks: 1, close_ticks: 1 });
        assert_eq!(draft.elevator.door_status, DoorStatus::Closed);
        assert_eq!(draft.elevator.status, ElevatorStatus::Idle);
        assert_eq!(draft.elevator.direction, Direction::None);
    }
}
