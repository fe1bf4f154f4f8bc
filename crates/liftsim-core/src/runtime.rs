//! Per-elevator runtime state that lives only as long as the process.
//!
//! [`RuntimeArena`] is owned by the [`Scheduler`](crate::scheduler::Scheduler)
//! and is never shared: API handlers add work by writing calls to the
//! store, and the assigner picks those up on the next tick.

use std::collections::{BTreeMap, BTreeSet};

use liftsim_types::{Assignment, Call, CallId, Direction, ElevatorId};

/// Deduplicated set of floors the elevator is committed to visit.
///
/// Stored ascending; [`TargetQueue::ordered`] presents it in travel
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetQueue {
    floors: BTreeSet<u32>,
}

impl TargetQueue {
    /// An empty queue.
    pub const fn new() -> Self {
        Self {
            floors: BTreeSet::new(),
        }
    }

    /// Add a floor. Returns `false` if it was already queued.
    pub fn insert(&mut self, floor: u32) -> bool {
        self.floors.insert(floor)
    }

    /// Remove a floor. Returns `true` if it was queued.
    pub fn remove(&mut self, floor: u32) -> bool {
        self.floors.remove(&floor)
    }

    /// Whether `floor` is queued.
    pub fn contains(&self, floor: u32) -> bool {
        self.floors.contains(&floor)
    }

    /// Whether no floors are queued.
    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }

    /// Number of queued floors.
    pub fn len(&self) -> usize {
        self.floors.len()
    }

    /// Floors in travel order: descending for [`Direction::Down`],
    /// ascending otherwise.
    pub fn ordered(&self, direction: Direction) -> Vec<u32> {
        match direction {
            Direction::Down => self.floors.iter().rev().copied().collect(),
            Direction::Up | Direction::None => self.floors.iter().copied().collect(),
        }
    }

    /// The floor to head for from `current`.
    ///
    /// The nearest target ahead in `direction` wins. With nothing ahead
    /// the nearest target behind is returned, which means reversing.
    /// [`Direction::None`] picks the nearest target, ties going up.
    pub fn next(&self, direction: Direction, current: u32) -> Option<u32> {
        let above = self.floors.range(current..).next().copied();
        let below = self.floors.range(..=current).next_back().copied();
        match direction {
            Direction::Up => above.or(below),
            Direction::Down => below.or(above),
            Direction::None => match (above, below) {
                (Some(a), Some(b)) => {
                    if a.abs_diff(current) <= b.abs_diff(current) {
                        Some(a)
                    } else {
                        Some(b)
                    }
                }
                (a, b) => a.or(b),
            },
        }
    }
}

/// Runtime state of one elevator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElevatorRuntime {
    /// Floors still to visit.
    pub targets: TargetQueue,
    /// Ticks spent in the current door phase. `None` outside door phases.
    pub door_timer: Option<u32>,
    /// Calls already folded into `targets`, with the destination that was
    /// folded alongside (if any).
    folded: BTreeMap<CallId, Option<u32>>,
}

impl ElevatorRuntime {
    /// Rebuild runtime state from persisted assignments.
    ///
    /// `pending` is the building's unhandled calls; assignments whose call
    /// is no longer pending are ignored.
    pub fn hydrate(assignments: &[Assignment], pending: &[Call]) -> Self {
        let mut runtime = Self::default();
        for assignment in assignments {
            let Some(call) = pending.iter().find(|c| c.id == assignment.call_id) else {
                continue;
            };
            runtime.targets.insert(call.requested_floor);
            if let Some(dest) = call.destination_floor {
                runtime.targets.insert(dest);
            }
            runtime.folded.insert(call.id, call.destination_floor);
        }
        runtime
    }

    /// Whether `call` has been folded in already.
    pub fn is_folded(&self, call: CallId) -> bool {
        self.folded.contains_key(&call)
    }

    /// The destination folded for `call`, if any.
    pub fn folded_destination(&self, call: CallId) -> Option<u32> {
        self.folded.get(&call).copied().flatten()
    }

    /// Record that `call` was folded with `destination`.
    pub fn record_fold(&mut self, call: CallId, destination: Option<u32>) {
        self.folded.insert(call, destination);
    }

    /// Forget calls that are no longer pending.
    pub fn retain_pending(&mut self, pending: &[Call]) {
        self.folded
            .retain(|id, _| pending.iter().any(|c| c.id == *id));
    }
}

/// Arena of runtime state keyed by elevator id.
#[derive(Debug, Default)]
pub struct RuntimeArena {
    entries: BTreeMap<ElevatorId, ElevatorRuntime>,
}

impl RuntimeArena {
    /// An empty arena.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Runtime state of an elevator, if it has been seen.
    pub fn get(&self, id: ElevatorId) -> Option<&ElevatorRuntime> {
        self.entries.get(&id)
    }

    /// Replace an elevator's runtime state.
    pub fn insert(&mut self, id: ElevatorId, runtime: ElevatorRuntime) {
        self.entries.insert(id, runtime);
    }

    /// Drop entries for elevators that no longer exist.
    pub fn retain_elevators(&mut self, live: &BTreeSet<ElevatorId>) {
        self.entries.retain(|id, _| live.contains(id));
    }

    /// Number of elevators tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no elevator is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use liftsim_types::BuildingId;

    use super::*;

    fn queue(floors: &[u32]) -> TargetQueue {
        let mut q = TargetQueue::new();
        for f in floors {
            q.insert(*f);
        }
        q
    }

    #[test]
    fn insert_deduplicates() {
        let mut q = TargetQueue::new();
        assert!(q.insert(3));
        assert!(!q.insert(3));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn ordered_follows_direction() {
        let q = queue(&[5, 1, 3]);
        assert_eq!(q.ordered(Direction::Up), vec![1, 3, 5]);
        assert_eq!(q.ordered(Direction::Down), vec![5, 3, 1]);
    }

    #[test]
    fn next_prefers_targets_ahead() {
        let q = queue(&[1, 4, 7]);
        assert_eq!(q.next(Direction::Up, 2), Some(4));
        assert_eq!(q.next(Direction::Down, 5), Some(4));
        assert_eq!(q.next(Direction::Down, 2), Some(1));
    }

    #[test]
    fn next_reverses_when_nothing_ahead() {
        let q = queue(&[1, 2]);
        assert_eq!(q.next(Direction::Up, 5), Some(2));
        let q = queue(&[6, 8]);
        assert_eq!(q.next(Direction::Down, 3), Some(6));
    }

    #[test]
    fn next_without_direction_picks_nearest_ties_up() {
        let q = queue(&[2, 6]);
        assert_eq!(q.next(Direction::None, 4), Some(6));
        assert_eq!(q.next(Direction::None, 3), Some(2));
        assert_eq!(TargetQueue::new().next(Direction::None, 3), None);
    }

    #[test]
    fn hydrate_restores_pending_assignments_only() {
        let building = BuildingId::new();
        let elevator = ElevatorId::new();
        let pending = Call::new(building, 4, Some(7));
        let gone = Call::new(building, 2, None);
        let assignments = vec![
            Assignment::new(elevator, pending.id),
            Assignment::new(elevator, gone.id),
        ];

        let runtime = ElevatorRuntime::hydrate(&assignments, std::slice::from_ref(&pending));
        assert_eq!(runtime.targets.ordered(Direction::Up), vec![4, 7]);
        assert!(runtime.is_folded(pending.id));
        assert_eq!(runtime.folded_destination(pending.id), Some(7));
        assert!(!runtime.is_folded(gone.id));
        assert_eq!(runtime.door_timer, None);
    }

    #[test]
    fn arena_drops_missing_elevators() {
        let mut arena = RuntimeArena::new();
        let kept = ElevatorId::new();
        let dropped = ElevatorId::new();
        arena.insert(kept, ElevatorRuntime::default());
        arena.insert(dropped, ElevatorRuntime::default());
        arena.retain_elevators(&BTreeSet::from([kept]));
        assert_eq!(arena.len(), 1);
        assert!(arena.get(kept).is_some());
    }
}
