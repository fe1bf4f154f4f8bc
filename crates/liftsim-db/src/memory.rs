//! In-memory [`EntityStore`] backed by ordered maps.
//!
//! Used by unit and router tests, and by the engine when no database URL
//! is configured. A single [`RwLock`] guards all tables so
//! [`commit_step`](EntityStore::commit_step) is atomic with respect to
//! every other operation.
//!
//! Failure injection ([`InMemoryStore::set_offline`],
//! [`InMemoryStore::fail_next_commits`]) lets tests exercise the
//! transient-store-error paths of the scheduler.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use liftsim_types::{
    Assignment, AssignmentId, Building, BuildingId, Call, CallId, Elevator, ElevatorId,
};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::store::{EntityStore, StepCommit};

#[derive(Debug, Default)]
struct Tables {
    buildings: BTreeMap<BuildingId, Building>,
    elevators: BTreeMap<ElevatorId, Elevator>,
    calls: BTreeMap<CallId, Call>,
    assignments: BTreeMap<AssignmentId, Assignment>,
}

/// Process-local entity store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
    failing_commits: AtomicU32,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with [`DbError::Unavailable`] until
    /// switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    /// Make the next `count` calls to `commit_step` fail without writing.
    pub fn fail_next_commits(&self, count: u32) {
        self.failing_commits.store(count, Ordering::Release);
    }

    /// Every assignment recorded so far, in id order.
    pub async fn assignments(&self) -> Vec<Assignment> {
        self.tables.read().await.assignments.values().cloned().collect()
    }

    /// Overwrite an elevator row directly, bypassing the engine.
    ///
    /// Test fixtures use this to place an elevator in a given state.
    pub async fn put_elevator(&self, elevator: Elevator) {
        self.tables
            .write()
            .await
            .elevators
            .insert(elevator.id, elevator);
    }

    fn check_online(&self) -> Result<(), DbError> {
        if self.offline.load(Ordering::Acquire) {
            return Err(DbError::Unavailable("in-memory store is offline".to_owned()));
        }
        Ok(())
    }

    fn take_commit_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl EntityStore for InMemoryStore {
    async fn insert_building(&self, building: &Building, elevator: &Elevator) -> Result<(), DbError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        tables.buildings.insert(building.id, building.clone());
        tables.elevators.insert(elevator.id, elevator.clone());
        Ok(())
    }

    async fn building(&self, id: BuildingId) -> Result<Option<Building>, DbError> {
        self.check_online()?;
        Ok(self.tables.read().await.buildings.get(&id).cloned())
    }

    async fn elevator(&self, id: ElevatorId) -> Result<Option<Elevator>, DbError> {
        self.check_online()?;
        Ok(self.tables.read().await.elevators.get(&id).cloned())
    }

    async fn elevator_for_building(&self, building_id: BuildingId) -> Result<Option<Elevator>, DbError> {
        self.check_online()?;
        Ok(self
            .tables
            .read()
            .await
            .elevators
            .values()
            .find(|e| e.building_id == building_id)
            .cloned())
    }

    async fn buildings(&self) -> Result<Vec<Building>, DbError> {
        self.check_online()?;
        let mut buildings: Vec<Building> =
            self.tables.read().await.buildings.values().cloned().collect();
        buildings.sort_by_key(|b| (b.created_at, b.id));
        Ok(buildings)
    }

    async fn elevators_with_buildings(&self) -> Result<Vec<(Elevator, Building)>, DbError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        // BTreeMap iteration is already ordered by elevator id.
        Ok(tables
            .elevators
            .values()
            .filter_map(|e| {
                tables
                    .buildings
                    .get(&e.building_id)
                    .map(|b| (e.clone(), b.clone()))
            })
            .collect())
    }

    async fn insert_call(&self, call: &Call) -> Result<(), DbError> {
        self.check_online()?;
        self.tables.write().await.calls.insert(call.id, call.clone());
        Ok(())
    }

    async fn insert_hall_call(&self, call: &Call) -> Result<Call, DbError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let open = tables
            .calls
            .values()
            .filter(|c| {
                c.building_id == call.building_id
                    && c.requested_floor == call.requested_floor
                    && !c.is_handled
                    && c.destination_floor.is_none()
            })
            .min_by_key(|c| (c.call_time, c.id))
            .cloned();
        if let Some(existing) = open {
            return Ok(existing);
        }
        tables.calls.insert(call.id, call.clone());
        Ok(call.clone())
    }

    async fn call(&self, id: CallId) -> Result<Option<Call>, DbError> {
        self.check_online()?;
        Ok(self.tables.read().await.calls.get(&id).cloned())
    }

    async fn set_call_destination(
        &self,
        id: CallId,
        destination_floor: u32,
    ) -> Result<Option<Call>, DbError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .calls
            .get_mut(&id)
            .filter(|c| !c.is_handled)
            .map(|call| {
                call.destination_floor = Some(destination_floor);
                call.clone()
            }))
    }

    async fn pending_calls(&self, building_id: BuildingId) -> Result<Vec<Call>, DbError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut calls: Vec<Call> = tables
            .calls
            .values()
            .filter(|c| c.building_id == building_id && !c.is_handled)
            .cloned()
            .collect();
        calls.sort_by_key(|c| (c.call_time, c.id));
        Ok(calls)
    }

    async fn building_calls(&self, building_id: BuildingId) -> Result<Vec<Call>, DbError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut calls: Vec<Call> = tables
            .calls
            .values()
            .filter(|c| c.building_id == building_id)
            .cloned()
            .collect();
        calls.sort_by_key(|c| std::cmp::Reverse((c.call_time, c.id)));
        Ok(calls)
    }

    async fn active_assignments(&self, elevator_id: ElevatorId) -> Result<Vec<Assignment>, DbError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables
            .assignments
            .values()
            .filter(|a| {
                a.elevator_id == elevator_id
                    && tables.calls.get(&a.call_id).is_some_and(|c| !c.is_handled)
            })
            .cloned()
            .collect())
    }

    async fn commit_step(&self, commit: &StepCommit) -> Result<(), DbError> {
        self.check_online()?;
        if self.take_commit_failure() {
            return Err(DbError::Unavailable("injected commit failure".to_owned()));
        }

        let mut tables = self.tables.write().await;

        // Validate everything before touching anything.
        if !tables.elevators.contains_key(&commit.elevator.id) {
            return Err(DbError::NotFound(format!("elevator {}", commit.elevator.id)));
        }
        if let Some(missing) = commit
            .handled_calls
            .iter()
            .find(|id| !tables.calls.contains_key(id))
        {
            return Err(DbError::NotFound(format!("call {missing}")));
        }

        tables
            .elevators
            .insert(commit.elevator.id, commit.elevator.clone());
        for id in &commit.handled_calls {
            if let Some(call) = tables.calls.get_mut(id) {
                call.is_handled = true;
            }
        }
        for assignment in &commit.assignments {
            let already = tables
                .assignments
                .values()
                .any(|a| a.call_id == assignment.call_id);
            if !already {
                tables.assignments.insert(assignment.id, assignment.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use liftsim_types::{DoorStatus, ElevatorStatus};

    use super::*;

    async fn store_with_building(floors: u32) -> (InMemoryStore, Building, Elevator) {
        let store = InMemoryStore::new();
        let building = Building::new("Tower", floors);
        let elevator = Elevator::parked(building.id);
        store.insert_building(&building, &elevator).await.unwrap();
        (store, building, elevator)
    }

    #[tokio::test]
    async fn pending_calls_are_oldest_first() {
        let (store, building, _) = store_with_building(5).await;
        let mut late = Call::new(building.id, 3, None);
        let mut early = Call::new(building.id, 1, None);
        early.call_time = Utc::now() - Duration::seconds(10);
        late.call_time = Utc::now();
        store.insert_call(&late).await.unwrap();
        store.insert_call(&early).await.unwrap();

        let pending = store.pending_calls(building.id).await.unwrap();
        let floors: Vec<u32> = pending.iter().map(|c| c.requested_floor).collect();
        assert_eq!(floors, vec![1, 3]);
    }

    #[tokio::test]
    async fn handled_calls_are_not_pending() {
        let (store, building, elevator) = store_with_building(5).await;
        let call = Call::new(building.id, 2, None);
        store.insert_call(&call).await.unwrap();

        let commit = StepCommit {
            elevator,
            handled_calls: vec![call.id],
            assignments: Vec::new(),
        };
        store.commit_step(&commit).await.unwrap();

        assert!(store.pending_calls(building.id).await.unwrap().is_empty());
        assert!(store.call(call.id).await.unwrap().unwrap().is_handled);
    }

    #[tokio::test]
    async fn hall_call_insert_ignores_destination_calls() {
        let (store, building, _) = store_with_building(5).await;
        let cab = Call::new(building.id, 2, Some(4));
        store.insert_call(&cab).await.unwrap();

        let hall = Call::new(building.id, 2, None);
        let open = store.insert_hall_call(&hall).await.unwrap();
        assert_eq!(open.id, hall.id);

        let again = store
            .insert_hall_call(&Call::new(building.id, 2, None))
            .await
            .unwrap();
        assert_eq!(again.id, hall.id);
        assert_eq!(store.building_calls(building.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn handled_hall_call_no_longer_blocks_a_new_one() {
        let (store, building, elevator) = store_with_building(5).await;
        let first = store
            .insert_hall_call(&Call::new(building.id, 3, None))
            .await
            .unwrap();
        let commit = StepCommit {
            elevator,
            handled_calls: vec![first.id],
            assignments: Vec::new(),
        };
        store.commit_step(&commit).await.unwrap();

        let second = store
            .insert_hall_call(&Call::new(building.id, 3, None))
            .await
            .unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn destination_is_only_written_to_unhandled_calls() {
        let (store, building, elevator) = store_with_building(8).await;
        let call = Call::new(building.id, 2, None);
        store.insert_call(&call).await.unwrap();

        let updated = store.set_call_destination(call.id, 6).await.unwrap().unwrap();
        assert_eq!(updated.destination_floor, Some(6));
        assert!(!updated.is_handled);

        let commit = StepCommit {
            elevator,
            handled_calls: vec![call.id],
            assignments: Vec::new(),
        };
        store.commit_step(&commit).await.unwrap();
        assert!(store.set_call_destination(call.id, 1).await.unwrap().is_none());
        let stored = store.call(call.id).await.unwrap().unwrap();
        assert!(stored.is_handled);
        assert_eq!(stored.destination_floor, Some(6));

        assert!(store.set_call_destination(CallId::new(), 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn buildings_are_listed_oldest_first() {
        let store = InMemoryStore::new();
        let mut older = Building::new("Older", 3);
        older.created_at = Utc::now() - Duration::seconds(30);
        let newer = Building::new("Newer", 4);
        store.insert_building(&newer, &Elevator::parked(newer.id)).await.unwrap();
        store.insert_building(&older, &Elevator::parked(older.id)).await.unwrap();

        let names: Vec<String> = store
            .buildings()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["Older".to_owned(), "Newer".to_owned()]);
    }

    #[tokio::test]
    async fn failed_commit_writes_nothing() {
        let (store, building, mut elevator) = store_with_building(5).await;
        let call = Call::new(building.id, 2, None);
        store.insert_call(&call).await.unwrap();

        elevator.current_floor = 3;
        elevator.status = ElevatorStatus::MovingUp;
        let commit = StepCommit {
            elevator: elevator.clone(),
            handled_calls: vec![call.id],
            assignments: vec![Assignment::new(elevator.id, call.id)],
        };

        store.fail_next_commits(1);
        assert!(store.commit_step(&commit).await.is_err());
        let stored = store.elevator(elevator.id).await.unwrap().unwrap();
        assert_eq!(stored.current_floor, 0);
        assert!(!store.call(call.id).await.unwrap().unwrap().is_handled);
        assert!(store.assignments().await.is_empty());

        // The injected failure is consumed; the retry succeeds.
        store.commit_step(&commit).await.unwrap();
        let stored = store.elevator(elevator.id).await.unwrap().unwrap();
        assert_eq!(stored.current_floor, 3);
    }

    #[tokio::test]
    async fn commit_with_unknown_call_is_rejected_whole() {
        let (store, _, mut elevator) = store_with_building(5).await;
        elevator.door_status = DoorStatus::Opening;
        let commit = StepCommit {
            elevator: elevator.clone(),
            handled_calls: vec![CallId::new()],
            assignments: Vec::new(),
        };
        let result = store.commit_step(&commit).await;
        assert!(matches!(result, Err(DbError::NotFound(_))));
        let stored = store.elevator(elevator.id).await.unwrap().unwrap();
        assert_eq!(stored.door_status, DoorStatus::Closed);
    }

    #[tokio::test]
    async fn one_assignment_per_call() {
        let (store, building, elevator) = store_with_building(5).await;
        let call = Call::new(building.id, 4, None);
        store.insert_call(&call).await.unwrap();

        let first = StepCommit {
            elevator: elevator.clone(),
            handled_calls: Vec::new(),
            assignments: vec![Assignment::new(elevator.id, call.id)],
        };
        store.commit_step(&first).await.unwrap();
        let second = StepCommit {
            elevator: elevator.clone(),
            handled_calls: Vec::new(),
            assignments: vec![Assignment::new(elevator.id, call.id)],
        };
        store.commit_step(&second).await.unwrap();

        assert_eq!(store.assignments().await.len(), 1);
        assert_eq!(store.active_assignments(elevator.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn offline_store_fails_reads() {
        let (store, building, _) = store_with_building(3).await;
        store.set_offline(true);
        assert!(matches!(
            store.pending_calls(building.id).await,
            Err(DbError::Unavailable(_))
        ));
        store.set_offline(false);
        assert!(store.pending_calls(building.id).await.is_ok());
    }
}
