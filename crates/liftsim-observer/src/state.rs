//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the store handle the call endpoints write through,
//! the broadcast channel that carries elevator snapshots to `WebSocket`
//! clients, and the latest snapshot per elevator for the REST reads.
//! [`BroadcastNotifier`] is the scheduler-side half: the engine hands it
//! to the scheduler, and every committed step lands here.

use std::collections::BTreeMap;
use std::sync::Arc;

use liftsim_core::config::BuildingLimits;
use liftsim_core::{Notifier, NotifyError, SchedulerControl};
use liftsim_types::{ElevatorId, ElevatorSnapshot};
use tokio::sync::{RwLock, broadcast};

/// Capacity of the snapshot broadcast channel.
///
/// A subscriber that falls behind by more than this many messages
/// receives [`broadcast::error::RecvError::Lagged`] and skips to the
/// newest snapshot.
const BROADCAST_CAPACITY: usize = 256;

/// Latest snapshot of every elevator that has been stepped at least once.
pub type LatestSnapshots = Arc<RwLock<BTreeMap<ElevatorId, ElevatorSnapshot>>>;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
pub struct AppState<S> {
    /// The entity store behind the building and call endpoints.
    pub store: Arc<S>,
    /// Limits applied to new buildings.
    pub limits: BuildingLimits,
    /// Broadcast sender for elevator snapshots.
    pub tx: broadcast::Sender<ElevatorSnapshot>,
    /// Latest snapshot per elevator.
    pub latest: LatestSnapshots,
    /// Scheduler control, present when a scheduler is running.
    pub control: Option<Arc<SchedulerControl>>,
}

impl<S> AppState<S> {
    /// Create application state over `store` with no scheduler attached.
    pub fn new(store: Arc<S>, limits: BuildingLimits) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            store,
            limits,
            tx,
            latest: Arc::new(RwLock::new(BTreeMap::new())),
            control: None,
        }
    }

    /// Attach the scheduler control so the operator endpoints work.
    #[must_use]
    pub fn with_control(mut self, control: Arc<SchedulerControl>) -> Self {
        self.control = Some(control);
        self
    }

    /// Subscribe to every elevator's snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<ElevatorSnapshot> {
        self.tx.subscribe()
    }

    /// A notifier feeding this state's channel and latest-snapshot map.
    pub fn notifier(&self) -> BroadcastNotifier {
        BroadcastNotifier {
            tx: self.tx.clone(),
            latest: Arc::clone(&self.latest),
        }
    }

    /// Latest snapshot of one elevator, if it has been stepped.
    pub async fn latest_snapshot(&self, id: ElevatorId) -> Option<ElevatorSnapshot> {
        self.latest.read().await.get(&id).copied()
    }
}

/// [`Notifier`] that records the latest snapshot and fans it out to
/// connected `WebSocket` clients.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ElevatorSnapshot>,
    latest: LatestSnapshots,
}

impl Notifier for BroadcastNotifier {
    async fn notify(&self, snapshot: &ElevatorSnapshot) -> Result<(), NotifyError> {
        self.latest
            .write()
            .await
            .insert(snapshot.elevator_id, *snapshot);
        // send fails only when nobody is subscribed, which is normal.
        let _ = self.tx.send(*snapshot);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use liftsim_db::InMemoryStore;
    use liftsim_types::{BuildingId, Elevator};

    use super::*;

    fn state() -> AppState<InMemoryStore> {
        AppState::new(Arc::new(InMemoryStore::new()), BuildingLimits::default())
    }

    #[tokio::test]
    async fn notifier_updates_latest_and_broadcasts() {
        let state = state();
        let mut rx = state.subscribe();
        let notifier = state.notifier();
        let elevator = Elevator::parked(BuildingId::new());

        notifier
            .notify(&ElevatorSnapshot::capture(&elevator, 1))
            .await
            .unwrap();
        notifier
            .notify(&ElevatorSnapshot::capture(&elevator, 2))
            .await
            .unwrap();

        assert_eq!(state.latest_snapshot(elevator.id).await.unwrap().tick, 2);
        assert_eq!(rx.recv().await.unwrap().tick, 1);
        assert_eq!(rx.recv().await.unwrap().tick, 2);
    }

    #[tokio::test]
    async fn notifier_without_subscribers_succeeds() {
        let state = state();
        let elevator = Elevator::parked(BuildingId::new());
        let result = state
            .notifier()
            .notify(&ElevatorSnapshot::capture(&elevator, 1))
            .await;
        assert!(result.is_ok());
    }
}
