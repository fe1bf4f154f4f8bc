//! The sink that receives one [`ElevatorSnapshot`] per elevator per tick.
//!
//! Delivery is fire-and-forget from the scheduler's point of view: a
//! failed notification is logged and never undoes or delays persistence.
//! Implementations live next to their transport (the observer's broadcast
//! channel, the engine's NATS publisher); this module holds the trait and
//! the two combinators everybody needs.

use std::future::Future;

use liftsim_types::ElevatorSnapshot;

/// Errors a notifier can report.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The snapshot could not be encoded for the wire.
    #[error("failed to encode snapshot: {source}")]
    Encode {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// The transport refused or dropped the message.
    #[error("failed to publish snapshot: {0}")]
    Publish(String),
}

/// Receives per-elevator snapshots after each committed step.
///
/// Snapshots for one elevator arrive in tick order.
pub trait Notifier: Send + Sync {
    /// Deliver one snapshot to subscribers of its elevator.
    fn notify(
        &self,
        snapshot: &ElevatorSnapshot,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    async fn notify(&self, _snapshot: &ElevatorSnapshot) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Delivers to two notifiers.
///
/// Both are always attempted; the first error (if any) is returned.
#[derive(Debug, Clone)]
pub struct FanoutNotifier<A, B> {
    first: A,
    second: B,
}

impl<A, B> FanoutNotifier<A, B> {
    /// Combine two notifiers.
    pub const fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Notifier, B: Notifier> Notifier for FanoutNotifier<A, B> {
    async fn notify(&self, snapshot: &ElevatorSnapshot) -> Result<(), NotifyError> {
        let first = self.first.notify(snapshot).await;
        let second = self.second.notify(snapshot).await;
        first.and(second)
    }
}

impl<N: Notifier> Notifier for Option<N> {
    async fn notify(&self, snapshot: &ElevatorSnapshot) -> Result<(), NotifyError> {
        match self {
            Some(inner) => inner.notify(snapshot).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use liftsim_types::{BuildingId, Elevator};

    use super::*;

    #[derive(Debug, Default)]
    struct Recording {
        seen: Mutex<Vec<u64>>,
        fail: bool,
    }

    impl Notifier for Recording {
        async fn notify(&self, snapshot: &ElevatorSnapshot) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(snapshot.tick);
            if self.fail {
                return Err(NotifyError::Publish("down".to_owned()));
            }
            Ok(())
        }
    }

    fn snapshot(tick: u64) -> ElevatorSnapshot {
        ElevatorSnapshot::capture(&Elevator::parked(BuildingId::new()), tick)
    }

    #[tokio::test]
    async fn fanout_reaches_both_even_if_first_fails() {
        let fanout = FanoutNotifier::new(
            Recording {
                fail: true,
                ..Recording::default()
            },
            Recording::default(),
        );
        let result = fanout.notify(&snapshot(3)).await;
        assert!(matches!(result, Err(NotifyError::Publish(_))));
        assert_eq!(*fanout.first.seen.lock().unwrap(), vec![3]);
        assert_eq!(*fanout.second.seen.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn absent_notifier_is_a_no_op() {
        let none: Option<NoOpNotifier> = None;
        assert!(none.notify(&snapshot(1)).await.is_ok());
        assert!(NoOpNotifier.notify(&snapshot(1)).await.is_ok());
    }
}
