//! NATS snapshot publisher.
//!
//! [`NatsNotifier`] publishes every committed elevator snapshot as JSON on
//! `liftsim.elevator.{elevator_id}`, so external subscribers can follow
//! one elevator (`liftsim.elevator.<id>`) or all of them
//! (`liftsim.elevator.*`). Publishing is fire-and-forget: a failed
//! publish is reported to the scheduler, which logs it and moves on.

use liftsim_core::{Notifier, NotifyError};
use liftsim_types::{ElevatorId, ElevatorSnapshot};
use tracing::debug;

use crate::error::EngineError;

/// Subject prefix for elevator snapshots.
const SUBJECT_PREFIX: &str = "liftsim.elevator";

/// Subject a given elevator's snapshots are published on.
fn subject_for(elevator_id: ElevatorId) -> String {
    format!("{SUBJECT_PREFIX}.{elevator_id}")
}

/// A [`Notifier`] that publishes to NATS.
pub struct NatsNotifier {
    client: async_nats::Client,
}

impl NatsNotifier {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Nats`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, EngineError> {
        let client = async_nats::connect(url).await.map_err(|e| EngineError::Nats {
            message: format!("failed to connect to NATS at {url}: {e}"),
        })?;
        Ok(Self { client })
    }
}

impl Notifier for NatsNotifier {
    async fn notify(&self, snapshot: &ElevatorSnapshot) -> Result<(), NotifyError> {
        let subject = subject_for(snapshot.elevator_id);
        let payload = serde_json::to_vec(snapshot)?;
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| NotifyError::Publish(format!("{subject}: {e}")))?;
        debug!(subject, tick = snapshot.tick, "Published elevator snapshot");
        Ok(())
    }
}
