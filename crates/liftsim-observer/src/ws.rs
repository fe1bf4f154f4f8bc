//! `WebSocket` handler for per-elevator snapshot streaming.
//!
//! Clients connect to `GET /ws/elevators/{id}` and receive a JSON-encoded
//! [`ElevatorSnapshot`] each time the scheduler commits a step for that
//! elevator, starting with the latest known snapshot. All clients share
//! one [`broadcast`](tokio::sync::broadcast) channel and filter on the
//! elevator id, so each connection is a subscriber group of one.
//!
//! If a client falls behind, lagged messages are skipped and the client
//! resumes from the most recent snapshot. Snapshots still arrive in tick
//! order.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use liftsim_db::EntityStore;
use liftsim_types::{ElevatorId, ElevatorSnapshot};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::error::ObserverError;
use crate::handlers::parse_id;
use crate::state::AppState;

/// Upgrade to a `WebSocket` streaming one elevator's snapshots.
///
/// # Route
///
/// `GET /ws/elevators/{id}`
pub async fn ws_elevator<S: EntityStore + 'static>(
    ws: WebSocketUpgrade,
    Path(id_str): Path<String>,
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let elevator_id: ElevatorId = parse_id(&id_str)?;
    if state.store.elevator(elevator_id).await?.is_none() {
        return Err(ObserverError::NotFound(format!("elevator {elevator_id}")));
    }
    Ok(ws.on_upgrade(move |socket| handle_ws(socket, state, elevator_id)))
}

/// Send one snapshot as a text frame. Returns `false` once the client is
/// gone.
async fn send_snapshot(socket: &mut WebSocket, snapshot: &ElevatorSnapshot) -> bool {
    let json = match serde_json::to_string(snapshot) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "Failed to serialize elevator snapshot");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

/// One client's view of the snapshot stream: a single elevator's
/// snapshots, strictly increasing in tick.
#[derive(Debug)]
pub struct SnapshotFeed {
    elevator_id: ElevatorId,
    last_tick: u64,
    rx: broadcast::Receiver<ElevatorSnapshot>,
}

impl SnapshotFeed {
    /// Subscribe to `elevator_id` and return the feed with the latest
    /// known snapshot, which the client receives first.
    ///
    /// The subscription is taken before the latest snapshot is read, so
    /// no commit falls in between. The returned snapshot's tick is not
    /// delivered again by [`SnapshotFeed::next`].
    pub async fn open<S>(
        state: &AppState<S>,
        elevator_id: ElevatorId,
    ) -> (Self, Option<ElevatorSnapshot>) {
        let rx = state.subscribe();
        let mut feed = Self {
            elevator_id,
            last_tick: 0,
            rx,
        };
        let latest = state.latest_snapshot(elevator_id).await;
        let latest = latest.filter(|snapshot| feed.accept(snapshot));
        (feed, latest)
    }

    /// Whether `snapshot` belongs on this feed. Accepting it advances the
    /// feed's tick.
    pub fn accept(&mut self, snapshot: &ElevatorSnapshot) -> bool {
        if snapshot.elevator_id != self.elevator_id || snapshot.tick <= self.last_tick {
            return false;
        }
        self.last_tick = snapshot.tick;
        true
    }

    /// The next snapshot for this feed, or `None` once the channel closes.
    ///
    /// A lagging receiver skips ahead to the oldest retained snapshot.
    /// Cancel-safe: dropping the future loses no accepted snapshot.
    pub async fn next(&mut self) -> Option<ElevatorSnapshot> {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => {
                    if self.accept(&snapshot) {
                        return Some(snapshot);
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    debug!(elevator_id = %self.elevator_id, skipped = n, "WebSocket client lagged, skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

async fn handle_ws<S>(mut socket: WebSocket, state: Arc<AppState<S>>, elevator_id: ElevatorId) {
    debug!(%elevator_id, "WebSocket client connected");

    let (mut feed, latest) = SnapshotFeed::open(&state, elevator_id).await;
    if let Some(snapshot) = latest {
        if !send_snapshot(&mut socket, &snapshot).await {
            return;
        }
    }

    loop {
        tokio::select! {
            next = feed.next() => {
                let Some(snapshot) = next else {
                    debug!("Broadcast channel closed, shutting down WebSocket");
                    return;
                };
                if !send_snapshot(&mut socket, &snapshot).await {
                    debug!(%elevator_id, "WebSocket client disconnected (send failed)");
                    return;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%elevator_id, "WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%elevator_id, error = %e, "WebSocket error");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}
