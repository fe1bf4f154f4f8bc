//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, over an in-memory store.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use liftsim_core::config::BuildingLimits;
use liftsim_core::{DoorTiming, Notifier, Scheduler, SchedulerControl};
use liftsim_db::{EntityStore, InMemoryStore, StepCommit};
use liftsim_observer::router::build_router;
use liftsim_observer::state::AppState;
use liftsim_types::{BuildingId, Elevator, ElevatorSnapshot};
use serde_json::Value;
use tower::ServiceExt;

fn make_state() -> Arc<AppState<InMemoryStore>> {
    Arc::new(AppState::new(
        Arc::new(InMemoryStore::new()),
        BuildingLimits::default(),
    ))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn put_json(uri: &str, body: &Value) -> Request<Body> {
    Request::put(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// Create a building through the API and return (`building_id`, `elevator_id`).
async fn create_tower(router: &Router, floors: u32) -> (String, String) {
    let (status, json) = send(
        router,
        post_json(
            "/api/buildings",
            &serde_json::json!({"name": "Tower", "floor_count": floors}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        json["building"]["id"].as_str().unwrap().to_owned(),
        json["elevator"]["id"].as_str().unwrap().to_owned(),
    )
}

// =========================================================================
// Health
// =========================================================================

#[tokio::test]
async fn test_health() {
    let router = build_router(make_state());
    let (status, json) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["tick"].is_null());
}

// =========================================================================
// Buildings
// =========================================================================

#[tokio::test]
async fn test_create_and_get_building() {
    let router = build_router(make_state());
    let (building_id, elevator_id) = create_tower(&router, 5).await;

    let (status, json) = send(&router, get(&format!("/api/buildings/{building_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["building"]["floor_count"], 5);
    assert_eq!(json["elevator"]["id"], elevator_id.as_str());
    assert_eq!(json["elevator"]["current_floor"], 0);
    assert!(json["snapshot"].is_null());
}

#[tokio::test]
async fn test_list_buildings() {
    let router = build_router(make_state());
    let (status, json) = send(&router, get("/api/buildings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);

    let (first, _) = create_tower(&router, 5).await;
    let (second, _) = create_tower(&router, 8).await;
    let (status, json) = send(&router, get("/api/buildings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    let ids: Vec<&str> = json["buildings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
}

#[tokio::test]
async fn test_create_building_rejects_bad_floor_count() {
    let router = build_router(make_state());
    let (status, json) = send(
        &router,
        post_json(
            "/api/buildings",
            &serde_json::json!({"name": "Tower", "floor_count": 0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_get_building_not_found() {
    let router = build_router(make_state());
    let path = format!("/api/buildings/{}", BuildingId::new());
    let (status, _) = send(&router, get(&path)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_building_invalid_uuid() {
    let router = build_router(make_state());
    let (status, json) = send(&router, get("/api/buildings/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("invalid UUID"));
}

// =========================================================================
// Calls
// =========================================================================

#[tokio::test]
async fn test_create_call_and_list() {
    let router = build_router(make_state());
    let (building_id, _) = create_tower(&router, 8).await;

    let (status, call) = send(
        &router,
        post_json(
            "/api/calls",
            &serde_json::json!({"building_id": building_id, "requested_floor": 3}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(call["requested_floor"], 3);
    assert_eq!(call["is_handled"], false);
    assert!(call["destination_floor"].is_null());

    let (status, json) = send(&router, get(&format!("/api/buildings/{building_id}/calls"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["calls"][0]["id"], call["id"]);

    let (_, json) = send(
        &router,
        get(&format!("/api/buildings/{building_id}/calls?handled=true")),
    )
    .await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_duplicate_hall_call_returns_existing() {
    let router = build_router(make_state());
    let (building_id, _) = create_tower(&router, 8).await;
    let body = serde_json::json!({"building_id": building_id, "requested_floor": 4});

    let (_, first) = send(&router, post_json("/api/calls", &body)).await;
    let (_, second) = send(&router, post_json("/api/calls", &body)).await;
    assert_eq!(first["id"], second["id"]);
}

#[tokio::test]
async fn test_create_call_rejects_out_of_range_floor() {
    let router = build_router(make_state());
    let (building_id, _) = create_tower(&router, 5).await;
    let (status, json) = send(
        &router,
        post_json(
            "/api/calls",
            &serde_json::json!({"building_id": building_id, "requested_floor": 5}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("outside"));
}

#[tokio::test]
async fn test_create_call_unknown_building() {
    let router = build_router(make_state());
    let (status, _) = send(
        &router,
        post_json(
            "/api/calls",
            &serde_json::json!({"building_id": BuildingId::new(), "requested_floor": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_set_destination() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));
    let (building_id, _) = create_tower(&router, 10).await;
    let (_, call) = send(
        &router,
        post_json(
            "/api/calls",
            &serde_json::json!({"building_id": building_id, "requested_floor": 2}),
        ),
    )
    .await;
    let call_id = call["id"].as_str().unwrap().to_owned();
    let uri = format!("/api/calls/{call_id}/destination");

    let (status, updated) = send(
        &router,
        put_json(&uri, &serde_json::json!({"destination_floor": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["destination_floor"], 6);

    // Once handled, the destination can no longer change.
    let elevator = state
        .store
        .elevator_for_building(building_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    let commit = StepCommit {
        elevator,
        handled_calls: vec![call_id.parse().unwrap()],
        assignments: Vec::new(),
    };
    state.store.commit_step(&commit).await.unwrap();
    let (status, _) = send(
        &router,
        put_json(&uri, &serde_json::json!({"destination_floor": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_store_outage_is_service_unavailable() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));
    let (building_id, _) = create_tower(&router, 5).await;
    state.store.set_offline(true);

    let (status, json) = send(&router, get(&format!("/api/buildings/{building_id}"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], 503);
}

// =========================================================================
// Elevators
// =========================================================================

#[tokio::test]
async fn test_get_elevator_before_first_tick() {
    let router = build_router(make_state());
    let (_, elevator_id) = create_tower(&router, 5).await;
    let (status, json) = send(&router, get(&format!("/api/elevators/{elevator_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tick"], 0);
    assert_eq!(json["status"], "Idle");
    assert_eq!(json["door_status"], "Closed");
}

#[tokio::test]
async fn test_get_elevator_not_found() {
    let router = build_router(make_state());
    let elevator = Elevator::parked(BuildingId::new());
    let (status, _) = send(&router, get(&format!("/api/elevators/{}", elevator.id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scheduler_snapshots_reach_elevator_endpoint() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));
    let (building_id, elevator_id) = create_tower(&router, 6).await;
    send(
        &router,
        post_json(
            "/api/calls",
            &serde_json::json!({"building_id": building_id, "requested_floor": 2}),
        ),
    )
    .await;

    let mut rx = state.subscribe();
    let mut scheduler = Scheduler::new(
        Arc::clone(&state.store),
        state.notifier(),
        DoorTiming::default(),
    );
    for tick in 1..=3 {
        scheduler.run_cycle(tick).await;
    }

    let (status, json) = send(&router, get(&format!("/api/elevators/{elevator_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tick"], 3);
    assert_eq!(json["current_floor"], 2);

    let streamed: Vec<ElevatorSnapshot> = vec![
        rx.recv().await.unwrap(),
        rx.recv().await.unwrap(),
        rx.recv().await.unwrap(),
    ];
    assert!(streamed.windows(2).all(|w| w[0].tick < w[1].tick));
}

#[tokio::test]
async fn test_latest_snapshot_is_embedded_in_building() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));
    let (building_id, _) = create_tower(&router, 4).await;
    let (building, elevator) = {
        let id = building_id.parse().unwrap();
        let building = state.store.building(id).await.unwrap().unwrap();
        let elevator = state.store.elevator_for_building(id).await.unwrap().unwrap();
        (building, elevator)
    };
    state
        .notifier()
        .notify(&ElevatorSnapshot::capture(&elevator, 9))
        .await
        .unwrap();

    let (_, json) = send(&router, get(&format!("/api/buildings/{}", building.id))).await;
    assert_eq!(json["snapshot"]["tick"], 9);
}

// =========================================================================
// Operator
// =========================================================================

#[tokio::test]
async fn test_operator_without_scheduler_is_unavailable() {
    let router = build_router(make_state());
    let (status, _) = send(&router, get("/api/operator/status")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_operator_controls() {
    let control = Arc::new(SchedulerControl::new(500));
    let state = Arc::new(
        AppState::new(Arc::new(InMemoryStore::new()), BuildingLimits::default())
            .with_control(Arc::clone(&control)),
    );
    let router = build_router(state);

    let (status, _) = send(&router, post_json("/api/operator/pause", &Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(control.is_paused());

    let (_, json) = send(&router, get("/api/operator/status")).await;
    assert_eq!(json["paused"], true);
    assert_eq!(json["tick_interval_ms"], 500);

    let (status, json) = send(
        &router,
        post_json(
            "/api/operator/speed",
            &serde_json::json!({"tick_interval_ms": 100}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["previous_interval_ms"], 500);
    assert_eq!(control.tick_interval_ms(), 100);

    let (status, _) = send(
        &router,
        post_json(
            "/api/operator/speed",
            &serde_json::json!({"tick_interval_ms": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(&router, post_json("/api/operator/resume", &Value::Null)).await;
    assert!(!control.is_paused());

    send(&router, post_json("/api/operator/stop", &Value::Null)).await;
    assert!(control.is_stop_requested());

    let (_, json) = send(&router, get("/health")).await;
    assert_eq!(json["tick"], 0);
}
