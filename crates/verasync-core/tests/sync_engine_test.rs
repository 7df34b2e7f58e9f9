#![allow(clippy::unwrap_used)]
// Integration tests for the lu_sdata sync engine using wiremock.

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use verasync_api::TransportConfig;
use verasync_core::{
    Connection, ConnectionKind, Controller, CoreError, DeviceCommand, DeviceKind, DeviceRegistry,
    HouseMode, SceneBuilder, SyncConfig, SyncCursor, SyncEvent, UpdatedEntity,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn test_sync_config() -> SyncConfig {
    SyncConfig {
        poll_timeout: Duration::from_secs(1),
        request_pause: Duration::from_millis(10),
        backoff_base: Duration::from_millis(50),
        ..SyncConfig::default()
    }
}

fn connection(server: &MockServer) -> Connection {
    let kind = ConnectionKind::Local {
        host: server.address().ip().to_string(),
        port: server.address().port(),
    };
    Connection::new(kind, &TransportConfig::default()).unwrap()
}

async fn setup() -> (MockServer, Controller) {
    let server = MockServer::start().await;
    let controller = Controller::new(connection(&server), test_sync_config());
    (server, controller)
}

async fn mount_alive(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_alive"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(server)
        .await;
}

async fn mount_house_mode(server: &MockServer, code: &str) {
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "variableget"))
        .and(query_param("Variable", "Mode"))
        .respond_with(ResponseTemplate::new(200).set_body_string(code))
        .mount(server)
        .await;
}

/// lu_sdata answer for a given request `loadtime`.
async fn mount_sdata(server: &MockServer, loadtime: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_sdata"))
        .and(query_param("loadtime", loadtime))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn full_snapshot() -> Value {
    json!({
        "full": 1, "model": "VeraEdge", "serial_number": "45012345", "temperature": "C",
        "version": "*1.7.4001*", "state": -1, "comment": "", "mode": 1,
        "loadtime": 100, "dataversion": 5,
        "rooms": [{ "id": 1, "name": "Living", "section": 1 }],
        "scenes": [{ "id": 3, "name": "Movie", "room": 1, "active": 0 }],
        "devices": [{ "id": 1, "name": "Lamp", "category": 3, "room": 1, "status": "0" }]
    })
}

async fn next_event(rx: &mut broadcast::Receiver<SyncEvent>) -> SyncEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a sync event")
        .unwrap()
}

fn drain(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_snapshot_bootstraps_empty_store() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_sdata(&server, "0", full_snapshot()).await;
    let mut rx = controller.subscribe();

    assert!(controller.devices_snapshot().is_empty());
    assert!(controller.hub_info().cursor.is_initial());

    controller.full_refresh().await.unwrap();

    let devices = controller.devices_snapshot();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, 1);
    assert_eq!(devices[0].kind, DeviceKind::Switch { on: false });
    assert_eq!(controller.hub_info().cursor, SyncCursor::new(100, 5));
    assert_eq!(controller.hub_info().model.as_deref(), Some("VeraEdge"));

    let events = drain(&mut rx);
    let sent: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::DataSent { path, .. } => Some(path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], "data_request?id=lu_alive");
    assert!(sent[1].starts_with("data_request?id=lu_sdata&loadtime=0&dataversion=0"));
    assert!(sent[1].contains("minimumdelay=500&timeout=1"));
    assert!(matches!(
        events.last(),
        Some(SyncEvent::DataReceived { cursor, .. }) if *cursor == SyncCursor::new(100, 5)
    ));
    assert!(!events.iter().any(|e| matches!(e, SyncEvent::EntityUpdated(_))));
}

#[tokio::test]
async fn test_delta_updates_existing_device_once() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_house_mode(&server, "1").await;
    mount_sdata(&server, "0", full_snapshot()).await;
    mount_sdata(
        &server,
        "100",
        json!({ "loadtime": 150, "dataversion": 9, "devices": [{ "id": 1, "status": "1" }] }),
    )
    .await;
    // Nothing else changes: the hub holds the request, then answers with the same cursor.
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_sdata"))
        .and(query_param("loadtime", "150"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "loadtime": 150, "dataversion": 9 }))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let mut rx = controller.subscribe();
    controller.start_listening().await.unwrap();
    assert!(controller.is_listening());

    let mut updates = Vec::new();
    loop {
        match next_event(&mut rx).await {
            SyncEvent::EntityUpdated(entity) => updates.push(entity),
            SyncEvent::DataReceived { cursor, .. } if cursor == SyncCursor::new(150, 9) => break,
            _ => {}
        }
    }
    // Let a few idle polls go by; they must not announce anything.
    tokio::time::sleep(Duration::from_millis(300)).await;
    controller.stop_listening().await;

    updates.extend(drain(&mut rx).into_iter().filter_map(|e| match e {
        SyncEvent::EntityUpdated(entity) => Some(entity),
        _ => None,
    }));
    assert_eq!(updates.len(), 1);
    match &updates[0] {
        UpdatedEntity::Device(device) => {
            assert_eq!(device.id, 1);
            assert_eq!(device.kind, DeviceKind::Switch { on: true });
            assert_eq!(device.name, "Lamp");
        }
        other => panic!("expected a device update, got {other:?}"),
    }

    assert_eq!(controller.devices_snapshot().len(), 1);
    assert_eq!(controller.hub_info().cursor, SyncCursor::new(150, 9));
}

#[tokio::test]
async fn test_house_mode_change_fires_once() {
    let (server, controller) = setup().await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "variableget"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_house_mode(&server, "2").await;

    assert_eq!(controller.request_house_mode().await.unwrap(), HouseMode::Home);
    let mut rx = controller.subscribe();

    assert_eq!(controller.request_house_mode().await.unwrap(), HouseMode::Away);
    assert_eq!(controller.request_house_mode().await.unwrap(), HouseMode::Away);

    let changes: Vec<(HouseMode, HouseMode)> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            SyncEvent::HouseModeChanged { old, new } => Some((old, new)),
            _ => None,
        })
        .collect();
    assert_eq!(changes, [(HouseMode::Home, HouseMode::Away)]);
    assert_eq!(controller.house_mode(), HouseMode::Away);
}

#[tokio::test]
async fn test_listening_loop_reports_house_mode_change() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_sdata(&server, "0", full_snapshot()).await;
    mount_sdata(&server, "100", json!({ "loadtime": 100, "dataversion": 5 })).await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "variableget"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_house_mode(&server, "2").await;

    let mut rx = controller.subscribe();
    controller.start_listening().await.unwrap();
    assert_eq!(controller.house_mode(), HouseMode::Home);

    let mut changes = Vec::new();
    while changes.is_empty() {
        if let SyncEvent::HouseModeChanged { old, new } = next_event(&mut rx).await {
            changes.push((old, new));
        }
    }
    // Later iterations keep answering "2" and must stay quiet.
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.stop_listening().await;

    changes.extend(drain(&mut rx).into_iter().filter_map(|e| match e {
        SyncEvent::HouseModeChanged { old, new } => Some((old, new)),
        _ => None,
    }));
    assert_eq!(changes, [(HouseMode::Home, HouseMode::Away)]);
    assert_eq!(controller.house_mode(), HouseMode::Away);
}

#[tokio::test]
async fn test_mode_in_sdata_updates_silently() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_house_mode(&server, "2").await;
    mount_sdata(&server, "0", full_snapshot()).await;
    mount_sdata(
        &server,
        "100",
        json!({ "loadtime": 120, "dataversion": 6, "mode": 2 }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_sdata"))
        .and(query_param("loadtime", "120"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "loadtime": 120, "dataversion": 6, "mode": 2 }))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let mut rx = controller.subscribe();
    controller.start_listening().await.unwrap();
    assert_eq!(controller.house_mode(), HouseMode::Home);

    let mut events = Vec::new();
    loop {
        let event = next_event(&mut rx).await;
        let done = matches!(
            &event,
            SyncEvent::DataReceived { cursor, .. } if *cursor == SyncCursor::new(120, 6)
        );
        events.push(event);
        if done {
            break;
        }
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.stop_listening().await;
    events.extend(drain(&mut rx));

    assert_eq!(controller.house_mode(), HouseMode::Away);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SyncEvent::HouseModeChanged { .. }))
    );
}

#[tokio::test]
async fn test_device_stream_sees_each_merge() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_sdata(&server, "0", full_snapshot()).await;

    let mut devices = controller.devices();
    assert!(devices.current().is_empty());

    controller.full_refresh().await.unwrap();
    let snapshot = devices.changed().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(devices.current()[0].name, "Lamp");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failures_back_off_and_recover() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_house_mode(&server, "1").await;
    mount_sdata(&server, "0", full_snapshot()).await;
    mount_sdata(&server, "100", json!({ "loadtime": 100, "dataversion": 5 })).await;

    let mut rx = controller.subscribe();
    controller.start_listening().await.unwrap();

    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_sdata"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Luup is reloading"))
        .up_to_n_times(3)
        .with_priority(1)
        .mount(&server)
        .await;

    let mut errors = Vec::new();
    let recovered_at = loop {
        match next_event(&mut rx).await {
            SyncEvent::Error(e) => {
                assert!(controller.is_listening());
                assert!(matches!(*e, CoreError::Api { status: Some(500), .. }));
                errors.push(Instant::now());
            }
            SyncEvent::DataReceived { .. } if !errors.is_empty() => break Instant::now(),
            _ => {}
        }
    };
    assert!(controller.is_listening());
    controller.stop_listening().await;
    assert!(!controller.is_listening());

    assert_eq!(errors.len(), 3);
    // Sleeps of base x1, x2, x4 follow the three failures.
    let slack = Duration::from_millis(10);
    assert!(errors[1] - errors[0] + slack >= Duration::from_millis(50));
    assert!(errors[2] - errors[1] + slack >= Duration::from_millis(100));
    assert!(recovered_at - errors[2] + slack >= Duration::from_millis(200));
}

// ── Full snapshot semantics ─────────────────────────────────────────

#[tokio::test]
async fn test_full_snapshot_replaces_previous_entities() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_sdata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_snapshot()))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_sdata(
        &server,
        "0",
        json!({
            "full": 1, "loadtime": 300, "dataversion": 1,
            "devices": [{ "id": 7, "name": "Siren", "category": 4 }]
        }),
    )
    .await;

    controller.full_refresh().await.unwrap();
    assert_eq!(controller.rooms_snapshot().len(), 1);
    let mut rx = controller.subscribe();

    controller.full_refresh().await.unwrap();
    let devices = controller.devices_snapshot();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, 7);
    assert!(matches!(devices[0].kind, DeviceKind::SecuritySensor { .. }));
    assert!(controller.rooms_snapshot().is_empty());
    assert!(controller.scenes_snapshot().is_empty());
    assert_eq!(controller.hub_info().cursor, SyncCursor::new(300, 1));
    assert!(
        !drain(&mut rx)
            .iter()
            .any(|e| matches!(e, SyncEvent::EntityUpdated(_)))
    );
}

#[tokio::test]
async fn test_injected_registry_controls_device_shapes() {
    let server = MockServer::start().await;
    mount_alive(&server).await;
    mount_sdata(&server, "0", full_snapshot()).await;

    let registry = DeviceRegistry::empty().with(3, DeviceKind::door_lock);
    let controller = Controller::with_registry(connection(&server), registry, test_sync_config());
    controller.full_refresh().await.unwrap();

    let device = controller.store().device(1).unwrap();
    assert_eq!(device.kind, DeviceKind::DoorLock { locked: false });
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_fails_when_hub_is_not_alive() {
    let (server, controller) = setup().await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_alive"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ERROR: starting up"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_sdata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_snapshot()))
        .expect(0)
        .mount(&server)
        .await;

    let err = controller.start_listening().await.unwrap_err();
    assert!(matches!(err, CoreError::HubUnreachable { .. }));
    assert!(!controller.is_listening());
    assert!(!controller.is_alive().await);
}

#[tokio::test]
async fn test_bootstrap_poll_failure_is_returned() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_sdata"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let err = controller.start_listening().await.unwrap_err();
    assert!(matches!(err, CoreError::Protocol { .. }));
    assert!(!controller.is_listening());
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_house_mode(&server, "1").await;
    mount_sdata(&server, "0", full_snapshot()).await;
    mount_sdata(&server, "100", json!({ "loadtime": 100, "dataversion": 5 })).await;

    controller.stop_listening().await;
    controller.start_listening().await.unwrap();
    controller.start_listening().await.unwrap();
    assert!(controller.is_listening());

    assert!(matches!(
        controller.full_refresh().await,
        Err(CoreError::ListenerRunning { .. })
    ));
    assert!(matches!(
        controller.demand_full_snapshot(),
        Err(CoreError::ListenerRunning { .. })
    ));

    controller.stop_listening().await;
    controller.stop_listening().await;
    assert!(!controller.is_listening());

    controller.demand_full_snapshot().unwrap();
    assert!(controller.hub_info().cursor.is_initial());
}

#[tokio::test]
async fn test_stop_abandons_pending_long_poll_silently() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_house_mode(&server, "1").await;
    mount_sdata(&server, "0", full_snapshot()).await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_sdata"))
        .and(query_param("loadtime", "100"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "loadtime": 100, "dataversion": 5 }))
                .set_delay(Duration::from_secs(20)),
        )
        .mount(&server)
        .await;

    let mut rx = controller.subscribe();
    controller.start_listening().await.unwrap();
    // Let the loop enter its long poll.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    controller.stop_listening().await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(
        !drain(&mut rx)
            .iter()
            .any(|e| matches!(e, SyncEvent::Error(_)))
    );
}

// ── One-shot actions ────────────────────────────────────────────────

#[tokio::test]
async fn test_set_house_mode_checks_confirmation() {
    let (server, controller) = setup().await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_action"))
        .and(query_param(
            "serviceId",
            "urn:micasaverde-com:serviceId:HomeAutomationGateway1",
        ))
        .and(query_param("action", "SetHouseMode"))
        .and(query_param("Mode", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<u:SetHouseModeResponse><OK>OK</OK></u:SetHouseModeResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_action"))
        .and(query_param("Mode", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ERROR: Invalid Service"))
        .mount(&server)
        .await;

    controller.set_house_mode(HouseMode::Night).await.unwrap();
    assert!(matches!(
        controller.set_house_mode(HouseMode::Away).await,
        Err(CoreError::Rejected { .. })
    ));
    assert!(matches!(
        controller.set_house_mode(HouseMode::Unknown(9)).await,
        Err(CoreError::ValidationFailed { .. })
    ));
}

#[tokio::test]
async fn test_room_actions_keep_store_in_step() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_sdata(&server, "0", full_snapshot()).await;
    mount_sdata(
        &server,
        "100",
        json!({ "loadtime": 110, "dataversion": 6, "rooms": [{ "id": 2, "name": "Garage", "section": 1 }] }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "room"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    controller.full_refresh().await.unwrap();

    let garage = controller.create_room("Garage").await.unwrap().unwrap();
    assert_eq!(garage.id, 2);
    assert_eq!(controller.rooms_snapshot().len(), 2);

    let renamed = controller.rename_room(2, "Workshop").await.unwrap();
    assert_eq!(renamed.name, "Workshop");
    assert_eq!(controller.store().room(2).unwrap().name, "Workshop");

    controller.delete_room(2).await.unwrap();
    assert!(controller.store().room(2).is_none());

    assert!(matches!(
        controller.delete_room(2).await,
        Err(CoreError::RoomNotFound { id: 2 })
    ));
    assert!(matches!(
        controller.create_room("  ").await,
        Err(CoreError::ValidationFailed { .. })
    ));
}

#[tokio::test]
async fn test_create_scene_sends_definition_and_picks_up_scene() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_sdata(&server, "0", full_snapshot()).await;
    mount_sdata(
        &server,
        "100",
        json!({ "loadtime": 110, "dataversion": 6,
                "scenes": [{ "id": 8, "name": "Lights out", "room": 1, "active": 0 }] }),
    )
    .await;

    let request = SceneBuilder::new("Lights out")
        .in_room(1)
        .with_action(
            Duration::ZERO,
            1,
            DeviceCommand::new("urn:upnp-org:serviceId:SwitchPower1", "SetTarget")
                .with_parameter("newTargetValue", "0"),
        )
        .build()
        .unwrap();
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "scene"))
        .and(query_param("action", "create"))
        .and(query_param("json", request.to_json().unwrap().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    controller.full_refresh().await.unwrap();
    let scene = controller.create_scene(&request).await.unwrap().unwrap();
    assert_eq!(scene.id, 8);
    assert_eq!(controller.scenes_snapshot().len(), 2);

    let elsewhere = SceneBuilder::new("Nowhere").in_room(42).build().unwrap();
    assert!(matches!(
        controller.create_scene(&elsewhere).await,
        Err(CoreError::RoomNotFound { id: 42 })
    ));
}

#[tokio::test]
async fn test_create_room_returns_exact_name_match() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_sdata(
        &server,
        "0",
        json!({ "full": 1, "loadtime": 100, "dataversion": 5,
                "rooms": [{ "id": 1, "name": "kitchen", "section": 1 }] }),
    )
    .await;
    mount_sdata(
        &server,
        "100",
        json!({ "loadtime": 110, "dataversion": 6,
                "rooms": [{ "id": 2, "name": "Kitchen", "section": 1 }] }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "room"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    controller.full_refresh().await.unwrap();
    let room = controller.create_room("Kitchen").await.unwrap().unwrap();
    assert_eq!(room.id, 2);
}

#[tokio::test]
async fn test_room_action_rejection_is_surfaced() {
    let (server, controller) = setup().await;
    mount_alive(&server).await;
    mount_sdata(&server, "0", full_snapshot()).await;
    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "room"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ERROR: no such room"))
        .mount(&server)
        .await;

    controller.full_refresh().await.unwrap();
    assert!(matches!(
        controller.rename_room(1, "Lounge").await,
        Err(CoreError::Rejected { .. })
    ));
    assert_eq!(controller.store().room(1).unwrap().name, "Living");
}
