//! Integration tests for lotkeeperd
//!
//! These tests verify the end-to-end behavior of the service: config,
//! store, engine, command dispatch and the socket protocol together.

use chrono::Duration;
use lotkeeper_api::{
    CheckInRequest, ClientInfo, ClientRole, Command, ErrorCode, EventPayload, Response,
    ResponsePayload, ResponseResult, Tariff,
};
use lotkeeper_config::parse_config;
use lotkeeper_core::LotEngine;
use lotkeeper_ipc::{IpcClient, IpcError, IpcServer, ServerMessage};
use lotkeeper_store::{AuditEventType, DB_FILENAME, SqliteStore, Store};
use lotkeeperd::dispatch::{collect_events, handle_command};
use std::sync::Arc;
use tokio::sync::Mutex;

const TEST_CONFIG: &str = r#"
    config_version = 1

    [billing]
    tariff_per_minute = 50

    [lot]
    rows = ["A", "B"]
    slots_per_row = 2
"#;

fn make_test_engine() -> (LotEngine, Arc<dyn Store>) {
    let policy = parse_config(TEST_CONFIG).unwrap();
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = LotEngine::new(store.clone(), policy.tariff);
    engine
        .provision(&policy.layout.rows, policy.layout.slots_per_row)
        .unwrap();
    engine.drain_events();
    (engine, store)
}

fn attendant() -> ClientInfo {
    ClientInfo::new(ClientRole::Attendant)
}

fn check_in(plate: &str) -> Command {
    Command::CheckIn(CheckInRequest {
        plate: plate.into(),
        driver: "Ana Soto".into(),
        email: Some("ana@example.com".into()),
        entry_time: None,
    })
}

fn run(engine: &mut LotEngine, client: &ClientInfo, command: Command) -> Response {
    handle_command(engine, client, 1, command, lotkeeper_util::now())
}

fn error_code(response: &Response) -> Option<ErrorCode> {
    match &response.result {
        ResponseResult::Err(e) => Some(e.code),
        ResponseResult::Ok(_) => None,
    }
}

#[test]
fn test_config_layout_is_provisioned() {
    let (mut engine, _) = make_test_engine();

    let response = run(&mut engine, &attendant(), Command::ListSlots);
    match response.result {
        ResponseResult::Ok(ResponsePayload::Slots { slots }) => {
            let codes: Vec<String> = slots.iter().map(|s| s.code.to_string()).collect();
            assert_eq!(codes, vec!["A01", "A02", "B01", "B02"]);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_check_in_and_out() {
    let (mut engine, _) = make_test_engine();
    let client = attendant();
    let now = lotkeeper_util::now();

    let command = Command::CheckIn(CheckInRequest {
        plate: "AB123".into(),
        driver: "Ana Soto".into(),
        email: None,
        entry_time: Some(now - Duration::minutes(10)),
    });
    let response = handle_command(&mut engine, &client, 1, command, now);
    match response.result {
        ResponseResult::Ok(ResponsePayload::CheckedIn(session)) => {
            assert_eq!(session.slot.to_string(), "A01");
        }
        other => panic!("unexpected result {:?}", other),
    }

    let command = Command::CheckOut {
        plate: "AB123".into(),
    };
    let response = handle_command(&mut engine, &client, 2, command, now);
    assert_eq!(response.request_id, 2);
    match response.result {
        ResponseResult::Ok(ResponsePayload::CheckedOut(record)) => {
            assert_eq!(record.fee, 500);
            assert_eq!(record.duration_minutes, 10.0);
            assert_eq!(record.slot.to_string(), "A01");
        }
        other => panic!("unexpected result {:?}", other),
    }

    let response = run(&mut engine, &client, Command::RecentRecords { limit: 10 });
    match response.result {
        ResponseResult::Ok(ResponsePayload::Records { records }) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].plate.as_str(), "AB123");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_error_codes() {
    let (mut engine, _) = make_test_engine();
    let client = attendant();

    for plate in ["AAA111", "BBB222", "CCC333", "DDD444"] {
        let response = run(&mut engine, &client, check_in(plate));
        assert!(error_code(&response).is_none());
    }

    let response = run(&mut engine, &client, check_in("EEE555"));
    assert_eq!(error_code(&response), Some(ErrorCode::LotFull));

    let response = run(&mut engine, &client, Command::CheckOut { plate: "ZZZ999".into() });
    assert_eq!(error_code(&response), Some(ErrorCode::NotFound));

    run(&mut engine, &client, Command::CheckOut { plate: "AAA111".into() });
    let response = run(&mut engine, &client, check_in("BBB222"));
    assert_eq!(error_code(&response), Some(ErrorCode::DuplicatePlate));

    let now = lotkeeper_util::now();
    let command = Command::CheckIn(CheckInRequest {
        plate: "FFF666".into(),
        driver: "Luis".into(),
        email: None,
        entry_time: Some(now + Duration::hours(1)),
    });
    let response = handle_command(&mut engine, &client, 1, command, now);
    assert_eq!(error_code(&response), Some(ErrorCode::InvalidTimestamp));

    let response = run(&mut engine, &client, check_in("   "));
    assert_eq!(error_code(&response), Some(ErrorCode::InvalidRequest));
}

#[test]
fn test_lot_full_leaves_state_unchanged() {
    let (mut engine, _) = make_test_engine();
    let client = attendant();
    for plate in ["AAA111", "BBB222", "CCC333", "DDD444"] {
        run(&mut engine, &client, check_in(plate));
    }
    collect_events(&mut engine);
    let before = engine.get_state().unwrap();

    let response = run(&mut engine, &client, check_in("EEE555"));
    assert_eq!(error_code(&response), Some(ErrorCode::LotFull));

    let after = engine.get_state().unwrap();
    assert_eq!(after.summary, before.summary);
    assert_eq!(after.active_sessions, 4);
    assert!(collect_events(&mut engine).is_empty());
}

#[test]
fn test_roles() {
    let (mut engine, _) = make_test_engine();
    let provision = || Command::ProvisionSlots {
        rows: vec!["C".into()],
        per_row: 3,
    };

    let response = run(&mut engine, &attendant(), provision());
    assert_eq!(error_code(&response), Some(ErrorCode::PermissionDenied));

    let observer = ClientInfo::new(ClientRole::Observer);
    let response = run(&mut engine, &observer, check_in("AB123"));
    assert_eq!(error_code(&response), Some(ErrorCode::PermissionDenied));

    let admin = ClientInfo::new(ClientRole::Admin);
    let response = run(&mut engine, &admin, provision());
    match response.result {
        ResponseResult::Ok(ResponsePayload::Provisioned { added }) => {
            assert_eq!(added.len(), 3);
            assert_eq!(added[0].to_string(), "C01");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_provision_validates_layout() {
    let (mut engine, _) = make_test_engine();
    let admin = ClientInfo::new(ClientRole::Admin);

    let response = run(
        &mut engine,
        &admin,
        Command::ProvisionSlots {
            rows: vec!["c".into()],
            per_row: 2,
        },
    );
    assert_eq!(error_code(&response), Some(ErrorCode::InvalidRequest));

    let response = run(
        &mut engine,
        &admin,
        Command::ProvisionSlots {
            rows: vec!["C".into()],
            per_row: 0,
        },
    );
    assert_eq!(error_code(&response), Some(ErrorCode::InvalidRequest));
}

#[test]
fn test_remove_occupied_slot() {
    let (mut engine, _) = make_test_engine();
    let admin = ClientInfo::new(ClientRole::Admin);
    run(&mut engine, &admin, check_in("AB123"));

    let response = run(
        &mut engine,
        &admin,
        Command::RemoveSlot {
            code: "A01".parse().unwrap(),
        },
    );
    assert_eq!(error_code(&response), Some(ErrorCode::SlotOccupied));

    let response = run(
        &mut engine,
        &admin,
        Command::RemoveSlot {
            code: "B02".parse().unwrap(),
        },
    );
    assert!(error_code(&response).is_none());
    assert_eq!(engine.summary().unwrap().total, 3);
}

#[test]
fn test_events_follow_mutations() {
    let (mut engine, _) = make_test_engine();
    let client = attendant();

    run(&mut engine, &client, Command::GetSummary);
    assert!(collect_events(&mut engine).is_empty());

    run(&mut engine, &client, check_in("AB123"));
    let events = collect_events(&mut engine);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[0].payload,
        EventPayload::VehicleCheckedIn { ref plate, .. } if plate.as_str() == "AB123"
    ));
    match &events[1].payload {
        EventPayload::StateChanged(state) => assert_eq!(state.summary.occupied, 1),
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_audit_trail() {
    let (mut engine, store) = make_test_engine();
    let client = attendant();

    run(&mut engine, &client, check_in("AB123"));
    run(&mut engine, &client, Command::CheckOut { plate: "AB123".into() });

    let audits = store.get_recent_audits(10).unwrap();
    assert!(matches!(audits[0].event, AuditEventType::VehicleCheckedOut { .. }));
    assert!(matches!(audits[1].event, AuditEventType::VehicleCheckedIn { .. }));
}

#[test]
fn test_wire_format() {
    let (mut engine, _) = make_test_engine();
    let client = attendant();
    for plate in ["AAA111", "BBB222", "CCC333", "DDD444"] {
        run(&mut engine, &client, check_in(plate));
    }

    let request = r#"{"request_id":9,"api_version":1,"command":{"type":"check_in","plate":"EEE555","driver":"Luis"}}"#;
    let request: lotkeeper_api::Request = serde_json::from_str(request).unwrap();
    let response = run(&mut engine, &client, request.command);

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains(r#""code":"lot_full""#), "{}", json);
    assert!(json.contains("Parking lot is full"));
}

#[test]
fn test_sessions_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join(DB_FILENAME);
    let now = lotkeeper_util::now();

    {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut engine = LotEngine::new(store, Tariff::default());
        engine.provision(&["A".to_string()], 2).unwrap();
        let mut request = CheckInRequest {
            plate: "AB123".into(),
            driver: "Ana".into(),
            email: None,
            entry_time: Some(now - Duration::minutes(3)),
        };
        engine.check_in(request.clone(), now).unwrap();
        request.plate = "XY999".into();
        engine.check_in(request, now).unwrap();
    }

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
    let mut engine = LotEngine::new(store, Tariff::default());
    // Re-applying the layout must not disturb occupied slots
    assert!(engine.provision(&["A".to_string()], 2).unwrap().is_empty());

    let sessions = engine.active_sessions().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].slot.to_string(), "A01");

    let record = engine.check_out("AB123", now).unwrap();
    assert_eq!(record.fee, 150);
    assert_eq!(engine.summary().unwrap().free, 1);
}

#[tokio::test]
async fn test_socket_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("lotkeeperd.sock");

    let (engine, _) = make_test_engine();
    let engine = Arc::new(Mutex::new(engine));

    let mut server = IpcServer::new(&socket_path);
    server.start().await.unwrap();
    let server = Arc::new(server);
    let mut messages = server.take_message_receiver().await.unwrap();

    let accept = server.clone();
    tokio::spawn(async move {
        let _ = accept.run().await;
    });

    let ipc = server.clone();
    let engine_ref = engine.clone();
    tokio::spawn(async move {
        while let Some(msg) = messages.recv().await {
            let ServerMessage::Request { client_id, request } = msg else {
                continue;
            };
            let Some(client) = ipc.get_client_info(&client_id).await else {
                continue;
            };
            let (response, events) = {
                let mut eng = engine_ref.lock().await;
                let response = handle_command(
                    &mut eng,
                    &client,
                    request.request_id,
                    request.command,
                    lotkeeper_util::now(),
                );
                (response, collect_events(&mut eng))
            };
            let _ = ipc.send_response(&client_id, response).await;
            for event in events {
                ipc.broadcast_event(event);
            }
        }
    });

    let watcher = IpcClient::connect(&socket_path).await.unwrap();
    let mut events = watcher.subscribe().await.unwrap();

    let mut client = IpcClient::connect(&socket_path).await.unwrap();
    let session = client
        .check_in(CheckInRequest {
            plate: "AB123".into(),
            driver: "Ana Soto".into(),
            email: None,
            entry_time: None,
        })
        .await
        .unwrap();
    assert_eq!(session.slot.to_string(), "A01");

    let event = events.next().await.unwrap();
    assert!(matches!(event.payload, EventPayload::VehicleCheckedIn { .. }));
    let event = events.next().await.unwrap();
    assert!(matches!(event.payload, EventPayload::StateChanged(_)));

    assert_eq!(client.active_sessions().await.unwrap(), vec![session]);

    let record = client.check_out("AB123").await.unwrap();
    assert_eq!(record.slot.to_string(), "A01");
    assert_eq!(client.summary().await.unwrap().occupied, 0);

    match client.check_out("AB123").await {
        Err(IpcError::Rejected(info)) => assert_eq!(info.code, ErrorCode::NotFound),
        other => panic!("unexpected result {:?}", other),
    }

    let response = client.send(Command::GetHealth).await.unwrap();
    match response.result {
        ResponseResult::Ok(ResponsePayload::Health(health)) => assert!(health.store_ok),
        other => panic!("unexpected result {:?}", other),
    }
}
