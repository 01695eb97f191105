//! Tests for the SessionDriver workflow API.

use customizer::{SessionToUi, UiToSession};
use test_harness::helpers::*;
use test_harness::SessionDriver;

#[test]
fn history_records_request_and_response_types() {
    let mut d = SessionDriver::new();
    d.load_tshirt().unwrap();
    d.upload_logo().unwrap();
    let names: Vec<(&str, &str)> = d
        .history()
        .iter()
        .map(|(req, resp)| (req.as_str(), resp.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("LoadModel", "ModelReady"),
            ("BeginLogoLoad", "LogoTicket"),
            ("CompleteLogoLoad", "DecalPlaced"),
        ]
    );
}

#[test]
fn meshes_are_found_by_name() {
    let mut d = SessionDriver::new();
    d.load_tshirt().unwrap();
    let front = d.mesh_named("front").unwrap();
    assert_eq!(d.target().unwrap(), front);
    assert!(d.mesh_named("collar").is_err());
}

#[test]
fn error_responses_become_dispatch_errors() {
    let mut d = SessionDriver::new();
    let err = d.finish_upload(42, logo_data_url().unwrap()).unwrap_err();
    assert!(matches!(err, HarnessError::DispatchError { .. }));
    assert_eq!(d.history().last().unwrap().1, "Error");
}

#[test]
fn json_path_matches_typed_path() {
    let mut d = SessionDriver::new();
    let asset = serde_json::to_string(&tshirt()).unwrap();
    let reply = d
        .send_json(&format!(r#"{{"type":"LoadModel","asset":{asset}}}"#))
        .unwrap();
    let SessionToUi::ModelReady { root, meshes, .. } = reply else {
        panic!("expected ModelReady, got {reply:?}");
    };
    assert_eq!(meshes, 4);
    assert_eq!(d.node_by_uuid(root).unwrap(), d.session.model_root().unwrap());
}

#[test]
fn drag_gesture_leaves_drag_mode_on() {
    let mut d = SessionDriver::new();
    d.load_tshirt().unwrap();
    d.upload_logo().unwrap();
    d.drag([0.05, 0.05], &[]).unwrap();
    let reply = d.send(UiToSession::PointerLeave).unwrap();
    assert!(matches!(
        reply,
        SessionToUi::DragChanged {
            enabled: true,
            dragging: false,
            orbit_enabled: false
        }
    ));
}
