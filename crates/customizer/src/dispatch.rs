use nalgebra::Point2;

use crate::messages::{DecalSummary, SessionToUi, UiToSession};
use crate::session::{CustomizerSession, LogoTicket, PlacementStatus, SessionError};

/// Dispatch a page message to the session and return the response.
///
/// Every error becomes a `SessionToUi::Error`; nothing is thrown across the
/// JS boundary.
pub fn dispatch(session: &mut CustomizerSession, msg: UiToSession) -> SessionToUi {
    match handle_message(session, msg) {
        Ok(response) => response,
        Err(e) => SessionToUi::Error {
            message: e.to_string(),
        },
    }
}

/// Parse a JSON message, dispatch it and serialize the response.
pub fn process_json(session: &mut CustomizerSession, json_input: &str) -> String {
    let response = match serde_json::from_str::<UiToSession>(json_input) {
        Ok(msg) => dispatch(session, msg),
        Err(e) => SessionToUi::Error {
            message: format!("Failed to parse message: {}", e),
        },
    };
    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(r#"{{"type":"Error","message":"Serialization failed: {}"}}"#, e)
    })
}

fn handle_message(
    session: &mut CustomizerSession,
    msg: UiToSession,
) -> Result<SessionToUi, SessionError> {
    match msg {
        // -- Model --
        UiToSession::LoadModel { asset } => {
            let status = session.load_model(&asset)?;
            model_ready_response(session, status)
        }

        UiToSession::ModelLoadFailed { reason } => {
            let status = session.load_placeholder(&reason)?;
            model_ready_response(session, status)
        }

        // -- Placement inputs --
        UiToSession::SetPlacement { intent } => Ok(placement_response(session.set_intent(intent)?)),

        UiToSession::SetSliders { x, y, size } => {
            Ok(placement_response(session.set_sliders(x, y, size)?))
        }

        UiToSession::SetSide { side } => Ok(placement_response(session.set_side(side)?)),

        UiToSession::SetGarmentStyle { style } => {
            let sleeves_visible = session.set_garment_style(style)?;
            Ok(SessionToUi::StyleChanged {
                style,
                sleeves_visible,
            })
        }

        // -- View --
        UiToSession::SetViewport { width, height } => Ok(SessionToUi::ViewChanged {
            aspect: session.set_viewport(width, height),
        }),

        UiToSession::ResetView => {
            session.reset_view();
            Ok(SessionToUi::ViewChanged {
                aspect: session.camera().aspect,
            })
        }

        // -- Logo upload --
        UiToSession::BeginLogoLoad => Ok(SessionToUi::LogoTicket {
            ticket: session.begin_logo_load().generation(),
        }),

        UiToSession::CompleteLogoLoad { ticket, data_url } => {
            let status = session.complete_logo_load_data_url(LogoTicket::new(ticket), &data_url)?;
            Ok(placement_response(status))
        }

        // -- Drag --
        UiToSession::ToggleDrag { enabled } => {
            session.toggle_drag(enabled);
            Ok(drag_response(session))
        }

        UiToSession::PointerDown { x, y } => {
            let placed = session.pointer_down(Point2::new(x, y))?;
            Ok(pointer_response(session, placed))
        }

        UiToSession::PointerMove { x, y } => {
            let placed = session.pointer_move(Point2::new(x, y))?;
            Ok(pointer_response(session, placed))
        }

        UiToSession::PointerUp => {
            session.pointer_up();
            Ok(drag_response(session))
        }

        UiToSession::PointerLeave => {
            session.pointer_leave();
            Ok(drag_response(session))
        }

        UiToSession::Reset => {
            session.reset()?;
            Ok(SessionToUi::ResetDone)
        }
    }
}

fn model_ready_response(
    session: &CustomizerSession,
    status: PlacementStatus,
) -> Result<SessionToUi, SessionError> {
    let root = session.model_root().ok_or(SessionError::NoModel)?;
    Ok(SessionToUi::ModelReady {
        root: session.scene().node(root)?.uuid,
        meshes: session.model_meshes().len(),
        placeholder: session.is_placeholder(),
        decal: status.decal().cloned(),
    })
}

fn placement_response(status: PlacementStatus) -> SessionToUi {
    match status {
        PlacementStatus::Placed(decal) => SessionToUi::DecalPlaced { decal },
        PlacementStatus::Skipped { reason } => SessionToUi::DecalSkipped { reason },
    }
}

fn drag_response(session: &CustomizerSession) -> SessionToUi {
    SessionToUi::DragChanged {
        enabled: session.drag().is_enabled(),
        dragging: session.drag().is_dragging(),
        orbit_enabled: session.orbit_enabled(),
    }
}

/// A pointer event that moved the logo reports the decal; otherwise the
/// drag state.
fn pointer_response(session: &CustomizerSession, placed: Option<DecalSummary>) -> SessionToUi {
    match placed {
        Some(decal) => SessionToUi::DecalPlaced { decal },
        None => drag_response(session),
    }
}
