//! WASM entry points for the storefront page.
//!
//! Only compiled for the `wasm32` target.

use wasm_bindgen::prelude::*;

use crate::config::SessionConfig;
use crate::dispatch;
use crate::messages::SessionToUi;
use crate::session::{CustomizerSession, LogoTicket, PlacementStatus};

// Single-threaded in the browser.
thread_local! {
    static SESSION: std::cell::RefCell<Option<CustomizerSession>> = std::cell::RefCell::new(None);
}

fn not_initialized() -> String {
    error_json("Session not initialized. Call init() first.")
}

fn error_json(message: &str) -> String {
    serde_json::to_string(&SessionToUi::Error {
        message: message.to_string(),
    })
    .unwrap_or_else(|_| r#"{"type":"Error","message":"Serialization failed"}"#.to_string())
}

fn to_json(response: &SessionToUi) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| error_json(&format!("Serialization failed: {e}")))
}

/// Create the session. `config_json` may be empty or a partial
/// `SessionConfig` object. Returns an `Error` message for bad config and
/// `ResetDone` otherwise.
#[wasm_bindgen]
pub fn init(config_json: &str) -> String {
    console_error_panic_hook::set_once();

    let config = match SessionConfig::from_json(config_json) {
        Ok(config) => config,
        Err(e) => return error_json(&format!("Invalid config: {e}")),
    };
    SESSION.with(|cell| {
        *cell.borrow_mut() = Some(CustomizerSession::new(config));
    });
    to_json(&SessionToUi::ResetDone)
}

/// Process a JSON `UiToSession` message and return a JSON `SessionToUi`.
#[wasm_bindgen]
pub fn process_message(json_input: &str) -> String {
    SESSION.with(|cell| match cell.borrow_mut().as_mut() {
        Some(session) => dispatch::process_json(session, json_input),
        None => not_initialized(),
    })
}

/// Start a logo upload and return its ticket (0 before `init`).
#[wasm_bindgen]
pub fn begin_logo_load() -> u64 {
    SESSION.with(|cell| {
        cell.borrow_mut()
            .as_mut()
            .map_or(0, |session| session.begin_logo_load().generation())
    })
}

/// Finish an upload with raw image bytes, skipping the data-URL round trip.
#[wasm_bindgen]
pub fn complete_logo_load(ticket: u64, bytes: &[u8]) -> String {
    SESSION.with(|cell| {
        let mut session = cell.borrow_mut();
        let Some(session) = session.as_mut() else {
            return not_initialized();
        };
        let response = match session.complete_logo_load(LogoTicket::new(ticket), bytes) {
            Ok(PlacementStatus::Placed(decal)) => SessionToUi::DecalPlaced { decal },
            Ok(PlacementStatus::Skipped { reason }) => SessionToUi::DecalSkipped { reason },
            Err(e) => SessionToUi::Error {
                message: e.to_string(),
            },
        };
        to_json(&response)
    })
}

/// World-space vertex positions of the visible decal as a Float32Array
/// view into WASM memory: `[x0, y0, z0, x1, ...]`.
///
/// IMPORTANT: the view is invalidated by any WASM memory growth. Copy it
/// before calling back into the module.
#[wasm_bindgen]
pub fn get_decal_vertices() -> js_sys::Float32Array {
    SESSION.with(|cell| {
        let session = cell.borrow();
        match session.as_ref() {
            Some(session) => unsafe { js_sys::Float32Array::view(session.decal_vertices()) },
            None => js_sys::Float32Array::new_with_length(0),
        }
    })
}

/// PNG bytes of the baked garment texture; empty when nothing is baked.
#[wasm_bindgen]
pub fn get_baked_texture_png() -> Vec<u8> {
    SESSION.with(|cell| {
        cell.borrow()
            .as_ref()
            .and_then(|session| session.baked_texture_png().ok().flatten())
            .unwrap_or_default()
    })
}
