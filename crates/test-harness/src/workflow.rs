//! SessionDriver: fluent API for scripting storefront interactions in tests.
//!
//! Every step goes through `customizer::dispatch()` so the real message path
//! is exercised, not a shortcut into the session.

use customizer::{
    dispatch, CustomizerSession, DecalSummary, ModelAsset, SessionConfig, SessionToUi,
    UiToSession,
};
use garment_types::{GarmentStyle, PlacementIntent, PlacementSide};
use placement::DecalResult;
use scene_kernel::{NodeId, ResourceCounts};
use uuid::Uuid;

use crate::helpers::*;

/// A fluent driver for a customizer session.
pub struct SessionDriver {
    pub session: CustomizerSession,
    history: Vec<(String, String)>,
}

impl SessionDriver {
    /// Session with the storefront defaults, except that the garment sits at
    /// the world origin in front of the camera.
    pub fn new() -> Self {
        Self::with_config(SessionConfig {
            model_position: [0.0, 0.0, 0.0],
            ..SessionConfig::default()
        })
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            session: CustomizerSession::new(config),
            history: Vec::new(),
        }
    }

    // ── Raw messages ────────────────────────────────────────────────────

    /// Dispatch a message and record it. `Error` responses become
    /// `HarnessError::DispatchError`.
    pub fn send(&mut self, msg: UiToSession) -> Result<SessionToUi, HarnessError> {
        let request = message_name(&msg);
        let response = dispatch(&mut self.session, msg);
        self.history
            .push((request.to_string(), response_name(&response).to_string()));
        match response {
            SessionToUi::Error { message } => Err(HarnessError::DispatchError { message }),
            other => Ok(other),
        }
    }

    /// Same as [`send`](Self::send) but round-trips the message through JSON.
    pub fn send_json(&mut self, json: &str) -> Result<SessionToUi, HarnessError> {
        let reply = customizer::process_json(&mut self.session, json);
        let response: SessionToUi =
            serde_json::from_str(&reply).map_err(|e| HarnessError::DispatchError {
                message: format!("bad reply {reply}: {e}"),
            })?;
        self.history
            .push(("json".to_string(), response_name(&response).to_string()));
        match response {
            SessionToUi::Error { message } => Err(HarnessError::DispatchError { message }),
            other => Ok(other),
        }
    }

    // ── Storefront steps ────────────────────────────────────────────────

    /// Load a garment. Returns the decal placed right away, if any.
    pub fn load(&mut self, asset: ModelAsset) -> Result<Option<DecalSummary>, HarnessError> {
        match self.send(UiToSession::LoadModel { asset })? {
            SessionToUi::ModelReady { decal, .. } => Ok(decal),
            other => Err(unexpected("LoadModel", &other)),
        }
    }

    pub fn load_tshirt(&mut self) -> Result<Option<DecalSummary>, HarnessError> {
        self.load(tshirt())
    }

    /// Upload the default test logo. Returns the resulting placement response.
    pub fn upload_logo(&mut self) -> Result<SessionToUi, HarnessError> {
        let ticket = self.begin_upload()?;
        self.finish_upload(ticket, logo_data_url()?)
    }

    pub fn begin_upload(&mut self) -> Result<u64, HarnessError> {
        match self.send(UiToSession::BeginLogoLoad)? {
            SessionToUi::LogoTicket { ticket } => Ok(ticket),
            other => Err(unexpected("BeginLogoLoad", &other)),
        }
    }

    pub fn finish_upload(&mut self, ticket: u64, data_url: String) -> Result<SessionToUi, HarnessError> {
        self.send(UiToSession::CompleteLogoLoad { ticket, data_url })
    }

    pub fn sliders(&mut self, x: f64, y: f64, size: f64) -> Result<SessionToUi, HarnessError> {
        self.send(UiToSession::SetSliders { x, y, size })
    }

    pub fn intent(&mut self, intent: PlacementIntent) -> Result<SessionToUi, HarnessError> {
        self.send(UiToSession::SetPlacement { intent })
    }

    pub fn side(&mut self, side: PlacementSide) -> Result<SessionToUi, HarnessError> {
        self.send(UiToSession::SetSide { side })
    }

    pub fn style(&mut self, style: GarmentStyle) -> Result<SessionToUi, HarnessError> {
        self.send(UiToSession::SetGarmentStyle { style })
    }

    /// Drag gesture: enable drag mode, press at `from`, move through `path`,
    /// release. Drag mode stays on afterwards.
    pub fn drag(&mut self, from: [f64; 2], path: &[[f64; 2]]) -> Result<&mut Self, HarnessError> {
        self.send(UiToSession::ToggleDrag { enabled: true })?;
        self.send(UiToSession::PointerDown {
            x: from[0],
            y: from[1],
        })?;
        for &[x, y] in path {
            self.send(UiToSession::PointerMove { x, y })?;
        }
        self.send(UiToSession::PointerUp)?;
        Ok(self)
    }

    pub fn reset(&mut self) -> Result<&mut Self, HarnessError> {
        match self.send(UiToSession::Reset)? {
            SessionToUi::ResetDone => Ok(self),
            other => Err(unexpected("Reset", &other)),
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn counts(&self) -> ResourceCounts {
        self.session.scene().resource_counts()
    }

    /// Mesh the logo currently targets.
    pub fn target(&self) -> Result<NodeId, HarnessError> {
        self.session
            .current_target()?
            .ok_or_else(|| HarnessError::AssertionFailed {
                detail: "no target mesh".to_string(),
            })
    }

    /// Mesh node with the given name under the model root.
    pub fn mesh_named(&self, name: &str) -> Result<NodeId, HarnessError> {
        let scene = self.session.scene();
        self.session
            .model_meshes()
            .iter()
            .copied()
            .find(|&id| scene.node(id).is_ok_and(|n| n.name == name))
            .ok_or_else(|| HarnessError::AssertionFailed {
                detail: format!("no mesh named '{name}'"),
            })
    }

    pub fn node_by_uuid(&self, uuid: Uuid) -> Result<NodeId, HarnessError> {
        self.session
            .scene()
            .find_by_uuid(uuid)
            .ok_or_else(|| HarnessError::AssertionFailed {
                detail: format!("no node with uuid {uuid}"),
            })
    }

    pub fn decal(&self) -> Option<&DecalResult> {
        self.session.decal()
    }

    /// `(request, response)` type names of every message sent so far.
    pub fn history(&self) -> &[(String, String)] {
        &self.history
    }
}

impl Default for SessionDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn unexpected(request: &str, response: &SessionToUi) -> HarnessError {
    HarnessError::UnexpectedResponse {
        request: request.to_string(),
        response: format!("{response:?}"),
    }
}

fn message_name(msg: &UiToSession) -> &'static str {
    match msg {
        UiToSession::LoadModel { .. } => "LoadModel",
        UiToSession::ModelLoadFailed { .. } => "ModelLoadFailed",
        UiToSession::SetPlacement { .. } => "SetPlacement",
        UiToSession::SetSliders { .. } => "SetSliders",
        UiToSession::SetSide { .. } => "SetSide",
        UiToSession::SetGarmentStyle { .. } => "SetGarmentStyle",
        UiToSession::SetViewport { .. } => "SetViewport",
        UiToSession::ResetView => "ResetView",
        UiToSession::BeginLogoLoad => "BeginLogoLoad",
        UiToSession::CompleteLogoLoad { .. } => "CompleteLogoLoad",
        UiToSession::ToggleDrag { .. } => "ToggleDrag",
        UiToSession::PointerDown { .. } => "PointerDown",
        UiToSession::PointerMove { .. } => "PointerMove",
        UiToSession::PointerUp => "PointerUp",
        UiToSession::PointerLeave => "PointerLeave",
        UiToSession::Reset => "Reset",
    }
}

fn response_name(response: &SessionToUi) -> &'static str {
    match response {
        SessionToUi::ModelReady { .. } => "ModelReady",
        SessionToUi::DecalPlaced { .. } => "DecalPlaced",
        SessionToUi::DecalSkipped { .. } => "DecalSkipped",
        SessionToUi::LogoTicket { .. } => "LogoTicket",
        SessionToUi::DragChanged { .. } => "DragChanged",
        SessionToUi::ViewChanged { .. } => "ViewChanged",
        SessionToUi::StyleChanged { .. } => "StyleChanged",
        SessionToUi::ResetDone => "ResetDone",
        SessionToUi::Error { .. } => "Error",
    }
}
