use garment_types::{GarmentStyle, PlacementIntent, PlacementSide};
use placement::{AttachedShape, CascadeTier, DecalResult, SurfaceHit};
use scene_kernel::{Scene, SceneError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ModelAsset;

/// Messages from the storefront page to the session.
/// Serialized as JSON, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiToSession {
    // -- Model --
    /// A garment finished loading in the page.
    LoadModel {
        asset: ModelAsset,
    },
    /// The page could not load the garment; show the placeholder.
    ModelLoadFailed {
        reason: String,
    },

    // -- Placement inputs --
    SetPlacement {
        intent: PlacementIntent,
    },
    /// Raw slider positions in `[0, 1]` plus the size factor.
    SetSliders {
        x: f64,
        y: f64,
        size: f64,
    },
    SetSide {
        side: PlacementSide,
    },
    SetGarmentStyle {
        style: GarmentStyle,
    },

    // -- View --
    SetViewport {
        width: u32,
        height: u32,
    },
    ResetView,

    // -- Logo upload --
    /// An upload started; answered with a ticket.
    BeginLogoLoad,
    CompleteLogoLoad {
        ticket: u64,
        data_url: String,
    },

    // -- Drag --
    ToggleDrag {
        enabled: bool,
    },
    /// Pointer positions are normalized device coordinates, `[-1, 1]`, +Y up.
    PointerDown {
        x: f64,
        y: f64,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp,
    PointerLeave,

    Reset,
}

/// Messages from the session back to the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionToUi {
    /// A garment (or the placeholder) is in the scene.
    ModelReady {
        root: Uuid,
        meshes: usize,
        placeholder: bool,
        decal: Option<DecalSummary>,
    },

    DecalPlaced {
        decal: DecalSummary,
    },

    /// Nothing was placed: no model, no logo or no target mesh.
    DecalSkipped {
        reason: String,
    },

    LogoTicket {
        ticket: u64,
    },

    DragChanged {
        enabled: bool,
        dragging: bool,
        orbit_enabled: bool,
    },

    ViewChanged {
        aspect: f64,
    },

    StyleChanged {
        style: GarmentStyle,
        sleeves_visible: bool,
    },

    ResetDone,

    Error {
        message: String,
    },
}

/// What the page needs to know about a placed decal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecalSummary {
    Baked {
        mesh: Uuid,
        overlay: Option<Uuid>,
        tier: CascadeTier,
        point: [f64; 3],
        normal: [f64; 3],
    },
    PlaneAttached {
        node: Uuid,
        shape: AttachedShape,
        tier: CascadeTier,
        point: [f64; 3],
        normal: [f64; 3],
    },
    Failed {
        reason: String,
        tier: CascadeTier,
    },
}

impl DecalSummary {
    pub fn describe(scene: &Scene, hit: &SurfaceHit, result: &DecalResult) -> Result<Self, SceneError> {
        let point = hit.point.coords.into();
        let normal = hit.normal.into_inner().into();
        Ok(match result {
            DecalResult::Baked { mesh, overlay, .. } => DecalSummary::Baked {
                mesh: scene.node(*mesh)?.uuid,
                overlay: overlay.map(|n| scene.node(n).map(|node| node.uuid)).transpose()?,
                tier: hit.tier,
                point,
                normal,
            },
            DecalResult::PlaneAttached { node, shape, .. } => DecalSummary::PlaneAttached {
                node: scene.node(*node)?.uuid,
                shape: *shape,
                tier: hit.tier,
                point,
                normal,
            },
            DecalResult::Failed { reason } => DecalSummary::Failed {
                reason: reason.clone(),
                tier: hit.tier,
            },
        })
    }

    pub fn tier(&self) -> CascadeTier {
        match self {
            DecalSummary::Baked { tier, .. }
            | DecalSummary::PlaneAttached { tier, .. }
            | DecalSummary::Failed { tier, .. } => *tier,
        }
    }
}
