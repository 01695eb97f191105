use nalgebra::{Point2, Point3, Unit, Vector3};
use scene_kernel::{NodeId, SceneError};
use serde::{Deserialize, Serialize};

/// Which cascade tier produced a surface hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeTier {
    DirectProjection,
    CameraToPoint,
    Downward,
    GridScan,
    VertexSnap,
    /// Bounding-box center; used when every other tier misses.
    Floor,
}

/// Resolved surface point and orientation, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
    /// Texture coordinate at the hit; only the direct-projection tier reports one.
    pub uv: Option<Point2<f64>>,
    pub tier: CascadeTier,
}

/// What triggered a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementOrigin {
    /// Slider, size, side, logo or model change.
    #[default]
    Recompute,
    /// Pointer drag across the garment.
    Drag,
}

/// Errors from placement operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlacementError {
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("logo image is empty ({width}x{height})")]
    EmptyLogo { width: u32, height: u32 },

    #[error("logo decode failed: {reason}")]
    LogoDecode { reason: String },

    #[error("logo size factor {size_factor} must be positive and finite")]
    InvalidSize { size_factor: f64 },

    #[error("mesh {mesh:?} already has a material snapshot")]
    AlreadySnapshotted { mesh: NodeId },

    #[error("mesh {mesh:?} has no material snapshot")]
    NoSnapshot { mesh: NodeId },
}
