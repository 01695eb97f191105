use serde::{Deserialize, Serialize};

use crate::types::TextureId;

/// Shading model of a material, mirroring the families browser renderers ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Standard,
    Physical,
    Phong,
    Lambert,
    /// Unlit; used for overlays and decals.
    Basic,
    /// Shader or toon materials with no diffuse map slot we can write to.
    Other,
}

impl MaterialKind {
    /// Whether the material exposes a diffuse/albedo map slot we can bake into.
    pub fn is_paintable(self) -> bool {
        matches!(
            self,
            MaterialKind::Standard
                | MaterialKind::Physical
                | MaterialKind::Phong
                | MaterialKind::Lambert
        )
    }
}

/// Which triangle faces are rendered (and therefore hit by raycasts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSide {
    #[default]
    Front,
    Back,
    Double,
}

/// Surface material. Maps are referenced by texture id; the texture itself
/// lives in the scene's texture arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    /// Linear RGBA base color.
    pub color: [f32; 4],
    pub map: Option<TextureId>,
    pub side: FaceSide,
    pub transparent: bool,
    pub alpha_test: f32,
    pub depth_test: bool,
    pub depth_write: bool,
    /// Polygon offset factor; negative values pull the surface toward the viewer.
    pub polygon_offset: Option<f32>,
}

impl Material {
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            color: [1.0, 1.0, 1.0, 1.0],
            map: None,
            side: FaceSide::Front,
            transparent: false,
            alpha_test: 0.0,
            depth_test: true,
            depth_write: true,
            polygon_offset: None,
        }
    }

    pub fn standard() -> Self {
        Self::new(MaterialKind::Standard)
    }

    pub fn basic() -> Self {
        Self::new(MaterialKind::Basic)
    }

    pub fn with_map(mut self, map: TextureId) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_side(mut self, side: FaceSide) -> Self {
        self.side = side;
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }
}
