use serde::{Deserialize, Serialize};

/// Tuning for the fallback raycast tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Samples per axis in the grid-scan tier.
    pub grid_resolution: usize,
    /// Minimum height above the target point for the downward ray.
    pub downward_min_lift: f64,
    /// Fraction of the camera's height above the point used for the downward ray.
    pub downward_lift_factor: f64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 7,
            downward_min_lift: 1.0,
            downward_lift_factor: 0.9,
        }
    }
}

/// Sizes, offsets and material flags of the decal artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecalConfig {
    /// Logo size in the baked texture, as a fraction of the texture's short side
    /// per unit of `size_factor`.
    pub bake_scale: f64,
    /// Smallest logo edge, in pixels, written into a baked texture.
    pub min_logo_pixels: u32,
    /// Edge length of the white canvas used when the mesh has no map.
    pub blank_texture_size: u32,
    pub baked_alpha_test: f32,
    /// Overlay plane width per unit of `size_factor`.
    pub overlay_width: f64,
    pub overlay_offset: f64,
    pub overlay_render_order: i32,
    /// Decal projector footprint per unit of `size_factor`.
    pub projector_width: f64,
    pub projector_depth: f64,
    pub projector_polygon_offset: f32,
    /// Rectangle fallback width per unit of `size_factor`.
    pub rectangle_width: f64,
    pub rectangle_offset: f64,
    pub rectangle_render_order: i32,
    /// Lift off the surface for a rectangle placed by dragging.
    pub drag_offset: f64,
}

impl Default for DecalConfig {
    fn default() -> Self {
        Self {
            bake_scale: 0.6,
            min_logo_pixels: 4,
            blank_texture_size: 1024,
            baked_alpha_test: 0.01,
            overlay_width: 0.25,
            overlay_offset: 0.01,
            overlay_render_order: 99_999,
            projector_width: 0.4,
            projector_depth: 0.4,
            projector_polygon_offset: -4.0,
            rectangle_width: 0.5,
            rectangle_offset: 0.02,
            rectangle_render_order: 999,
            drag_offset: 0.01,
        }
    }
}

/// Top-level placement configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Fraction of the bounding-box height kept clear below the top edge.
    pub neckline_ratio: f64,
    /// Largest |center X| of a mesh still treated as part of the body.
    pub body_threshold: f64,
    pub cascade: CascadeConfig,
    pub decal: DecalConfig,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            neckline_ratio: 0.18,
            body_threshold: 0.2,
            cascade: CascadeConfig::default(),
            decal: DecalConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config: PlacementConfig =
            serde_json::from_str(r#"{"body_threshold":0.3,"cascade":{"grid_resolution":5}}"#)
                .unwrap();
        assert_eq!(config.body_threshold, 0.3);
        assert_eq!(config.neckline_ratio, 0.18);
        assert_eq!(config.cascade.grid_resolution, 5);
        assert_eq!(config.cascade.downward_lift_factor, 0.9);
        assert_eq!(config.decal, DecalConfig::default());
    }
}
