use serde::{Deserialize, Serialize};

/// Where the shopper wants the logo, expressed in normalized bounding-box space.
///
/// Offsets are relative to the bounding-box center, so `(0, 0, 0)` is the middle
/// of the garment panel and `±0.5` reaches its edges. `size_factor` scales the
/// printed logo; it is expected in `(0, ~2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementIntent {
    pub offset_x: f64,
    pub offset_y: f64,
    pub offset_z: f64,
    pub size_factor: f64,
}

/// Slider ranges exposed by the storefront UI.
pub const SLIDER_X_RANGE: (f64, f64) = (0.25, 0.75);
pub const SLIDER_Y_RANGE: (f64, f64) = (0.2, 0.8);

/// Largest accepted `size_factor`.
pub const MAX_SIZE_FACTOR: f64 = 2.0;

impl Default for PlacementIntent {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            offset_z: 0.0,
            size_factor: 0.5,
        }
    }
}

impl PlacementIntent {
    pub fn new(offset_x: f64, offset_y: f64, offset_z: f64, size_factor: f64) -> Self {
        Self {
            offset_x,
            offset_y,
            offset_z,
            size_factor,
        }
    }

    /// Build an intent from raw slider values.
    ///
    /// Sliders report positions in `[0, 1]`; values are clamped to the ranges the
    /// storefront allows and re-centered around zero.
    pub fn from_sliders(x: f64, y: f64, size_factor: f64) -> Self {
        let x = x.clamp(SLIDER_X_RANGE.0, SLIDER_X_RANGE.1);
        let y = y.clamp(SLIDER_Y_RANGE.0, SLIDER_Y_RANGE.1);
        Self {
            offset_x: x - 0.5,
            offset_y: y - 0.5,
            offset_z: 0.0,
            size_factor,
        }
    }

    /// Finite offsets and `size_factor` in `(0, MAX_SIZE_FACTOR]`.
    pub fn is_valid(&self) -> bool {
        [self.offset_x, self.offset_y, self.offset_z]
            .iter()
            .all(|c| c.is_finite())
            && self.size_factor > 0.0
            && self.size_factor <= MAX_SIZE_FACTOR
    }

    /// Same intent with a different size.
    pub fn with_size(self, size_factor: f64) -> Self {
        Self {
            size_factor,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliders_are_clamped_and_centered() {
        let intent = PlacementIntent::from_sliders(0.9, 0.0, 1.0);
        assert!((intent.offset_x - 0.25).abs() < 1e-12);
        assert!((intent.offset_y - (-0.3)).abs() < 1e-12);
        assert_eq!(intent.offset_z, 0.0);
    }

    #[test]
    fn size_must_be_positive_and_bounded() {
        assert!(PlacementIntent::default().is_valid());
        assert!(PlacementIntent::default().with_size(MAX_SIZE_FACTOR).is_valid());
        for size in [0.0, -0.5, 2.5, f64::NAN, f64::INFINITY] {
            assert!(!PlacementIntent::default().with_size(size).is_valid(), "{size}");
        }
        assert!(!PlacementIntent::new(f64::NAN, 0.0, 0.0, 0.5).is_valid());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let intent: PlacementIntent = serde_json::from_str(r#"{"offset_x":0.1}"#).unwrap();
        assert!((intent.offset_x - 0.1).abs() < 1e-12);
        assert!((intent.size_factor - 0.5).abs() < 1e-12);
    }
}
