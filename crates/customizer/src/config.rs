use garment_types::{GarmentStyle, PlacementIntent, PlacementSide};
use placement::PlacementConfig;
use scene_kernel::PerspectiveCamera;
use serde::{Deserialize, Serialize};

/// Session configuration. Every field has a storefront default, so a partial
/// JSON object passed at start-up only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub placement: PlacementConfig,
    pub camera: PerspectiveCamera,
    /// World position of the loaded garment's root.
    pub model_position: [f64; 3],
    pub intent: PlacementIntent,
    pub side: PlacementSide,
    pub style: GarmentStyle,
    /// Drop logo decodes that finish after a newer upload was started.
    pub discard_stale_loads: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::default(),
            camera: PerspectiveCamera::default(),
            model_position: [0.0, -1.4, 0.5],
            intent: PlacementIntent::default(),
            side: PlacementSide::default(),
            style: GarmentStyle::default(),
            discard_stale_loads: true,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON override; an empty string yields the defaults. The
    /// starting intent must be valid.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(json)?;
        if !config.intent.is_valid() {
            return Err(serde::de::Error::custom(format!(
                "invalid starting intent {:?}",
                config.intent
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(SessionConfig::from_json("  ").unwrap(), SessionConfig::default());
        assert_eq!(SessionConfig::from_json("{}").unwrap(), SessionConfig::default());
    }

    #[test]
    fn nested_override() {
        let config =
            SessionConfig::from_json(r#"{"discard_stale_loads":false,"placement":{"neckline_ratio":0.1}}"#)
                .unwrap();
        assert!(!config.discard_stale_loads);
        assert_eq!(config.placement.neckline_ratio, 0.1);
        assert_eq!(config.placement.body_threshold, 0.2);
    }

    #[test]
    fn zero_size_starting_intent_is_rejected() {
        assert!(SessionConfig::from_json(r#"{"intent":{"size_factor":0.0}}"#).is_err());
    }
}
