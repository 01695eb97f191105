use serde::{Deserialize, Serialize};

/// Which face of the garment a logo is printed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementSide {
    /// Closest to the viewer under the model's default orientation.
    #[default]
    Front,
    /// Farthest from the viewer.
    Back,
    /// No preference: the largest panel wins.
    Any,
}

/// Geometric role of a garment mesh, derived from its position in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshRole {
    Body,
    Sleeve,
}

/// Garment cut selected in the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GarmentStyle {
    #[default]
    #[serde(rename = "tshirt")]
    TShirt,
    Sleeveless,
}

impl GarmentStyle {
    pub fn shows_sleeves(self) -> bool {
        matches!(self, GarmentStyle::TShirt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlacementSide::Back).unwrap(), "\"back\"");
        let side: PlacementSide = serde_json::from_str("\"any\"").unwrap();
        assert_eq!(side, PlacementSide::Any);
    }

    #[test]
    fn style_tags_match_storefront_values() {
        assert_eq!(serde_json::to_string(&GarmentStyle::TShirt).unwrap(), "\"tshirt\"");
        assert_eq!(
            serde_json::to_string(&GarmentStyle::Sleeveless).unwrap(),
            "\"sleeveless\""
        );
        assert!(!GarmentStyle::Sleeveless.shows_sleeves());
    }
}
