use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

impl UnitSystem {
    pub fn weight_unit(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "lbs",
            UnitSystem::Metric => "kg",
        }
    }

    pub fn measurement_unit(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "in",
            UnitSystem::Metric => "cm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Chronological,
    ReverseChronological,
}

/// A named quotient of two measurement labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioDefinition {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
}

/// Computed ratio for one photo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioValue {
    pub name: String,
    pub value: f64,
    /// Value with three decimals and no trailing zeros
    pub display: String,
}

pub const DEFAULT_MEASUREMENTS: [&str; 3] = ["Waist", "Chest", "Arms"];

fn default_measurements() -> Vec<String> {
    DEFAULT_MEASUREMENTS.iter().map(|s| s.to_string()).collect()
}

/// Per-user display settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default)]
    pub unit_system: UnitSystem,
    #[serde(default = "default_measurements")]
    pub measurements: Vec<String>,
    #[serde(default)]
    pub ratios: Vec<RatioDefinition>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            unit_system: UnitSystem::default(),
            measurements: default_measurements(),
            ratios: Vec::new(),
            sort_order: SortOrder::default(),
        }
    }
}

/// Gallery override; a missing field inherits the global value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_system: Option<UnitSystem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratios: Option<Vec<RatioDefinition>>,
}

/// Global config with a gallery override applied
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    pub unit_system: UnitSystem,
    pub measurements: Vec<String>,
    pub ratios: Vec<RatioDefinition>,
    pub sort_order: SortOrder,
    pub is_inherited: bool,
    pub weight_unit: &'static str,
    pub measurement_unit: &'static str,
}

/// Gallery model
#[derive(Debug, Clone, FromRow)]
pub struct Gallery {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// JSON-encoded `GalleryConfig`
    pub config: Option<String>,
    pub created_at: String,
}

impl Gallery {
    pub fn override_config(&self) -> Option<GalleryConfig> {
        let raw = self.config.as_deref()?;
        match serde_json::from_str(raw) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Ignoring unreadable config for gallery {}: {}", self.id, e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryResponse {
    pub id: String,
    pub name: String,
    pub config: Option<GalleryConfig>,
    pub created_at: String,
}

impl From<Gallery> for GalleryResponse {
    fn from(gallery: Gallery) -> Self {
        Self {
            config: gallery.override_config(),
            id: gallery.id,
            name: gallery.name,
            created_at: gallery.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateGalleryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGalleryRequest {
    pub name: Option<String>,
    pub config: Option<GalleryConfig>,
}
