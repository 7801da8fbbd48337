use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{deserialize_some, RatioValue};

/// One labelled body measurement; `value` is null until entered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub label: String,
    pub value: Option<f64>,
}

/// Photo model
#[derive(Debug, Clone, FromRow)]
pub struct Photo {
    pub id: String,
    pub user_id: String,
    pub gallery_id: Option<String>,
    /// Storage key of the image
    pub filename: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub weight: Option<f64>,
    /// JSON-encoded `Vec<Measurement>`
    pub measurements: String,
    pub created_at: String,
}

impl Photo {
    pub fn measurement_list(&self) -> Vec<Measurement> {
        serde_json::from_str(&self.measurements).unwrap_or_else(|e| {
            tracing::warn!("Unreadable measurements on photo {}: {}", self.id, e);
            Vec::new()
        })
    }

    pub fn src(&self) -> String {
        format!("/api/uploads/{}", self.filename)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub id: String,
    pub gallery_id: Option<String>,
    pub src: String,
    pub date: String,
    pub weight: Option<f64>,
    pub measurements: Vec<Measurement>,
    pub ratios: Vec<RatioValue>,
}

/// Validated upload metadata
#[derive(Debug, Clone, Default)]
pub struct NewPhoto {
    pub gallery_id: Option<String>,
    pub date: Option<String>,
    pub weight: Option<f64>,
    pub measurements: Option<Vec<Measurement>>,
    pub original_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePhotoRequest {
    pub date: Option<String>,
    /// Absent keeps the weight; null clears it
    #[serde(default, deserialize_with = "deserialize_some")]
    pub weight: Option<Option<f64>>,
    pub measurements: Option<Vec<Measurement>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoQuery {
    pub gallery_id: Option<String>,
}
