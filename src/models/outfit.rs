use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One generation. Rows are append-only.
#[derive(Debug, Clone, Serialize)]
pub struct OutfitResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub result_image_url: String,
    pub input_user_photo_id: Option<Uuid>,
    pub input_clothing_ids: Option<Vec<Uuid>>,
    pub style: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOutfitResult {
    pub user_id: Uuid,
    pub result_image_url: String,
    pub input_user_photo_id: Option<Uuid>,
    pub input_clothing_ids: Option<Vec<Uuid>>,
    pub style: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateOutfitRequest {
    pub user_photo_id: Option<Uuid>,
    pub clothing_ids: Option<Vec<Uuid>>,
    pub style: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct GenerateOutfitResponse {
    pub id: Uuid,
    pub result_image_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<OutfitResult> for GenerateOutfitResponse {
    fn from(result: OutfitResult) -> Self {
        Self {
            id: result.id,
            result_image_url: result.result_image_url,
            created_at: result.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
}

impl HistoryQuery {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 100;

    /// Unparsable or non-positive limits fall back to the default.
    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|limit| *limit > 0)
            .map(|limit| limit.min(Self::MAX_LIMIT))
            .unwrap_or(Self::DEFAULT_LIMIT)
    }
}
