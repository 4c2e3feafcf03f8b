use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "photo_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PhotoType {
    Avatar,
    #[default]
    Body,
}

/// Deleting a photo only clears `is_active`; past outfit results keep pointing at the row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserPhoto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo_url: String,
    pub photo_type: PhotoType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePhotoRequest {
    pub photo_url: Option<String>,
    pub photo_type: Option<PhotoType>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoQuery {
    #[serde(rename = "type")]
    pub photo_type: Option<PhotoType>,
}
