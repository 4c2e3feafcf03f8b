use serde::{Deserialize, Serialize};

/// Storage subdirectory an upload lands in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadType {
    #[default]
    Wardrobe,
    Avatar,
    UserPhoto,
    OutfitResult,
}

impl UploadType {
    pub const ALL: [UploadType; 4] = [
        UploadType::Wardrobe,
        UploadType::Avatar,
        UploadType::UserPhoto,
        UploadType::OutfitResult,
    ];

    /// Accepts both the singular form the frontend sends and the directory name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "wardrobe" => Some(UploadType::Wardrobe),
            "avatar" | "avatars" => Some(UploadType::Avatar),
            "user-photo" | "user-photos" => Some(UploadType::UserPhoto),
            "outfit-result" | "outfit-results" => Some(UploadType::OutfitResult),
            _ => None,
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            UploadType::Wardrobe => "wardrobe",
            UploadType::Avatar => "avatars",
            UploadType::UserPhoto => "user-photos",
            UploadType::OutfitResult => "outfit-results",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "type")]
    pub upload_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
    pub original_name: String,
    pub size: usize,
    pub mimetype: String,
}

#[derive(Debug, Serialize)]
pub struct RejectedFile {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MultiUploadResponse {
    pub files: Vec<UploadedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<RejectedFile>>,
}
