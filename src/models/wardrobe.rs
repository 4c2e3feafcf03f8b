use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct WardrobeItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub image_url: String,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub season: Option<String>,
    pub style: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateWardrobeItemRequest {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub season: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewWardrobeItem {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub image_url: String,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub season: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateWardrobeItemRequest {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub season: Option<String>,
    pub style: Option<String>,
}

/// Column updates for a wardrobe item. `None` leaves a column untouched,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct WardrobeItemChanges {
    pub name: Option<Option<String>>,
    pub image_url: Option<String>,
    pub category: Option<Option<String>>,
    pub tags: Option<Option<Vec<String>>>,
    pub season: Option<Option<String>>,
    pub style: Option<Option<String>>,
}

impl WardrobeItemChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.image_url.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.season.is_none()
            && self.style.is_none()
    }
}

impl From<UpdateWardrobeItemRequest> for WardrobeItemChanges {
    fn from(request: UpdateWardrobeItemRequest) -> Self {
        Self {
            name: request.name.map(non_empty),
            image_url: request.image_url,
            category: request.category.map(non_empty),
            tags: request.tags.map(Some),
            season: request.season.map(non_empty),
            style: request.style.map(non_empty),
        }
    }
}

/// Blank strings are stored as NULL.
pub fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_clear_from_untouched() {
        let changes = WardrobeItemChanges::from(UpdateWardrobeItemRequest {
            name: Some(String::new()),
            category: Some("tops".to_string()),
            ..Default::default()
        });

        assert_eq!(changes.name, Some(None));
        assert_eq!(changes.category, Some(Some("tops".to_string())));
        assert_eq!(changes.season, None);
        assert_eq!(changes.tags, None);
        assert!(!changes.is_empty());
        assert!(WardrobeItemChanges::default().is_empty());
    }
}
