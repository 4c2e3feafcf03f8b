use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::Repository;
use crate::errors::{AppError, Result};
use crate::models::*;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    photos: Vec<UserPhoto>,
    wardrobe: Vec<WardrobeItem>,
    outfits: Vec<OutfitResult>,
    usage: HashMap<(Uuid, ApiType, NaiveDate), i64>,
}

/// In-process store selected with `DATABASE_URL=memory://`. Also backs the test suites.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tiers have no HTTP surface; tests and seeding use this directly.
    pub async fn set_tier(&self, user_id: Uuid, tier: UserTier) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or(AppError::UserNotFound)?;
        user.tier = tier;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryDatabase {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        nickname: Option<&str>,
    ) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|user| user.email == email) {
            return Err(AppError::EmailExists);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            nickname: nickname.map(str::to_string),
            avatar: None,
            tier: UserTier::Free,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn create_photo(
        &self,
        user_id: Uuid,
        photo_url: &str,
        photo_type: PhotoType,
    ) -> Result<UserPhoto> {
        let photo = UserPhoto {
            id: Uuid::new_v4(),
            user_id,
            photo_url: photo_url.to_string(),
            photo_type,
            is_active: true,
            created_at: Utc::now(),
        };
        self.tables.lock().await.photos.push(photo.clone());
        Ok(photo)
    }

    async fn find_photo_by_id(&self, id: Uuid) -> Result<Option<UserPhoto>> {
        let tables = self.tables.lock().await;
        Ok(tables.photos.iter().find(|photo| photo.id == id).cloned())
    }

    async fn list_active_photos(
        &self,
        user_id: Uuid,
        photo_type: Option<PhotoType>,
    ) -> Result<Vec<UserPhoto>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .photos
            .iter()
            .rev()
            .filter(|photo| photo.user_id == user_id && photo.is_active)
            .filter(|photo| photo_type.map_or(true, |kind| photo.photo_type == kind))
            .cloned()
            .collect())
    }

    async fn deactivate_photo(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.photos.iter_mut().find(|photo| photo.id == id) {
            Some(photo) => {
                photo.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_wardrobe_item(&self, item: &NewWardrobeItem) -> Result<WardrobeItem> {
        let now = Utc::now();
        let item = WardrobeItem {
            id: Uuid::new_v4(),
            user_id: item.user_id,
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            category: item.category.clone(),
            tags: item.tags.clone(),
            season: item.season.clone(),
            style: item.style.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.wardrobe.push(item.clone());
        Ok(item)
    }

    async fn find_wardrobe_item(&self, user_id: Uuid, id: Uuid) -> Result<Option<WardrobeItem>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .wardrobe
            .iter()
            .find(|item| item.id == id && item.user_id == user_id)
            .cloned())
    }

    async fn list_wardrobe_items(&self, user_id: Uuid) -> Result<Vec<WardrobeItem>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .wardrobe
            .iter()
            .rev()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_wardrobe_items(&self, user_id: Uuid) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.wardrobe.iter().filter(|item| item.user_id == user_id).count() as i64)
    }

    async fn update_wardrobe_item(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: &WardrobeItemChanges,
    ) -> Result<Option<WardrobeItem>> {
        let mut tables = self.tables.lock().await;
        let Some(item) = tables
            .wardrobe
            .iter_mut()
            .find(|item| item.id == id && item.user_id == user_id)
        else {
            return Ok(None);
        };

        if let Some(name) = &changes.name {
            item.name = name.clone();
        }
        if let Some(image_url) = &changes.image_url {
            item.image_url = image_url.clone();
        }
        if let Some(category) = &changes.category {
            item.category = category.clone();
        }
        if let Some(tags) = &changes.tags {
            item.tags = tags.clone();
        }
        if let Some(season) = &changes.season {
            item.season = season.clone();
        }
        if let Some(style) = &changes.style {
            item.style = style.clone();
        }
        item.updated_at = Utc::now();

        Ok(Some(item.clone()))
    }

    async fn delete_wardrobe_item(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.wardrobe.len();
        tables
            .wardrobe
            .retain(|item| !(item.id == id && item.user_id == user_id));
        Ok(tables.wardrobe.len() < before)
    }

    async fn record_outfit_result(&self, result: &NewOutfitResult, date: NaiveDate) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let mut tables = self.tables.lock().await;
        tables.outfits.push(OutfitResult {
            id,
            user_id: result.user_id,
            result_image_url: result.result_image_url.clone(),
            input_user_photo_id: result.input_user_photo_id,
            input_clothing_ids: result.input_clothing_ids.clone(),
            style: result.style.clone(),
            created_at: Utc::now(),
        });
        *tables
            .usage
            .entry((result.user_id, ApiType::OutfitGenerate, date))
            .or_insert(0) += 1;
        Ok(id)
    }

    async fn find_outfit_result(&self, id: Uuid) -> Result<Option<OutfitResult>> {
        let tables = self.tables.lock().await;
        Ok(tables.outfits.iter().find(|result| result.id == id).cloned())
    }

    async fn list_outfit_results(&self, user_id: Uuid, limit: i64) -> Result<Vec<OutfitResult>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .outfits
            .iter()
            .rev()
            .filter(|result| result.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn usage_on(&self, user_id: Uuid, api_type: ApiType, date: NaiveDate) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .usage
            .get(&(user_id, api_type, date))
            .copied()
            .unwrap_or(0))
    }
}
