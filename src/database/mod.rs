use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
    ApiType, NewOutfitResult, NewWardrobeItem, OutfitResult, PhotoType, User, UserPhoto,
    WardrobeItem, WardrobeItemChanges,
};

pub mod memory;
pub mod queries;

pub use memory::MemoryDatabase;

/// Everything the request handlers need from the relational store.
///
/// Ownership is never enforced here except where a method takes both a
/// `user_id` and an `id`; callers check ownership for the rest.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        nickname: Option<&str>,
    ) -> Result<User>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn create_photo(
        &self,
        user_id: Uuid,
        photo_url: &str,
        photo_type: PhotoType,
    ) -> Result<UserPhoto>;
    /// Returns inactive rows too.
    async fn find_photo_by_id(&self, id: Uuid) -> Result<Option<UserPhoto>>;
    async fn list_active_photos(
        &self,
        user_id: Uuid,
        photo_type: Option<PhotoType>,
    ) -> Result<Vec<UserPhoto>>;
    async fn deactivate_photo(&self, id: Uuid) -> Result<bool>;

    async fn create_wardrobe_item(&self, item: &NewWardrobeItem) -> Result<WardrobeItem>;
    async fn find_wardrobe_item(&self, user_id: Uuid, id: Uuid) -> Result<Option<WardrobeItem>>;
    async fn list_wardrobe_items(&self, user_id: Uuid) -> Result<Vec<WardrobeItem>>;
    async fn count_wardrobe_items(&self, user_id: Uuid) -> Result<i64>;
    async fn update_wardrobe_item(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: &WardrobeItemChanges,
    ) -> Result<Option<WardrobeItem>>;
    async fn delete_wardrobe_item(&self, user_id: Uuid, id: Uuid) -> Result<bool>;

    /// Appends the result and charges one `outfit_generate` use for `date`, atomically.
    async fn record_outfit_result(&self, result: &NewOutfitResult, date: NaiveDate) -> Result<Uuid>;
    async fn find_outfit_result(&self, id: Uuid) -> Result<Option<OutfitResult>>;
    async fn list_outfit_results(&self, user_id: Uuid, limit: i64) -> Result<Vec<OutfitResult>>;

    async fn usage_on(&self, user_id: Uuid, api_type: ApiType, date: NaiveDate) -> Result<i64>;
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| crate::errors::AppError::Database(e.into()))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
