use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{types::Json, FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::{Database, Repository};
use crate::errors::{AppError, Result};
use crate::models::*;

const USER_COLUMNS: &str =
    "id, email, password_hash, nickname, avatar, tier, created_at, updated_at";
const PHOTO_COLUMNS: &str = "id, user_id, photo_url, photo_type, is_active, created_at";
const WARDROBE_COLUMNS: &str =
    "id, user_id, name, image_url, category, tags, season, style, created_at, updated_at";
const OUTFIT_COLUMNS: &str =
    "id, user_id, result_image_url, input_user_photo_id, input_clothing_ids, style, created_at";

#[derive(FromRow)]
struct WardrobeItemRow {
    id: Uuid,
    user_id: Uuid,
    name: Option<String>,
    image_url: String,
    category: Option<String>,
    tags: Option<Json<Vec<String>>>,
    season: Option<String>,
    style: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WardrobeItemRow> for WardrobeItem {
    fn from(row: WardrobeItemRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            image_url: row.image_url,
            category: row.category,
            tags: row.tags.map(|tags| tags.0),
            season: row.season,
            style: row.style,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct OutfitResultRow {
    id: Uuid,
    user_id: Uuid,
    result_image_url: String,
    input_user_photo_id: Option<Uuid>,
    input_clothing_ids: Option<Json<Vec<Uuid>>>,
    style: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OutfitResultRow> for OutfitResult {
    fn from(row: OutfitResultRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            result_image_url: row.result_image_url,
            input_user_photo_id: row.input_user_photo_id,
            input_clothing_ids: row.input_clothing_ids.map(|ids| ids.0),
            style: row.style,
            created_at: row.created_at,
        }
    }
}

pub struct UserQueries;

impl UserQueries {
    pub async fn create_user(
        pool: &PgPool,
        email: &str,
        password_hash: &str,
        nickname: Option<&str>,
    ) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, nickname) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(password_hash)
            .bind(nickname)
            .fetch_one(pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::EmailExists,
                other => AppError::Database(other),
            })
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }
}

pub struct PhotoQueries;

impl PhotoQueries {
    pub async fn create_photo(
        pool: &PgPool,
        user_id: Uuid,
        photo_url: &str,
        photo_type: PhotoType,
    ) -> Result<UserPhoto> {
        let sql = format!(
            "INSERT INTO user_photos (user_id, photo_url, photo_type) VALUES ($1, $2, $3) RETURNING {}",
            PHOTO_COLUMNS
        );
        let photo = sqlx::query_as::<_, UserPhoto>(&sql)
            .bind(user_id)
            .bind(photo_url)
            .bind(photo_type)
            .fetch_one(pool)
            .await?;

        Ok(photo)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserPhoto>> {
        let sql = format!("SELECT {} FROM user_photos WHERE id = $1", PHOTO_COLUMNS);
        let photo = sqlx::query_as::<_, UserPhoto>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(photo)
    }

    pub async fn list_active(
        pool: &PgPool,
        user_id: Uuid,
        photo_type: Option<PhotoType>,
    ) -> Result<Vec<UserPhoto>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM user_photos
            WHERE user_id = $1 AND is_active = TRUE AND ($2::photo_type IS NULL OR photo_type = $2)
            ORDER BY created_at DESC
            "#,
            PHOTO_COLUMNS
        );
        let photos = sqlx::query_as::<_, UserPhoto>(&sql)
            .bind(user_id)
            .bind(photo_type)
            .fetch_all(pool)
            .await?;

        Ok(photos)
    }

    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE user_photos SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct WardrobeQueries;

impl WardrobeQueries {
    pub async fn create_item(pool: &PgPool, item: &NewWardrobeItem) -> Result<WardrobeItem> {
        let sql = format!(
            r#"
            INSERT INTO wardrobe_items (user_id, name, image_url, category, tags, season, style)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            WARDROBE_COLUMNS
        );
        let row = sqlx::query_as::<_, WardrobeItemRow>(&sql)
            .bind(item.user_id)
            .bind(&item.name)
            .bind(&item.image_url)
            .bind(&item.category)
            .bind(item.tags.clone().map(Json))
            .bind(&item.season)
            .bind(&item.style)
            .fetch_one(pool)
            .await?;

        Ok(row.into())
    }

    pub async fn find_by_user_and_id(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<WardrobeItem>> {
        let sql = format!(
            "SELECT {} FROM wardrobe_items WHERE id = $1 AND user_id = $2",
            WARDROBE_COLUMNS
        );
        let row = sqlx::query_as::<_, WardrobeItemRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<WardrobeItem>> {
        let sql = format!(
            "SELECT {} FROM wardrobe_items WHERE user_id = $1 ORDER BY created_at DESC",
            WARDROBE_COLUMNS
        );
        let rows = sqlx::query_as::<_, WardrobeItemRow>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM wardrobe_items WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    pub async fn update_item(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        changes: &WardrobeItemChanges,
    ) -> Result<Option<WardrobeItem>> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE wardrobe_items SET updated_at = NOW()");

        if let Some(name) = &changes.name {
            builder.push(", name = ").push_bind(name.clone());
        }
        if let Some(image_url) = &changes.image_url {
            builder.push(", image_url = ").push_bind(image_url.clone());
        }
        if let Some(category) = &changes.category {
            builder.push(", category = ").push_bind(category.clone());
        }
        if let Some(tags) = &changes.tags {
            builder.push(", tags = ").push_bind(tags.clone().map(Json));
        }
        if let Some(season) = &changes.season {
            builder.push(", season = ").push_bind(season.clone());
        }
        if let Some(style) = &changes.style {
            builder.push(", style = ").push_bind(style.clone());
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" RETURNING ")
            .push(WARDROBE_COLUMNS);

        let row = builder
            .build_query_as::<WardrobeItemRow>()
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn delete_item(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wardrobe_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct OutfitQueries;

impl OutfitQueries {
    pub async fn insert_result(conn: &mut PgConnection, result: &NewOutfitResult) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO outfit_results (user_id, result_image_url, input_user_photo_id, input_clothing_ids, style)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(result.user_id)
        .bind(&result.result_image_url)
        .bind(result.input_user_photo_id)
        .bind(result.input_clothing_ids.clone().map(Json))
        .bind(&result.style)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<OutfitResult>> {
        let sql = format!("SELECT {} FROM outfit_results WHERE id = $1", OUTFIT_COLUMNS);
        let row = sqlx::query_as::<_, OutfitResultRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn list_by_user(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<OutfitResult>> {
        let sql = format!(
            "SELECT {} FROM outfit_results WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            OUTFIT_COLUMNS
        );
        let rows = sqlx::query_as::<_, OutfitResultRow>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

pub struct UsageQueries;

impl UsageQueries {
    pub async fn usage_on(
        pool: &PgPool,
        user_id: Uuid,
        api_type: ApiType,
        date: NaiveDate,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i32>(
            "SELECT request_count FROM api_usage_logs WHERE user_id = $1 AND api_type = $2 AND date = $3",
        )
        .bind(user_id)
        .bind(api_type.as_str())
        .bind(date)
        .fetch_optional(pool)
        .await?;

        Ok(count.map(i64::from).unwrap_or(0))
    }

    pub async fn increment(
        conn: &mut PgConnection,
        user_id: Uuid,
        api_type: ApiType,
        date: NaiveDate,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO api_usage_logs (user_id, api_type, request_count, date)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT (user_id, api_type, date)
            DO UPDATE SET request_count = api_usage_logs.request_count + 1
            "#,
        )
        .bind(user_id)
        .bind(api_type.as_str())
        .bind(date)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Repository for Database {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        nickname: Option<&str>,
    ) -> Result<User> {
        UserQueries::create_user(self.pool(), email, password_hash, nickname).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserQueries::find_by_email(self.pool(), email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserQueries::find_by_id(self.pool(), id).await
    }

    async fn create_photo(
        &self,
        user_id: Uuid,
        photo_url: &str,
        photo_type: PhotoType,
    ) -> Result<UserPhoto> {
        PhotoQueries::create_photo(self.pool(), user_id, photo_url, photo_type).await
    }

    async fn find_photo_by_id(&self, id: Uuid) -> Result<Option<UserPhoto>> {
        PhotoQueries::find_by_id(self.pool(), id).await
    }

    async fn list_active_photos(
        &self,
        user_id: Uuid,
        photo_type: Option<PhotoType>,
    ) -> Result<Vec<UserPhoto>> {
        PhotoQueries::list_active(self.pool(), user_id, photo_type).await
    }

    async fn deactivate_photo(&self, id: Uuid) -> Result<bool> {
        PhotoQueries::deactivate(self.pool(), id).await
    }

    async fn create_wardrobe_item(&self, item: &NewWardrobeItem) -> Result<WardrobeItem> {
        WardrobeQueries::create_item(self.pool(), item).await
    }

    async fn find_wardrobe_item(&self, user_id: Uuid, id: Uuid) -> Result<Option<WardrobeItem>> {
        WardrobeQueries::find_by_user_and_id(self.pool(), user_id, id).await
    }

    async fn list_wardrobe_items(&self, user_id: Uuid) -> Result<Vec<WardrobeItem>> {
        WardrobeQueries::list_by_user(self.pool(), user_id).await
    }

    async fn count_wardrobe_items(&self, user_id: Uuid) -> Result<i64> {
        WardrobeQueries::count_by_user(self.pool(), user_id).await
    }

    async fn update_wardrobe_item(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: &WardrobeItemChanges,
    ) -> Result<Option<WardrobeItem>> {
        WardrobeQueries::update_item(self.pool(), user_id, id, changes).await
    }

    async fn delete_wardrobe_item(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        WardrobeQueries::delete_item(self.pool(), user_id, id).await
    }

    async fn record_outfit_result(&self, result: &NewOutfitResult, date: NaiveDate) -> Result<Uuid> {
        let mut tx = self.pool().begin().await?;
        let id = OutfitQueries::insert_result(&mut *tx, result).await?;
        UsageQueries::increment(&mut *tx, result.user_id, ApiType::OutfitGenerate, date).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn find_outfit_result(&self, id: Uuid) -> Result<Option<OutfitResult>> {
        OutfitQueries::find_by_id(self.pool(), id).await
    }

    async fn list_outfit_results(&self, user_id: Uuid, limit: i64) -> Result<Vec<OutfitResult>> {
        OutfitQueries::list_by_user(self.pool(), user_id, limit).await
    }

    async fn usage_on(&self, user_id: Uuid, api_type: ApiType, date: NaiveDate) -> Result<i64> {
        UsageQueries::usage_on(self.pool(), user_id, api_type, date).await
    }
}
