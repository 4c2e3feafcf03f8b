use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    database::Repository,
    errors::{AppError, Result},
    models::{ApiType, GenerateOutfitRequest, NewOutfitResult, OutfitResult},
    services::provider::{ImagePrompt, ProviderClient, ProviderError, TryOnRequest},
};

pub const FREE_DAILY_GENERATION_LIMIT: i64 = 3;

/// Stored image URLs gathered by the validator, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInputs {
    pub photo_url: Option<String>,
    pub garment_urls: Vec<String>,
}

/// Validates, calls the provider, and records the result.
pub struct GenerationService {
    repository: Arc<dyn Repository>,
    provider: ProviderClient,
    public_base_url: String,
}

impl GenerationService {
    pub fn new(repository: Arc<dyn Repository>, provider: ProviderClient, public_base_url: &str) -> Self {
        Self {
            repository,
            provider,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Ordered checks; the first failure wins and nothing is written.
    ///
    /// The quota read is not reserved: concurrent requests from one free user
    /// can all pass it and overshoot the daily ceiling.
    pub async fn validate(
        &self,
        user_id: Uuid,
        photo_id: Option<Uuid>,
        clothing_ids: &[Uuid],
    ) -> Result<ValidatedInputs> {
        let user = self
            .repository
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if user.tier.is_free() {
            let today = Utc::now().date_naive();
            let used = self
                .repository
                .usage_on(user_id, ApiType::OutfitGenerate, today)
                .await?;
            if used >= FREE_DAILY_GENERATION_LIMIT {
                return Err(AppError::UsageLimitExceeded(FREE_DAILY_GENERATION_LIMIT));
            }
        }

        let photo_url = match photo_id {
            Some(id) => {
                let photo = self
                    .repository
                    .find_photo_by_id(id)
                    .await?
                    .filter(|photo| photo.user_id == user_id)
                    .ok_or(AppError::PhotoNotFound)?;
                Some(photo.photo_url)
            }
            None => None,
        };

        let mut garment_urls = Vec::with_capacity(clothing_ids.len());
        for &id in clothing_ids {
            let item = self
                .repository
                .find_wardrobe_item(user_id, id)
                .await?
                .ok_or(AppError::ClothingNotFound(id))?;
            garment_urls.push(item.image_url);
        }

        Ok(ValidatedInputs {
            photo_url,
            garment_urls,
        })
    }

    /// Absolute URLs pass through; anything else is joined to the public base URL.
    pub fn resolve_url(&self, stored: &str) -> String {
        if stored.starts_with("http") {
            stored.to_string()
        } else if stored.starts_with('/') {
            format!("{}{}", self.public_base_url, stored)
        } else {
            format!("{}/{}", self.public_base_url, stored)
        }
    }

    pub async fn generate(&self, user_id: Uuid, request: GenerateOutfitRequest) -> Result<OutfitResult> {
        let clothing_ids = request.clothing_ids.unwrap_or_default();
        let inputs = self
            .validate(user_id, request.user_photo_id, &clothing_ids)
            .await?;

        let style = request.style.filter(|style| !style.trim().is_empty());
        let try_on = TryOnRequest {
            person_image_url: inputs.photo_url.as_deref().map(|url| self.resolve_url(url)),
            garment_image_urls: inputs
                .garment_urls
                .iter()
                .map(|url| self.resolve_url(url))
                .collect(),
            style: style.clone(),
            width: request.width,
            height: request.height,
        };

        let result_image_url = self
            .provider
            .generate_outfit_image(try_on)
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        self.persist(NewOutfitResult {
            user_id,
            result_image_url,
            input_user_photo_id: request.user_photo_id,
            input_clothing_ids: (!clothing_ids.is_empty()).then_some(clothing_ids),
            style,
        })
        .await
    }

    /// Stores the result and charges the quota in one step, then re-reads the row.
    async fn persist(&self, result: NewOutfitResult) -> Result<OutfitResult> {
        let id = self
            .repository
            .record_outfit_result(&result, Utc::now().date_naive())
            .await?;

        let stored = self
            .repository
            .find_outfit_result(id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("outfit result {} missing right after insert", id))
            })?;

        tracing::info!("Generated outfit {} for user {}", stored.id, stored.user_id);
        Ok(stored)
    }

    /// Free-form prompt generation. Not quota-charged and not persisted.
    pub async fn generate_image(&self, prompt: &ImagePrompt) -> Result<String> {
        self.provider.generate_image(prompt).await.map_err(|e| match e {
            ProviderError::InvalidInput(message) => AppError::Validation(message),
            other => AppError::Generation(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;
    use crate::models::{NewWardrobeItem, PhotoType, UserTier};
    use crate::services::provider::{generic::GenericProvider, RetryPolicy};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service(server: &MockServer) -> (Arc<MemoryDatabase>, GenerationService) {
        let db = Arc::new(MemoryDatabase::new());
        let provider = ProviderClient::new(
            Box::new(GenericProvider::new(reqwest::Client::new(), &server.uri(), "k")),
            GenericProvider::new(reqwest::Client::new(), &server.uri(), "k"),
            RetryPolicy::new(1, Duration::from_millis(1)),
        );
        let service = GenerationService::new(db.clone(), provider, "http://localhost:3001/");
        (db, service)
    }

    async fn mount_success(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/generate/image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"image_url": "https://agg.example.com/out.png"}
            })))
            .mount(server)
            .await;
    }

    async fn garment(db: &MemoryDatabase, user_id: Uuid, url: &str) -> Uuid {
        db.create_wardrobe_item(&NewWardrobeItem {
            user_id,
            name: None,
            image_url: url.to_string(),
            category: None,
            tags: None,
            season: None,
            style: None,
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_resolve_url() {
        let server = MockServer::start().await;
        let (_, service) = service(&server).await;

        assert_eq!(service.resolve_url("https://cdn/x.png"), "https://cdn/x.png");
        assert_eq!(
            service.resolve_url("/uploads/wardrobe/x.png"),
            "http://localhost:3001/uploads/wardrobe/x.png"
        );
        assert_eq!(
            service.resolve_url("uploads/x.png"),
            "http://localhost:3001/uploads/x.png"
        );
    }

    #[tokio::test]
    async fn test_free_tier_quota() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let (db, service) = service(&server).await;
        let user = db.create_user("free@example.com", "h", None).await.unwrap();

        for _ in 0..3 {
            service.generate(user.id, GenerateOutfitRequest::default()).await.unwrap();
        }

        let err = service
            .generate(user.id, GenerateOutfitRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UsageLimitExceeded(3)));
        assert_eq!(db.list_outfit_results(user.id, 50).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_premium_is_unlimited() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let (db, service) = service(&server).await;
        let user = db.create_user("vip@example.com", "h", None).await.unwrap();
        db.set_tier(user.id, UserTier::Vip).await.unwrap();

        for _ in 0..5 {
            service.generate(user.id, GenerateOutfitRequest::default()).await.unwrap();
        }
        let today = Utc::now().date_naive();
        assert_eq!(db.usage_on(user.id, ApiType::OutfitGenerate, today).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_foreign_references_are_not_found() {
        let server = MockServer::start().await;
        let (db, service) = service(&server).await;
        let alice = db.create_user("alice@example.com", "h", None).await.unwrap();
        let bob = db.create_user("bob@example.com", "h", None).await.unwrap();

        let bobs_photo = db.create_photo(bob.id, "/uploads/user-photos/b.jpg", PhotoType::Body).await.unwrap();
        let bobs_shirt = garment(&db, bob.id, "/uploads/wardrobe/b.png").await;
        let alices_shirt = garment(&db, alice.id, "/uploads/wardrobe/a.png").await;

        let err = service.validate(alice.id, Some(bobs_photo.id), &[]).await.unwrap_err();
        assert!(matches!(err, AppError::PhotoNotFound));

        let err = service
            .validate(alice.id, None, &[alices_shirt, bobs_shirt])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ClothingNotFound(id) if id == bobs_shirt));
    }

    #[tokio::test]
    async fn test_quota_is_checked_before_ownership() {
        let server = MockServer::start().await;
        let (db, service) = service(&server).await;
        let user = db.create_user("q@example.com", "h", None).await.unwrap();
        let today = Utc::now().date_naive();
        let earlier = NewOutfitResult {
            user_id: user.id,
            result_image_url: "https://cdn/earlier.png".to_string(),
            input_user_photo_id: None,
            input_clothing_ids: None,
            style: None,
        };
        for _ in 0..3 {
            db.record_outfit_result(&earlier, today).await.unwrap();
        }

        let err = service.validate(user.id, Some(Uuid::new_v4()), &[]).await.unwrap_err();
        assert!(matches!(err, AppError::UsageLimitExceeded(_)));

        let err = service.validate(Uuid::new_v4(), None, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));
    }

    #[tokio::test]
    async fn test_result_keeps_inputs_and_soft_deleted_photo() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let (db, service) = service(&server).await;
        let user = db.create_user("keep@example.com", "h", None).await.unwrap();
        let photo = db.create_photo(user.id, "/uploads/user-photos/me.jpg", PhotoType::Body).await.unwrap();
        let first = garment(&db, user.id, "https://cdn/1.png").await;
        let second = garment(&db, user.id, "/uploads/wardrobe/2.png").await;

        let inputs = service.validate(user.id, Some(photo.id), &[first, second]).await.unwrap();
        assert_eq!(inputs.garment_urls, vec!["https://cdn/1.png", "/uploads/wardrobe/2.png"]);

        let result = service
            .generate(
                user.id,
                GenerateOutfitRequest {
                    user_photo_id: Some(photo.id),
                    clothing_ids: Some(vec![first, second]),
                    style: Some("casual".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(result.result_image_url, "https://agg.example.com/out.png");

        db.deactivate_photo(photo.id).await.unwrap();
        assert!(db.list_active_photos(user.id, None).await.unwrap().is_empty());

        let history = db.list_outfit_results(user.id, 50).await.unwrap();
        assert_eq!(history[0].input_user_photo_id, Some(photo.id));
        assert_eq!(history[0].input_clothing_ids, Some(vec![first, second]));
        assert_eq!(history[0].style.as_deref(), Some("casual"));
        assert!(db.find_photo_by_id(photo.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_provider_failure_records_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": "upstream quota"
            })))
            .mount(&server)
            .await;
        let (db, service) = service(&server).await;
        let user = db.create_user("fail@example.com", "h", None).await.unwrap();

        let err = service
            .generate(user.id, GenerateOutfitRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Generation(ref msg) if msg == "upstream quota"));

        let today = Utc::now().date_naive();
        assert_eq!(db.usage_on(user.id, ApiType::OutfitGenerate, today).await.unwrap(), 0);
        assert!(db.list_outfit_results(user.id, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_each_generation_is_charged_with_its_row() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let (db, service) = service(&server).await;
        let user = db.create_user("ledger@example.com", "h", None).await.unwrap();

        let first = service.generate(user.id, GenerateOutfitRequest::default()).await.unwrap();
        let second = service.generate(user.id, GenerateOutfitRequest::default()).await.unwrap();
        assert_ne!(first.id, second.id);

        let today = Utc::now().date_naive();
        let rows = db.list_outfit_results(user.id, 50).await.unwrap().len() as i64;
        assert_eq!(rows, 2);
        assert_eq!(db.usage_on(user.id, ApiType::OutfitGenerate, today).await.unwrap(), rows);
    }

    #[tokio::test]
    async fn test_prompt_generation_is_not_charged() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let (db, service) = service(&server).await;
        let user = db.create_user("prompt@example.com", "h", None).await.unwrap();

        let url = service
            .generate_image(&ImagePrompt {
                prompt: "pleated wool skirt".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(url, "https://agg.example.com/out.png");

        let err = service.generate_image(&ImagePrompt::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg == "Prompt is required"));

        let today = Utc::now().date_naive();
        assert_eq!(db.usage_on(user.id, ApiType::OutfitGenerate, today).await.unwrap(), 0);
    }
}
