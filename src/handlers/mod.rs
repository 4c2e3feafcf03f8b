use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    auth::JwtService,
    config::Config,
    database::Repository,
    services::{metrics::MetricsService, provider::ProviderClient, GenerationService},
    storage::LocalStorage,
};

pub mod ai;
pub mod auth;
pub mod health;
pub mod metrics;
pub mod outfit;
pub mod photos;
pub mod upload;
pub mod wardrobe;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn Repository>,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtService>,
    pub generator: Arc<GenerationService>,
    pub storage: LocalStorage,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(config: Config, repository: Arc<dyn Repository>) -> anyhow::Result<Self> {
        let provider = ProviderClient::from_config(&config.ai)?;
        let generator = GenerationService::new(repository.clone(), provider, &config.api_base_url);
        let storage = LocalStorage::new(&config.upload_dir)?;

        Ok(Self {
            jwt: Arc::new(JwtService::new(&config.jwt_secret)),
            generator: Arc::new(generator),
            storage,
            metrics: Arc::new(MetricsService::new()?),
            repository,
            config: Arc::new(config),
        })
    }
}

/// Success half of the `{success, data?, message?, error?}` envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// JSON body whose rejection becomes a `VALIDATION_ERROR` envelope.
pub type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;
