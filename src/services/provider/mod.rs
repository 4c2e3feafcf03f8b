//! Outbound image-generation providers.
//!
//! Each backend implements [`TryOnProvider`]; [`create_provider`] picks one from
//! configuration at startup and [`ProviderClient`] wraps it with the shared
//! retry policy. Free-form prompts always go to the aggregator
//! ([`GenericProvider`]) at the configured endpoint.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::{AiConfig, ProviderKind};

pub mod client;
pub mod generic;
pub mod piccopilot;
pub mod replicate;

pub use client::{ProviderClient, RetryPolicy};
pub use generic::{GenericProvider, ImagePrompt};

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Bad input that no amount of retrying fixes.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Malformed(String),

    #[error("{0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::InvalidInput(_))
    }
}

/// Inputs for one generation, with image URLs already absolute.
#[derive(Debug, Clone, Default)]
pub struct TryOnRequest {
    pub person_image_url: Option<String>,
    pub garment_image_urls: Vec<String>,
    pub style: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub requires_person_image: bool,
    pub requires_garment: bool,
    /// `None` means any number.
    pub max_garments: Option<usize>,
}

#[async_trait]
pub trait TryOnProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Performs a single attempt and returns the result image URL.
    async fn generate(&self, request: &TryOnRequest) -> Result<String>;
}

pub(crate) fn http_client(config: &AiConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .context("Failed to build provider HTTP client")
}

pub fn create_provider(config: &AiConfig) -> anyhow::Result<Box<dyn TryOnProvider>> {
    let http = http_client(config)?;

    let provider: Box<dyn TryOnProvider> = match config.provider {
        ProviderKind::PicCopilot => Box::new(piccopilot::PicCopilotProvider::new(
            http,
            &config.endpoint,
            &config.api_key,
        )),
        ProviderKind::Replicate => Box::new(
            replicate::ReplicateProvider::new(http, &config.endpoint, &config.api_key)
                .with_model_version(&config.replicate_model_version)
                .with_poll_deadline(config.timeout),
        ),
        ProviderKind::Generic => Box::new(generic::GenericProvider::new(
            http,
            &config.endpoint,
            &config.api_key,
        )),
    };

    tracing::info!("AI provider: {}", provider.name());
    Ok(provider)
}

/// Pulls a human-readable message out of a provider error body.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error");
    error
        .and_then(|e| e.get("message"))
        .or(error)
        .or_else(|| body.get("detail"))
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Converts a non-2xx response into [`ProviderError::Status`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = error_message(&body)
        .unwrap_or_else(|| format!("Provider returned HTTP {}", status.as_u16()));

    Err(ProviderError::Status {
        status: status.as_u16(),
        message,
    })
}

pub(crate) fn outfit_prompt(base: &str, garments: usize, style: Option<&str>) -> String {
    let clothing = if garments > 0 {
        format!(" with {} clothing items", garments)
    } else {
        String::new()
    };
    let style = match style {
        Some(style) if !style.trim().is_empty() => format!(", {} style", style.trim()),
        _ => ", high quality, detailed, professional photography".to_string(),
    };

    format!("{}{}{}", base, clothing, style)
}
