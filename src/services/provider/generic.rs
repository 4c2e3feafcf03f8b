use async_trait::async_trait;
use serde_json::{json, Value};

use super::{check_status, error_message, outfit_prompt, Capabilities, ProviderError, Result, TryOnProvider, TryOnRequest};

const PROMPT_BASE: &str = "A realistic photo of a person wearing an outfit combination";

/// Free-form generation parameters for the aggregator's `/generate/image`.
#[derive(Debug, Clone, Default)]
pub struct ImagePrompt {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub steps: Option<u32>,
    pub guidance: Option<f64>,
}

/// Prompt-only image generation through an API aggregator.
pub struct GenericProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GenericProvider {
    pub fn new(http: reqwest::Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// One attempt at `/generate/image`; unset dimensions and tuning fall back to aggregator defaults.
    pub async fn generate_image(&self, request: &ImagePrompt) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/generate/image", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "prompt": request.prompt,
                "negative_prompt": request.negative_prompt,
                "width": request.width.unwrap_or(512),
                "height": request.height.unwrap_or(512),
                "steps": request.steps.unwrap_or(20),
                "guidance": request.guidance.unwrap_or(7.5),
            }))
            .send()
            .await?;
        let payload: Value = check_status(response).await?.json().await?;

        let succeeded = payload.get("success").and_then(Value::as_bool) == Some(true);
        let image_url = payload
            .pointer("/data/image_url")
            .and_then(Value::as_str)
            .filter(|_| succeeded);

        match image_url {
            Some(url) => Ok(url.to_string()),
            None => Err(ProviderError::Rejected(
                error_message(&payload).unwrap_or_else(|| "Failed to generate image".to_string()),
            )),
        }
    }
}

#[async_trait]
impl TryOnProvider for GenericProvider {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            requires_person_image: false,
            requires_garment: false,
            max_garments: None,
        }
    }

    async fn generate(&self, request: &TryOnRequest) -> Result<String> {
        let prompt = outfit_prompt(
            PROMPT_BASE,
            request.garment_image_urls.len(),
            request.style.as_deref(),
        );

        self.generate_image(&ImagePrompt {
            prompt,
            width: request.width,
            height: request.height,
            ..Default::default()
        })
        .await
    }
}
