use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{check_status, error_message, Capabilities, ProviderError, Result, TryOnProvider, TryOnRequest};

const DEFAULT_RESOLUTION: &str = "1024x1024";

/// Single-garment virtual try-on.
pub struct PicCopilotProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct TryOnBody<'a> {
    person_image_url: &'a str,
    garment_image_url: &'a str,
    options: TryOnOptions,
}

#[derive(Debug, Serialize)]
struct TryOnOptions {
    resolution: String,
    quality: &'static str,
}

#[derive(Debug, Deserialize)]
struct TryOnData {
    result_image_url: Option<String>,
}

impl PicCopilotProvider {
    pub fn new(http: reqwest::Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn resolution(request: &TryOnRequest) -> String {
        match (request.width, request.height) {
            (Some(width), Some(height)) => format!("{}x{}", width, height),
            _ => DEFAULT_RESOLUTION.to_string(),
        }
    }
}

#[async_trait]
impl TryOnProvider for PicCopilotProvider {
    fn name(&self) -> &'static str {
        "piccopilot"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            requires_person_image: true,
            requires_garment: true,
            max_garments: Some(1),
        }
    }

    async fn generate(&self, request: &TryOnRequest) -> Result<String> {
        let person_image_url = request
            .person_image_url
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidInput("No person image provided".to_string()))?;
        let garment_image_url = request
            .garment_image_urls
            .first()
            .ok_or_else(|| ProviderError::InvalidInput("No garment images provided".to_string()))?;

        let body = TryOnBody {
            person_image_url,
            garment_image_url,
            options: TryOnOptions {
                resolution: Self::resolution(request),
                quality: "high",
            },
        };

        let response = self
            .http
            .post(format!("{}/virtual-try-on", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let payload: Value = check_status(response).await?.json().await?;

        let succeeded = payload.get("success").and_then(Value::as_bool) == Some(true);
        let data = payload
            .get("data")
            .cloned()
            .and_then(|data| serde_json::from_value::<TryOnData>(data).ok());

        match data.and_then(|data| data.result_image_url) {
            Some(url) if succeeded => Ok(url),
            _ => Err(ProviderError::Rejected(
                error_message(&payload).unwrap_or_else(|| "Failed to generate image".to_string()),
            )),
        }
    }
}
