use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::time::{sleep, Instant};

use super::{check_status, outfit_prompt, Capabilities, ProviderError, Result, TryOnProvider, TryOnRequest};

const PROMPT_BASE: &str = "A realistic photo of a person wearing a fashionable outfit";
const NEGATIVE_PROMPT: &str = "blurry, low quality, distorted, deformed";
const GUIDANCE_SCALE: f64 = 7.5;
const INFERENCE_STEPS: u32 = 25;

/// IP-Adapter predictions on Replicate. Non-terminal predictions are polled.
pub struct ReplicateProvider {
    http: reqwest::Client,
    endpoint: String,
    api_token: String,
    model_version: String,
    poll_interval: Duration,
    poll_deadline: Duration,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    status: String,
    #[serde(default)]
    output: Value,
    error: Option<Value>,
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

impl ReplicateProvider {
    pub fn new(http: reqwest::Client, endpoint: &str, api_token: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            model_version: String::new(),
            poll_interval: Duration::from_secs(1),
            poll_deadline: Duration::from_secs(120),
        }
    }

    pub fn with_model_version(mut self, version: &str) -> Self {
        self.model_version = version.to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_deadline(mut self, deadline: Duration) -> Self {
        self.poll_deadline = deadline;
        self
    }

    fn input(request: &TryOnRequest, image: &str) -> Value {
        let prompt = format!(
            "{}, {}",
            outfit_prompt(PROMPT_BASE, request.garment_image_urls.len(), request.style.as_deref()),
            NEGATIVE_PROMPT
        );

        let mut input = Map::new();
        input.insert("image".into(), json!(image));
        input.insert("prompt".into(), json!(prompt));
        input.insert("num_outputs".into(), json!(1));
        input.insert("guidance_scale".into(), json!(GUIDANCE_SCALE));
        input.insert("num_inference_steps".into(), json!(INFERENCE_STEPS));
        if let (Some(width), Some(height)) = (request.width, request.height) {
            input.insert("width".into(), json!(width));
            input.insert("height".into(), json!(height));
        }
        Value::Object(input)
    }

    async fn fetch(&self, url: &str) -> Result<Prediction> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

/// Output is either a URL string or an array whose first element is one.
fn output_url(output: &Value) -> Result<String> {
    let candidate = match output {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    candidate
        .and_then(Value::as_str)
        .filter(|url| url.starts_with("http"))
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Malformed("Invalid output format from Replicate".to_string()))
}

#[async_trait]
impl TryOnProvider for ReplicateProvider {
    fn name(&self) -> &'static str {
        "replicate"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            requires_person_image: true,
            requires_garment: false,
            max_garments: None,
        }
    }

    async fn generate(&self, request: &TryOnRequest) -> Result<String> {
        let image = request
            .person_image_url
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidInput("No person image provided".to_string()))?;

        let response = self
            .http
            .post(format!("{}/predictions", self.endpoint))
            .bearer_auth(&self.api_token)
            .json(&json!({
                "version": self.model_version,
                "input": Self::input(request, image),
            }))
            .send()
            .await?;
        let mut prediction: Prediction = check_status(response).await?.json().await?;

        let deadline = Instant::now() + self.poll_deadline;
        loop {
            match prediction.status.as_str() {
                "succeeded" => return output_url(&prediction.output),
                "failed" | "canceled" => {
                    let message = prediction
                        .error
                        .as_ref()
                        .and_then(Value::as_str)
                        .unwrap_or("Prediction failed");
                    return Err(ProviderError::Rejected(message.to_string()));
                }
                _ => {}
            }

            let poll_url = prediction
                .urls
                .as_ref()
                .and_then(|urls| urls.get.clone())
                .ok_or_else(|| ProviderError::Malformed("Prediction has no polling URL".to_string()))?;

            if Instant::now() >= deadline {
                return Err(ProviderError::Rejected(format!(
                    "Prediction still {} after {}s",
                    prediction.status,
                    self.poll_deadline.as_secs()
                )));
            }

            tracing::debug!("Prediction {}, polling {}", prediction.status, poll_url);
            sleep(self.poll_interval).await;
            prediction = self.fetch(&poll_url).await?;
        }
    }
}
