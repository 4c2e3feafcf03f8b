use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use super::{
    create_provider, http_client, Capabilities, GenericProvider, ImagePrompt, ProviderError,
    Result, TryOnProvider, TryOnRequest,
};
use crate::config::AiConfig;

/// Linear backoff: the sleep after failed attempt `n` is `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Runs `call` until it succeeds, fails non-retryably, or attempts run out.
    /// The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        "{} attempt {}/{} failed, giving up: {}",
                        label,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        "{} attempt {}/{} failed, retrying in {:?}: {}",
                        label,
                        attempt,
                        self.max_attempts,
                        delay,
                        e
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// The configured try-on provider, the prompt aggregator, and the shared retry loop.
pub struct ProviderClient {
    provider: Box<dyn TryOnProvider>,
    aggregator: GenericProvider,
    retry: RetryPolicy,
}

impl ProviderClient {
    pub fn new(provider: Box<dyn TryOnProvider>, aggregator: GenericProvider, retry: RetryPolicy) -> Self {
        Self {
            provider,
            aggregator,
            retry,
        }
    }

    pub fn from_config(config: &AiConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            create_provider(config)?,
            GenericProvider::new(http_client(config)?, &config.endpoint, &config.api_key),
            RetryPolicy::new(config.retry_count, config.retry_base_delay),
        ))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Applies the provider's capability limits before any network call.
    fn prepare(&self, mut request: TryOnRequest) -> Result<TryOnRequest> {
        let Capabilities {
            requires_person_image,
            requires_garment,
            max_garments,
        } = self.provider.capabilities();

        if requires_garment && request.garment_image_urls.is_empty() {
            return Err(ProviderError::InvalidInput("No garment images provided".to_string()));
        }
        if requires_person_image && request.person_image_url.is_none() {
            return Err(ProviderError::InvalidInput("No person image provided".to_string()));
        }

        if let Some(max) = max_garments {
            if request.garment_image_urls.len() > max {
                tracing::warn!(
                    "{} accepts {} garment(s), got {}; using the first only",
                    self.provider.name(),
                    max,
                    request.garment_image_urls.len()
                );
                request.garment_image_urls.truncate(max);
            }
        }

        Ok(request)
    }

    pub async fn generate_outfit_image(&self, request: TryOnRequest) -> Result<String> {
        let request = self.prepare(request)?;
        self.retry
            .run(self.provider.name(), || self.provider.generate(&request))
            .await
    }

    /// Free-form prompt generation; always served by the aggregator.
    pub async fn generate_image(&self, prompt: &ImagePrompt) -> Result<String> {
        if prompt.prompt.trim().is_empty() {
            return Err(ProviderError::InvalidInput("Prompt is required".to_string()));
        }
        self.retry
            .run("aggregator", || self.aggregator.generate_image(prompt))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::piccopilot::PicCopilotProvider;
    use serde_json::json;
    use std::time::Instant;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, base_delay: Duration) -> ProviderClient {
        ProviderClient::new(
            Box::new(PicCopilotProvider::new(reqwest::Client::new(), &server.uri(), "k")),
            GenericProvider::new(reqwest::Client::new(), &server.uri(), "k"),
            RetryPolicy::new(3, base_delay),
        )
    }

    fn success_body() -> serde_json::Value {
        json!({"success": true, "data": {"result_image_url": "https://cdn.example.com/out.png"}})
    }

    fn request(garments: &[&str]) -> TryOnRequest {
        TryOnRequest {
            person_image_url: Some("https://cdn.example.com/me.jpg".to_string()),
            garment_image_urls: garments.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/virtual-try-on"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": {"message": "busy"}})))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/virtual-try-on"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount(&server)
            .await;

        let base = Duration::from_millis(20);
        let started = Instant::now();
        let url = client(&server, base)
            .generate_outfit_image(request(&["https://cdn.example.com/a.png"]))
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/out.png");
        // 1x then 2x the base delay
        assert!(started.elapsed() >= base * 3);
    }

    #[tokio::test]
    async fn test_last_error_is_returned_after_exhaustion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "model overloaded"}})))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_millis(1))
            .generate_outfit_image(request(&["https://cdn.example.com/a.png"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "model overloaded");
    }

    #[tokio::test]
    async fn test_single_garment_backend_uses_first_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"garment_image_url": "https://cdn.example.com/first.png"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount(&server)
            .await;

        let url = client(&server, Duration::from_millis(1))
            .generate_outfit_image(request(&[
                "https://cdn.example.com/first.png",
                "https://cdn.example.com/second.png",
            ]))
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/out.png");
    }

    #[tokio::test]
    async fn test_no_garments_fails_without_calling_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_millis(1))
            .generate_outfit_image(request(&[]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No garment images provided");
    }

    #[tokio::test]
    async fn test_prompt_generation_retries_through_aggregator() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate/image"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/generate/image"))
            .and(body_partial_json(json!({"prompt": "linen summer dress"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"image_url": "https://cdn.example.com/dress.png"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = client(&server, Duration::from_millis(1))
            .generate_image(&ImagePrompt {
                prompt: "linen summer dress".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/dress.png");
    }

    #[tokio::test]
    async fn test_blank_prompt_is_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_millis(1))
            .generate_image(&ImagePrompt {
                prompt: "   ".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Prompt is required");
    }
}
