use axum::extract::State;

use crate::{
    errors::{AppError, Result},
    handlers::{ApiResponse, AppState, JsonBody},
    middleware::AuthenticatedUser,
    models::{GenerateImageRequest, GenerateImageResponse},
    services::provider::ImagePrompt,
};

const AGGREGATOR: &str = "aggregator";

pub async fn generate_image(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    payload: JsonBody<GenerateImageRequest>,
) -> Result<ApiResponse<GenerateImageResponse>> {
    let request = payload?.0;
    let prompt = request
        .prompt
        .filter(|prompt| !prompt.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Prompt is required".to_string()))?;

    let outcome = state
        .generator
        .generate_image(&ImagePrompt {
            prompt,
            negative_prompt: request.negative_prompt,
            width: request.width,
            height: request.height,
            steps: request.steps,
            guidance: request.guidance,
        })
        .await;
    state.metrics.record_generation(AGGREGATOR, outcome.is_ok());

    Ok(ApiResponse::ok(GenerateImageResponse { image_url: outcome? }))
}
