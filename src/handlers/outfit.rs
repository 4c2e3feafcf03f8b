use axum::extract::{Query, State};

use crate::{
    errors::Result,
    handlers::{ApiResponse, AppState, JsonBody},
    middleware::AuthenticatedUser,
    models::{GenerateOutfitRequest, GenerateOutfitResponse, HistoryQuery, OutfitResult},
};

pub async fn generate(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    payload: JsonBody<GenerateOutfitRequest>,
) -> Result<ApiResponse<GenerateOutfitResponse>> {
    let request = payload?.0;
    let outcome = state.generator.generate(auth.id, request).await;

    // Validation failures never reached the provider.
    match &outcome {
        Ok(_) => state.metrics.record_generation(state.generator.provider_name(), true),
        Err(crate::errors::AppError::Generation(_)) => {
            state.metrics.record_generation(state.generator.provider_name(), false)
        }
        Err(_) => {}
    }

    Ok(ApiResponse::ok(GenerateOutfitResponse::from(outcome?)))
}

pub async fn history(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> Result<ApiResponse<Vec<OutfitResult>>> {
    let results = state
        .repository
        .list_outfit_results(auth.id, query.limit())
        .await?;
    Ok(ApiResponse::ok(results))
}
