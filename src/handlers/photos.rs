use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    handlers::{ApiResponse, AppState, JsonBody},
    middleware::AuthenticatedUser,
    models::{non_empty, CreatePhotoRequest, PhotoQuery, UserPhoto},
};

pub async fn create_photo(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    payload: JsonBody<CreatePhotoRequest>,
) -> Result<(StatusCode, ApiResponse<UserPhoto>)> {
    let request = payload?.0;
    let photo_url = request
        .photo_url
        .and_then(non_empty)
        .ok_or_else(|| AppError::Validation("photo_url is required".to_string()))?;

    let photo = state
        .repository
        .create_photo(auth.id, &photo_url, request.photo_type.unwrap_or_default())
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(photo)))
}

pub async fn list_photos(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    query: std::result::Result<Query<PhotoQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<UserPhoto>>> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let photos = state
        .repository
        .list_active_photos(auth.id, query.photo_type)
        .await?;
    Ok(ApiResponse::ok(photos))
}

/// Clears the active flag; outfit history keeps referencing the row.
pub async fn delete_photo(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::PhotoNotFound)?;

    let photo = state
        .repository
        .find_photo_by_id(id)
        .await?
        .filter(|photo| photo.user_id == auth.id && photo.is_active)
        .ok_or(AppError::PhotoNotFound)?;

    state.repository.deactivate_photo(photo.id).await?;

    Ok(ApiResponse::message("Photo deleted successfully"))
}
