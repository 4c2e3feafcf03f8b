use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    handlers::{ApiResponse, AppState, JsonBody},
    middleware::AuthenticatedUser,
    models::{
        non_empty, CreateWardrobeItemRequest, NewWardrobeItem, UpdateWardrobeItemRequest,
        WardrobeItem, WardrobeItemChanges,
    },
};

pub const FREE_WARDROBE_LIMIT: i64 = 50;

fn item_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::ItemNotFound)
}

pub async fn create_item(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    payload: JsonBody<CreateWardrobeItemRequest>,
) -> Result<(StatusCode, ApiResponse<WardrobeItem>)> {
    let request = payload?.0;
    let image_url = request
        .image_url
        .and_then(non_empty)
        .ok_or_else(|| AppError::Validation("image_url is required".to_string()))?;

    let user = state
        .repository
        .find_user_by_id(auth.id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if user.tier.is_free() {
        let count = state.repository.count_wardrobe_items(auth.id).await?;
        if count >= FREE_WARDROBE_LIMIT {
            return Err(AppError::WardrobeLimitExceeded(FREE_WARDROBE_LIMIT));
        }
    }

    let item = state
        .repository
        .create_wardrobe_item(&NewWardrobeItem {
            user_id: auth.id,
            name: request.name.and_then(non_empty),
            image_url,
            category: request.category.and_then(non_empty),
            tags: request.tags,
            season: request.season.and_then(non_empty),
            style: request.style.and_then(non_empty),
        })
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(item)))
}

pub async fn list_items(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<ApiResponse<Vec<WardrobeItem>>> {
    let items = state.repository.list_wardrobe_items(auth.id).await?;
    Ok(ApiResponse::ok(items))
}

pub async fn update_item(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<String>,
    payload: JsonBody<UpdateWardrobeItemRequest>,
) -> Result<ApiResponse<WardrobeItem>> {
    let id = item_id(&id)?;
    let request = payload?.0;

    if matches!(request.image_url.as_deref(), Some(url) if url.trim().is_empty()) {
        return Err(AppError::Validation("image_url cannot be empty".to_string()));
    }

    let changes = WardrobeItemChanges::from(request);
    let item = if changes.is_empty() {
        state.repository.find_wardrobe_item(auth.id, id).await?
    } else {
        state
            .repository
            .update_wardrobe_item(auth.id, id, &changes)
            .await?
    };

    Ok(ApiResponse::ok(item.ok_or(AppError::ItemNotFound)?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>> {
    let id = item_id(&id)?;

    if !state.repository.delete_wardrobe_item(auth.id, id).await? {
        return Err(AppError::ItemNotFound);
    }

    Ok(ApiResponse::message("Item deleted successfully"))
}
