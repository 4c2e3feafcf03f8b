use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{errors::AppError, handlers::AppState};

/// Caller identity taken from the bearer token. The user row is not loaded here.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Auth("Authentication token required".to_string()))?;

        let claims = state.jwt.verify_token(token)?;

        Ok(AuthenticatedUser {
            id: claims.user_id()?,
        })
    }
}
