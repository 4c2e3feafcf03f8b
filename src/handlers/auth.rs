use axum::{extract::State, http::StatusCode};

use crate::{
    auth::PasswordService,
    errors::{AppError, Result},
    handlers::{ApiResponse, AppState, JsonBody},
    middleware::AuthenticatedUser,
    models::{AuthResponse, CreateUserRequest, LoginRequest, User, UserResponse},
    utils::validation::is_valid_email,
};

fn required(value: Option<String>, message: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

fn issue(state: &AppState, user: User) -> Result<AuthResponse> {
    let token = state.jwt.generate_token(user.id, &user.email)?;
    Ok(AuthResponse {
        token,
        user: UserResponse::from(user),
    })
}

pub async fn register(
    State(state): State<AppState>,
    payload: JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, ApiResponse<AuthResponse>)> {
    let request = payload?.0;
    let email = required(request.email, "Email and password are required")?;
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("Email and password are required".to_string()))?;

    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }
    PasswordService::validate_password_strength(&password)?;

    if state.repository.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::EmailExists);
    }

    let password_hash = PasswordService::hash_password(&password)?;
    let nickname = request.nickname.and_then(crate::models::non_empty);
    let user = state
        .repository
        .create_user(&email, &password_hash, nickname.as_deref())
        .await?;

    tracing::info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(issue(&state, user)?).with_message("User registered successfully"),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: JsonBody<LoginRequest>,
) -> Result<ApiResponse<AuthResponse>> {
    let request = payload?.0;
    let email = required(request.email, "Email and password are required")?;
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("Email and password are required".to_string()))?;

    let user = state
        .repository
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !PasswordService::verify_password(&password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    Ok(ApiResponse::ok(issue(&state, user)?).with_message("Login successful"))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<ApiResponse<UserResponse>> {
    let user = state
        .repository
        .find_user_by_id(auth.id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(ApiResponse::ok(UserResponse::from(user)))
}
