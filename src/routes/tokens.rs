use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{AuthUser, SessionToken};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{LoginRequest, LoginResponse};
use crate::routes::validation::AppJson;
use crate::security::{generate_token, hash_token};
use crate::AppState;

/// Exchange email and password for an API token
///
/// Unknown email and wrong password produce the same error. The plain token
/// is returned once; only its SHA-256 is stored.
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let mut conn = state.pool.acquire().await?;
    let Some(user) = db::users::find_by_email(&mut conn, payload.email.trim()).await? else {
        tracing::warn!("Login attempt for unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let matches = state
        .hasher
        .verify_blocking(payload.password, user.password_hash.clone())
        .await?;
    if !matches {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(AppError::InvalidCredentials);
    }

    let token = generate_token();
    db::users::insert_token(&mut conn, &hash_token(&token), user.id).await?;

    tracing::info!("Issued API token for user {}", user.id);
    Ok(Json(LoginResponse { auth_token: token }))
}

/// Revoke the token presented with this request
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    SessionToken(token_hash): SessionToken,
) -> Result<StatusCode> {
    let mut conn = state.pool.acquire().await?;
    db::users::delete_token(&mut conn, &token_hash).await?;

    tracing::info!("Revoked API token for user {}", user.id);
    Ok(StatusCode::NO_CONTENT)
}
