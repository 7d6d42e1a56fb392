use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
};

use crate::db;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::security::hash_token;
use crate::AppState;

/// The authenticated user; rejects anonymous requests with 401
///
/// ```ignore
/// async fn handler(AuthUser(user): AuthUser) -> Result<Json<..>> { .. }
/// ```
pub struct AuthUser(pub User);

/// The requesting user, if any credentials were presented
///
/// Credentials that are present but invalid still reject with 401.
pub struct OptionalUser(pub Option<User>);

/// SHA-256 of the presented token, for logout
pub struct SessionToken(pub String);

impl OptionalUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(OptionalUser(None));
        };

        let token_hash = hash_token(parse_authorization(value)?);
        let mut conn = state.pool.acquire().await?;
        match db::users::find_by_token(&mut conn, &token_hash).await? {
            Some(user) => Ok(OptionalUser(Some(user))),
            None => {
                tracing::warn!("Rejected unknown API token");
                Err(AppError::Unauthorized("Invalid token"))
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        OptionalUser::from_request_parts(parts, state)
            .await?
            .0
            .map(AuthUser)
            .ok_or(AppError::Unauthorized(
                "Authentication credentials were not provided",
            ))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthorized(
                "Authentication credentials were not provided",
            ))?;
        Ok(SessionToken(hash_token(parse_authorization(value)?)))
    }
}

/// Accepts `Token <key>` and `Bearer <key>`
fn parse_authorization(value: &HeaderValue) -> Result<&str> {
    let raw = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header"))?;

    let token = raw
        .strip_prefix("Token ")
        .or_else(|| raw.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::Unauthorized("Invalid Authorization header format"))?;

    if token.is_empty() {
        return Err(AppError::Unauthorized("Invalid Authorization header format"));
    }

    Ok(token)
}

/// Tag and ingredient management is reserved for staff
pub fn require_staff(user: &User) -> Result<()> {
    if !user.is_staff {
        tracing::warn!("User {} attempted a staff-only action", user.id);
        return Err(AppError::PermissionDenied(
            "Only staff members may manage reference data",
        ));
    }
    Ok(())
}
