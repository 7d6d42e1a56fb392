use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{require_staff, AuthUser};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{Tag, TagCreate, TagUpdate};
use crate::routes::validation::{AppJson, AppPath};
use crate::AppState;

/// All tags ordered by name (unpaginated)
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>> {
    let mut conn = state.pool.acquire().await?;
    Ok(Json(db::tags::list_tags(&mut conn).await?))
}

pub async fn get_tag(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Tag>> {
    let mut conn = state.pool.acquire().await?;
    let tag = db::tags::get_tag(&mut conn, id)
        .await?
        .ok_or(AppError::NotFound("Tag"))?;
    Ok(Json(tag))
}

pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<TagCreate>,
) -> Result<(StatusCode, Json<Tag>)> {
    require_staff(&user)?;
    payload.validate()?;

    let mut conn = state.pool.acquire().await?;
    let tag = db::tags::insert_tag(&mut conn, &payload).await?;

    tracing::info!("Tag {} created by user {}", tag.slug, user.id);
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update_tag(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<TagUpdate>,
) -> Result<Json<Tag>> {
    require_staff(&user)?;
    payload.validate()?;

    let mut conn = state.pool.acquire().await?;
    let tag = db::tags::update_tag(&mut conn, id, &payload)
        .await?
        .ok_or(AppError::NotFound("Tag"))?;

    tracing::info!("Tag {} updated by user {}", tag.id, user.id);
    Ok(Json(tag))
}

/// Removing a tag also unlinks it from every recipe
pub async fn delete_tag(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode> {
    require_staff(&user)?;

    let mut conn = state.pool.acquire().await?;
    if !db::tags::delete_tag(&mut conn, id).await? {
        return Err(AppError::NotFound("Tag"));
    }

    tracing::info!("Tag {} deleted by user {}", id, user.id);
    Ok(StatusCode::NO_CONTENT)
}
