use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{require_staff, AuthUser};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{Ingredient, IngredientCreate, IngredientUpdate};
use crate::routes::validation::{AppJson, AppPath, QueryParams};
use crate::AppState;

/// Ingredients ordered by name, optionally narrowed by `?name=<prefix>`
pub async fn list_ingredients(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<Json<Vec<Ingredient>>> {
    let mut conn = state.pool.acquire().await?;
    Ok(Json(db::ingredients::search(&mut conn, params.get("name")).await?))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Ingredient>> {
    let mut conn = state.pool.acquire().await?;
    let ingredient = db::ingredients::get_ingredient(&mut conn, id)
        .await?
        .ok_or(AppError::NotFound("Ingredient"))?;
    Ok(Json(ingredient))
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<IngredientCreate>,
) -> Result<(StatusCode, Json<Ingredient>)> {
    require_staff(&user)?;
    payload.validate()?;

    let mut conn = state.pool.acquire().await?;
    let ingredient = db::ingredients::insert_ingredient(&mut conn, &payload).await?;

    tracing::info!("Ingredient {} created by user {}", ingredient.id, user.id);
    Ok((StatusCode::CREATED, Json(ingredient)))
}

pub async fn update_ingredient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<IngredientUpdate>,
) -> Result<Json<Ingredient>> {
    require_staff(&user)?;
    payload.validate()?;

    let mut conn = state.pool.acquire().await?;
    let ingredient = db::ingredients::update_ingredient(&mut conn, id, &payload)
        .await?
        .ok_or(AppError::NotFound("Ingredient"))?;

    tracing::info!("Ingredient {} updated by user {}", id, user.id);
    Ok(Json(ingredient))
}

pub async fn delete_ingredient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode> {
    require_staff(&user)?;

    let mut conn = state.pool.acquire().await?;
    if !db::ingredients::delete_ingredient(&mut conn, id).await? {
        return Err(AppError::NotFound("Ingredient"));
    }

    tracing::info!("Ingredient {} deleted by user {}", id, user.id);
    Ok(StatusCode::NO_CONTENT)
}
