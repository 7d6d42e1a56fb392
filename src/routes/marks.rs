use axum::{extract::State, http::StatusCode, Json};

use crate::auth::AuthUser;
use crate::db::{self, tables::RecipeMark};
use crate::error::{AppError, Result};
use crate::models::ShortRecipe;
use crate::routes::recipes::{find_recipe, short_recipe};
use crate::routes::validation::AppPath;
use crate::AppState;

pub async fn add_favorite(
    state: State<AppState>,
    user: AuthUser,
    id: AppPath<i64>,
) -> Result<(StatusCode, Json<ShortRecipe>)> {
    add_mark(state, user, id, RecipeMark::Favorite).await
}

pub async fn remove_favorite(
    state: State<AppState>,
    user: AuthUser,
    id: AppPath<i64>,
) -> Result<StatusCode> {
    remove_mark(state, user, id, RecipeMark::Favorite).await
}

pub async fn add_to_cart(
    state: State<AppState>,
    user: AuthUser,
    id: AppPath<i64>,
) -> Result<(StatusCode, Json<ShortRecipe>)> {
    add_mark(state, user, id, RecipeMark::Cart).await
}

pub async fn remove_from_cart(
    state: State<AppState>,
    user: AuthUser,
    id: AppPath<i64>,
) -> Result<StatusCode> {
    remove_mark(state, user, id, RecipeMark::Cart).await
}

/// 404 for a missing recipe, 400 when the pair already exists, otherwise 201
/// with the short recipe view
async fn add_mark(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(recipe_id): AppPath<i64>,
    mark: RecipeMark,
) -> Result<(StatusCode, Json<ShortRecipe>)> {
    let mut conn = state.pool.acquire().await?;
    let recipe = find_recipe(&mut conn, recipe_id).await?;

    db::marks::add_mark(&mut conn, mark, user.id, recipe_id).await?;

    tracing::info!("User {} added recipe {} to {}", user.id, recipe_id, mark.table());
    Ok((StatusCode::CREATED, Json(short_recipe(&state.media, &recipe))))
}

/// 404 when the recipe or the pair is absent, otherwise 204
async fn remove_mark(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(recipe_id): AppPath<i64>,
    mark: RecipeMark,
) -> Result<StatusCode> {
    let mut conn = state.pool.acquire().await?;
    find_recipe(&mut conn, recipe_id).await?;

    if !db::marks::remove_mark(&mut conn, mark, user.id, recipe_id).await? {
        return Err(AppError::NotFound(mark.not_found_label()));
    }

    tracing::info!("User {} removed recipe {} from {}", user.id, recipe_id, mark.table());
    Ok(StatusCode::NO_CONTENT)
}
