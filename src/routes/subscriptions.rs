use axum::{extract::State, http::StatusCode, Json};
use sqlx::SqliteConnection;

use crate::auth::AuthUser;
use crate::constants::{ERR_SELF_FOLLOW, SUBSCRIPTION_RECIPES_PREVIEW};
use crate::db;
use crate::error::{AppError, Result};
use crate::media::MediaStore;
use crate::models::{Subscription, User};
use crate::pagination::{Page, PageRequest};
use crate::routes::recipes::short_recipe;
use crate::routes::validation::{AppPath, QueryParams};
use crate::AppState;

/// `recipes_limit` query parameter; must not be negative
fn recipes_limit(params: &QueryParams) -> Result<Option<i64>> {
    match params.get_i64("recipes_limit")? {
        Some(limit) if limit < 0 => Err(AppError::validation(
            "recipes_limit",
            "Ensure this value is greater than or equal to 0",
        )),
        limit => Ok(limit),
    }
}

/// Author profile plus their newest recipes, capped at `limit` when given
async fn subscription_view(
    conn: &mut SqliteConnection,
    media: &MediaStore,
    author: &User,
    viewer_id: i64,
    limit: Option<i64>,
) -> Result<Subscription> {
    let profile = db::users::profile(conn, author, Some(viewer_id)).await?;
    let recipes = db::recipes::recipes_by_author(conn, author.id, limit).await?;
    let recipes_count = db::recipes::count_by_author(conn, author.id).await?;

    Ok(Subscription {
        author: profile,
        recipes: recipes.iter().map(|row| short_recipe(media, row)).collect(),
        recipes_count,
    })
}

/// Authors the requester follows, most recent subscription first
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    params: QueryParams,
) -> Result<Json<Page<Subscription>>> {
    let limit = recipes_limit(&params)?.unwrap_or(SUBSCRIPTION_RECIPES_PREVIEW);
    let request = PageRequest::from_query(
        &params,
        state.config.subscriptions_page_size,
        state.config.max_page_size,
    )?;

    let mut conn = state.pool.acquire().await?;
    let count = db::follows::count_followed_authors(&mut conn, user.id).await?;
    request.ensure_in_range(count)?;

    let authors =
        db::follows::list_followed_authors(&mut conn, user.id, request.limit(), request.offset())
            .await?;
    let mut results = Vec::with_capacity(authors.len());
    for author in &authors {
        let view =
            subscription_view(&mut conn, &state.media, author, user.id, Some(limit)).await?;
        results.push(view);
    }

    Ok(Json(Page::new(request, count, results, &params)))
}

/// Follow an author
///
/// Following yourself is rejected before the target is even looked up.
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(author_id): AppPath<i64>,
    params: QueryParams,
) -> Result<(StatusCode, Json<Subscription>)> {
    if author_id == user.id {
        return Err(AppError::validation("author", ERR_SELF_FOLLOW));
    }
    let limit = recipes_limit(&params)?;

    let mut conn = state.pool.acquire().await?;
    let author = db::users::find_by_id(&mut conn, author_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    db::follows::add_follow(&mut conn, user.id, author.id).await?;
    tracing::info!("User {} subscribed to user {}", user.id, author.id);

    let view = subscription_view(&mut conn, &state.media, &author, user.id, limit).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(author_id): AppPath<i64>,
) -> Result<StatusCode> {
    let mut conn = state.pool.acquire().await?;
    db::users::find_by_id(&mut conn, author_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if !db::follows::remove_follow(&mut conn, user.id, author_id).await? {
        return Err(AppError::NotFound("Subscription"));
    }

    tracing::info!("User {} unsubscribed from user {}", user.id, author_id);
    Ok(StatusCode::NO_CONTENT)
}
