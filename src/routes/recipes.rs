use axum::{extract::State, http::StatusCode, Json};
use sqlx::SqliteConnection;

use crate::auth::{AuthUser, OptionalUser};
use crate::db::{self, recipes::RecipeFilter, tables::RecipeMark};
use crate::error::{AppError, Result};
use crate::media::MediaStore;
use crate::models::{
    RecipeCreate, RecipeFields, RecipeRead, RecipeRow, RecipeUpdate, ShortRecipe, User,
};
use crate::pagination::{Page, PageRequest};
use crate::routes::validation::{AppJson, AppPath, QueryParams};
use crate::AppState;

// =============================================================================
// Read models
// =============================================================================

/// Assemble the full read representation of a recipe for `viewer_id`
pub(crate) async fn recipe_read(
    conn: &mut SqliteConnection,
    media: &MediaStore,
    row: RecipeRow,
    viewer_id: Option<i64>,
) -> Result<RecipeRead> {
    let author = db::users::find_by_id(conn, row.author_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let author = db::users::profile(conn, &author, viewer_id).await?;

    let tags = db::tags::tags_for_recipe(conn, row.id).await?;
    let ingredients = db::recipes::ingredients_for_recipe(conn, row.id).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer_id {
        Some(user_id) => (
            db::marks::is_marked(conn, RecipeMark::Favorite, user_id, row.id).await?,
            db::marks::is_marked(conn, RecipeMark::Cart, user_id, row.id).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeRead {
        id: row.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        image: media.url_for(&row.image),
        name: row.name,
        text: row.text,
        cooking_time: row.cooking_time,
    })
}

pub(crate) fn short_recipe(media: &MediaStore, row: &RecipeRow) -> ShortRecipe {
    ShortRecipe {
        id: row.id,
        name: row.name.clone(),
        image: media.url_for(&row.image),
        cooking_time: row.cooking_time,
    }
}

pub(crate) async fn find_recipe(conn: &mut SqliteConnection, id: i64) -> Result<RecipeRow> {
    db::recipes::get_recipe(conn, id)
        .await?
        .ok_or(AppError::NotFound("Recipe"))
}

fn ensure_author(user: &User, recipe: &RecipeRow) -> Result<()> {
    if recipe.author_id != user.id {
        tracing::warn!(
            "User {} attempted to modify recipe {} owned by {}",
            user.id,
            recipe.id,
            recipe.author_id
        );
        return Err(AppError::PermissionDenied(
            "Only the author may modify this recipe",
        ));
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Paginated recipe list, newest first
///
/// Filters: `tags` (repeatable slug, any match), `author`, `is_favorited`
/// and `is_in_shopping_cart`. The two flags only narrow the list for an
/// authenticated requester.
pub async fn list_recipes(
    State(state): State<AppState>,
    viewer: OptionalUser,
    params: QueryParams,
) -> Result<Json<Page<RecipeRead>>> {
    let viewer_id = viewer.id();

    let mut filter = RecipeFilter {
        tag_slugs: params.get_all("tags"),
        author_id: params.get_i64("author")?,
        ..RecipeFilter::default()
    };
    if params.get_bool("is_favorited")? == Some(true) {
        filter.favorited_by = viewer_id;
    }
    if params.get_bool("is_in_shopping_cart")? == Some(true) {
        filter.in_cart_of = viewer_id;
    }

    let request = PageRequest::from_query(
        &params,
        state.config.recipes_page_size,
        state.config.max_page_size,
    )?;

    let mut conn = state.pool.acquire().await?;
    let count = db::recipes::count_recipes(&mut conn, &filter).await?;
    request.ensure_in_range(count)?;

    let rows =
        db::recipes::list_recipes(&mut conn, &filter, request.limit(), request.offset()).await?;
    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        results.push(recipe_read(&mut conn, &state.media, row, viewer_id).await?);
    }

    Ok(Json(Page::new(request, count, results, &params)))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    viewer: OptionalUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<RecipeRead>> {
    let mut conn = state.pool.acquire().await?;
    let row = find_recipe(&mut conn, id).await?;
    Ok(Json(recipe_read(&mut conn, &state.media, row, viewer.id()).await?))
}

/// Create a recipe authored by the requester
///
/// Ingredient lines and tag links are written in the same transaction as the
/// recipe row.
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<RecipeCreate>,
) -> Result<(StatusCode, Json<RecipeRead>)> {
    payload.validate()?;

    let image = state.media.save_data_url(&payload.image).await?;
    let fields = RecipeFields {
        name: payload.name,
        text: payload.text,
        image,
        cooking_time: payload.cooking_time,
    };

    let mut tx = db::begin_write(&state.pool).await?;
    let id = db::recipes::create_recipe(&mut tx, user.id, &fields, &payload.composition).await?;
    let row = find_recipe(&mut tx, id).await?;
    let recipe = recipe_read(&mut tx, &state.media, row, Some(user.id)).await?;
    tx.commit().await?;

    tracing::info!("Recipe {} created by user {}", id, user.id);
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// Update a recipe; only its author may do so
///
/// `ingredients` and `tags` replace the stored sets; absent scalar fields keep
/// their stored values. A new image is stored before the write transaction
/// opens, and authorship is checked again inside it.
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<RecipeUpdate>,
) -> Result<Json<RecipeRead>> {
    {
        let mut conn = state.pool.acquire().await?;
        let current = find_recipe(&mut conn, id).await?;
        ensure_author(&user, &current)?;
    }
    payload.validate()?;

    let new_image = match &payload.image {
        Some(data_url) => Some(state.media.save_data_url(data_url).await?),
        None => None,
    };

    let mut tx = db::begin_write(&state.pool).await?;
    let current = find_recipe(&mut tx, id).await?;
    ensure_author(&user, &current)?;

    let fields = RecipeFields {
        name: payload.name.unwrap_or(current.name),
        text: payload.text.unwrap_or(current.text),
        image: new_image.unwrap_or(current.image),
        cooking_time: payload.cooking_time.unwrap_or(current.cooking_time),
    };

    db::recipes::update_recipe(&mut tx, id, &fields, &payload.composition).await?;
    let row = find_recipe(&mut tx, id).await?;
    let recipe = recipe_read(&mut tx, &state.media, row, Some(user.id)).await?;
    tx.commit().await?;

    tracing::info!("Recipe {} updated by user {}", id, user.id);
    Ok(Json(recipe))
}

/// Delete a recipe; only its author may do so
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode> {
    let mut conn = state.pool.acquire().await?;
    let recipe = find_recipe(&mut conn, id).await?;
    ensure_author(&user, &recipe)?;

    db::recipes::delete_recipe(&mut conn, id).await?;

    tracing::info!("Recipe {} deleted by user {}", id, user.id);
    Ok(StatusCode::NO_CONTENT)
}
