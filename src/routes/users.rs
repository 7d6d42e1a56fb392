use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{AuthUser, OptionalUser};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::user::validate_password;
use crate::models::{SetPasswordRequest, SignupRequest, UserFields, UserProfile};
use crate::pagination::{Page, PageRequest};
use crate::routes::validation::{AppJson, AppPath, QueryParams};
use crate::AppState;

/// Register a new user
///
/// Returns 201 with the public fields of the new account. Duplicate email or
/// username is rejected with 400 naming the field.
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<UserFields>)> {
    payload.validate()?;

    let password_hash = state.hasher.hash_blocking(payload.password.clone()).await?;

    let mut conn = state.pool.acquire().await?;
    let user = db::users::insert_user(&mut conn, &payload, &password_hash).await?;

    tracing::info!("New user registered: {} (id {})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(UserFields::from(&user))))
}

/// Paginated user list, ordered by username
pub async fn list_users(
    State(state): State<AppState>,
    viewer: OptionalUser,
    params: QueryParams,
) -> Result<Json<Page<UserProfile>>> {
    let request = PageRequest::from_query(
        &params,
        state.config.recipes_page_size,
        state.config.max_page_size,
    )?;

    let mut conn = state.pool.acquire().await?;
    let count = db::users::count_users(&mut conn).await?;
    request.ensure_in_range(count)?;

    let users = db::users::list_users(&mut conn, request.limit(), request.offset()).await?;
    let mut results = Vec::with_capacity(users.len());
    for user in &users {
        results.push(db::users::profile(&mut conn, user, viewer.id()).await?);
    }

    Ok(Json(Page::new(request, count, results, &params)))
}

pub async fn get_user(
    State(state): State<AppState>,
    viewer: OptionalUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<UserProfile>> {
    let mut conn = state.pool.acquire().await?;
    let user = db::users::find_by_id(&mut conn, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(db::users::profile(&mut conn, &user, viewer.id()).await?))
}

/// The requesting user's own profile
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserProfile>> {
    let mut conn = state.pool.acquire().await?;
    Ok(Json(db::users::profile(&mut conn, &user, Some(user.id)).await?))
}

/// Change the requesting user's password
///
/// Existing tokens stay valid.
pub async fn set_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<SetPasswordRequest>,
) -> Result<StatusCode> {
    validate_password("new_password", &payload.new_password)?;

    let matches = state
        .hasher
        .verify_blocking(payload.current_password, user.password_hash.clone())
        .await?;
    if !matches {
        tracing::warn!("Wrong current password for user {}", user.id);
        return Err(AppError::validation(
            "current_password",
            "Current password is incorrect",
        ));
    }

    let password_hash = state.hasher.hash_blocking(payload.new_password).await?;
    let mut conn = state.pool.acquire().await?;
    db::users::update_password(&mut conn, user.id, &password_hash).await?;

    tracing::info!("Password changed for user {}", user.id);
    Ok(StatusCode::NO_CONTENT)
}
