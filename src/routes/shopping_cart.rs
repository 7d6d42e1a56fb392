use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::auth::AuthUser;
use crate::constants::SHOPPING_LIST_FILENAME;
use crate::db;
use crate::error::Result;
use crate::models::render_shopping_list;
use crate::AppState;

/// Download the requester's aggregated shopping list as a text attachment
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Response> {
    let mut conn = state.pool.acquire().await?;
    let items = db::shopping_list::aggregate_cart(&mut conn, user.id).await?;

    tracing::info!(
        "Shopping list for user {}: {} distinct ingredients",
        user.id,
        items.len()
    );

    let disposition = format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        render_shopping_list(&items),
    )
        .into_response())
}
