use sqlx::SqliteConnection;

use crate::constants::{ERR_ALREADY_FOLLOWING, ERR_SELF_FOLLOW};
use crate::error::{is_unique_violation, AppError, Result};
use crate::models::User;

pub async fn is_following(
    conn: &mut SqliteConnection,
    user_id: i64,
    author_id: i64,
) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count > 0)
}

/// Subscribe `user_id` to `author_id`
///
/// Self-follow is rejected before anything else is checked.
pub async fn add_follow(conn: &mut SqliteConnection, user_id: i64, author_id: i64) -> Result<()> {
    if user_id == author_id {
        return Err(AppError::validation("author", ERR_SELF_FOLLOW));
    }
    if is_following(conn, user_id, author_id).await? {
        return Err(AppError::conflict("author", ERR_ALREADY_FOLLOWING));
    }

    sqlx::query("INSERT INTO follows (user_id, author_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(author_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict("author", ERR_ALREADY_FOLLOWING)
            } else {
                AppError::Database(e)
            }
        })?;

    Ok(())
}

/// Returns false when there was no such subscription
pub async fn remove_follow(
    conn: &mut SqliteConnection,
    user_id: i64,
    author_id: i64,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
        .bind(user_id)
        .bind(author_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_followed_authors(conn: &mut SqliteConnection, user_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Authors followed by `user_id`, most recent subscription first
pub async fn list_followed_authors(
    conn: &mut SqliteConnection,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<User>> {
    let authors = sqlx::query_as::<_, User>(
        "SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.password_hash,
                u.is_staff, u.created_at
         FROM follows f
         JOIN users u ON u.id = f.author_id
         WHERE f.user_id = ?
         ORDER BY f.id DESC
         LIMIT ? OFFSET ?",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;
    Ok(authors)
}
