use sqlx::SqliteConnection;

use super::tables::RecipeMark;
use crate::error::{is_unique_violation, AppError, Result};

pub async fn is_marked(
    conn: &mut SqliteConnection,
    mark: RecipeMark,
    user_id: i64,
    recipe_id: i64,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = ? AND recipe_id = ?",
        mark.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

/// Add a favorite or cart entry
///
/// The pair is checked before insert; the UNIQUE constraint catches the
/// remaining race between concurrent adds.
pub async fn add_mark(
    conn: &mut SqliteConnection,
    mark: RecipeMark,
    user_id: i64,
    recipe_id: i64,
) -> Result<()> {
    if is_marked(conn, mark, user_id, recipe_id).await? {
        return Err(AppError::conflict("recipe", mark.already_exists_message()));
    }

    sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES (?, ?)",
        mark.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("recipe", mark.already_exists_message())
        } else {
            AppError::Database(e)
        }
    })?;

    Ok(())
}

/// Returns false when the pair was not present
pub async fn remove_mark(
    conn: &mut SqliteConnection,
    mark: RecipeMark,
    user_id: i64,
    recipe_id: i64,
) -> Result<bool> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
        mark.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
