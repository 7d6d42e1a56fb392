use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::{is_unique_violation, AppError, Result};
use crate::models::{SignupRequest, User, UserFields, UserProfile};

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, password_hash, is_staff, created_at";

/// Insert a new user; duplicate email or username is a conflict on that field
pub async fn insert_user(
    conn: &mut SqliteConnection,
    request: &SignupRequest,
    password_hash: &str,
) -> Result<User> {
    if exists_with(conn, "email", &request.email).await? {
        return Err(AppError::conflict("email", "A user with that email already exists"));
    }
    if exists_with(conn, "username", &request.username).await? {
        return Err(AppError::conflict(
            "username",
            "A user with that username already exists",
        ));
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, username, first_name, last_name, password_hash, is_staff, created_at)
         VALUES (?, ?, ?, ?, ?, 0, ?)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&request.email)
    .bind(&request.username)
    .bind(&request.first_name)
    .bind(&request.last_name)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            // Lost a race with a concurrent signup
            let field = if e.to_string().contains("users.email") {
                "email"
            } else {
                "username"
            };
            AppError::conflict(field, format!("A user with that {field} already exists"))
        } else {
            AppError::Database(e)
        }
    })?;

    Ok(user)
}

async fn exists_with(conn: &mut SqliteConnection, column: &str, value: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {column} = ?"))
        .bind(value)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

pub async fn find_by_email(conn: &mut SqliteConnection, email: &str) -> Result<Option<User>> {
    let user =
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(user)
}

/// Resolve an API token (by its SHA-256) to its user
pub async fn find_by_token(conn: &mut SqliteConnection, token_hash: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.password_hash,
                u.is_staff, u.created_at
         FROM auth_tokens t
         JOIN users u ON u.id = t.user_id
         WHERE t.token_hash = ?",
    )
    .bind(token_hash)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

pub async fn insert_token(
    conn: &mut SqliteConnection,
    token_hash: &str,
    user_id: i64,
) -> Result<()> {
    sqlx::query("INSERT INTO auth_tokens (token_hash, user_id, created_at) VALUES (?, ?, ?)")
        .bind(token_hash)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_token(conn: &mut SqliteConnection, token_hash: &str) -> Result<()> {
    sqlx::query("DELETE FROM auth_tokens WHERE token_hash = ?")
        .bind(token_hash)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_password(
    conn: &mut SqliteConnection,
    user_id: i64,
    password_hash: &str,
) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Mark a user as staff; returns false when no user has that email
pub async fn grant_staff(conn: &mut SqliteConnection, email: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET is_staff = 1 WHERE email = ?")
        .bind(email)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_users(conn: &mut SqliteConnection) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Users ordered by username
pub async fn list_users(conn: &mut SqliteConnection, limit: i64, offset: i64) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY username ASC LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;
    Ok(users)
}

/// Public view of `user` for `viewer_id`
pub async fn profile(
    conn: &mut SqliteConnection,
    user: &User,
    viewer_id: Option<i64>,
) -> Result<UserProfile> {
    let is_subscribed = match viewer_id {
        Some(viewer_id) => super::follows::is_following(conn, viewer_id, user.id).await?,
        None => false,
    };

    Ok(UserProfile {
        fields: UserFields::from(user),
        is_subscribed,
    })
}
