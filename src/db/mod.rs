pub mod follows;
pub mod ingredients;
pub mod marks;
pub mod pool;
pub mod recipes;
pub mod shopping_list;
pub mod tables;
pub mod tags;
pub mod users;

use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;

use crate::error::Result;

/// Database handle type (the pool is internally reference counted)
pub type Db = SqlitePool;

/// Open or create the SQLite database at the given path
///
/// Applies all pending migrations before returning.
pub async fn open_database(path: impl AsRef<Path>) -> Result<Db> {
    let path = path.as_ref();
    tracing::info!("Opening database at: {:?}", path);

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!("Failed to create database directory: {}", e);
                e
            })?;
        }
    }

    let pool = pool::create_pool(path).await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database initialized successfully");

    Ok(pool)
}

/// Begin a transaction that holds the database write lock from the start
///
/// A deferred transaction that reads before it writes cannot wait for the
/// lock: when another connection commits first, SQLite fails the upgrade with
/// SQLITE_BUSY without calling the busy handler. Taking the lock with the
/// first statement queues concurrent writers on `busy_timeout` instead, the
/// same as `BEGIN IMMEDIATE`.
pub async fn begin_write(pool: &Db) -> Result<Transaction<'static, Sqlite>> {
    let mut tx = pool.begin().await?;
    // Any UPDATE takes the write lock, even one that matches no rows
    sqlx::query("UPDATE recipes SET id = id WHERE 0")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}
