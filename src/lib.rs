//! Foodgram recipe-sharing backend library
//!
//! This module exports the core types and functions for the server binary,
//! the `manage` tool and the integration tests.

pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod security;

pub use config::Config;
pub use db::{open_database, Db};
pub use error::{AppError, Result};
pub use media::MediaStore;
pub use routes::router;
pub use security::PasswordHasher;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: Db,
    pub config: Config,
    pub media: MediaStore,
    pub hasher: PasswordHasher,
}

impl AppState {
    /// Create a new AppState with the given database and configuration
    pub fn new(pool: Db, config: Config) -> Self {
        let media = MediaStore::new(config.media_root.clone(), config.media_url.clone());
        let hasher = PasswordHasher::new(config.insecure_password_hashing);
        Self {
            pool,
            config,
            media,
            hasher,
        }
    }
}
