use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: String,
    pub media_root: String,
    pub media_url: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub recipes_page_size: u32,
    pub subscriptions_page_size: u32,
    pub max_page_size: u32,
    /// Use cheap Argon2 parameters (dev/test only)
    pub insecure_password_hashing: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/foodgram.db".to_string());

        let media_root = env::var("MEDIA_ROOT").unwrap_or_else(|_| "./data/media".to_string());
        let media_url = env::var("MEDIA_URL")
            .unwrap_or_else(|_| "/media".to_string())
            .trim_end_matches('/')
            .to_string();

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let recipes_page_size = parse_page_size("RECIPES_PAGE_SIZE", "6")?;
        let subscriptions_page_size = parse_page_size("SUBSCRIPTIONS_PAGE_SIZE", "10")?;
        let max_page_size = parse_page_size("MAX_PAGE_SIZE", "100")?;

        let insecure_password_hashing = env::var("INSECURE_PASSWORD_HASHING").is_ok();

        Ok(Config {
            server_host,
            server_port,
            database_path,
            media_root,
            media_url,
            allowed_origins,
            environment,
            recipes_page_size,
            subscriptions_page_size,
            max_page_size,
            insecure_password_hashing,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_page_size(var: &str, default: &str) -> Result<u32, String> {
    let value: u32 = env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| format!("Invalid {var}"))?;

    if value == 0 {
        return Err(format!("{var} must be at least 1"));
    }

    Ok(value)
}
