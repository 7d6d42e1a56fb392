use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_EMAIL_LENGTH, MAX_USER_NAME_LENGTH, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, Result};

/// User row as stored in the `users` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// Public fields shared by every user representation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFields {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserFields {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// User as seen by another (possibly anonymous) user
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub fields: UserFields,
    pub is_subscribed: bool,
}

/// Registration payload
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl SignupRequest {
    /// Validate all fields, reporting the first offending one
    pub fn validate(&self) -> Result<()> {
        if !User::validate_email(&self.email) {
            return Err(AppError::validation("email", "Enter a valid email address"));
        }
        if !User::validate_username(&self.username) {
            return Err(AppError::validation(
                "username",
                "Username may contain only letters, digits and @/./+/-/_ (150 characters max)",
            ));
        }
        validate_name("first_name", &self.first_name)?;
        validate_name("last_name", &self.last_name)?;
        validate_password("password", &self.password)?;
        Ok(())
    }
}

/// Password change payload
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Token login payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub auth_token: String,
}

impl User {
    /// Minimal shape check: non-empty local part and domain around a single `@`
    pub fn validate_email(email: &str) -> bool {
        if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
            return false;
        }
        match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        }
    }

    /// Letters, digits and `@ . + - _`, at most 150 characters
    pub fn validate_username(username: &str) -> bool {
        !username.is_empty()
            && username.chars().count() <= MAX_USER_NAME_LENGTH
            && username
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    }
}

fn validate_name(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, "This field may not be blank"));
    }
    if value.chars().count() > MAX_USER_NAME_LENGTH {
        return Err(AppError::validation(
            field,
            format!("Ensure this field has no more than {MAX_USER_NAME_LENGTH} characters"),
        ));
    }
    Ok(())
}

pub fn validate_password(field: &'static str, password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(
            field,
            format!("Password must contain at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    Ok(())
}
