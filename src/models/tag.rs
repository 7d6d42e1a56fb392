use serde::{Deserialize, Serialize};

use crate::constants::{MAX_TAG_NAME_LENGTH, MAX_TAG_SLUG_LENGTH};
use crate::error::{AppError, Result};

/// Recipe tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    /// Hex color, `#RRGGBB`
    pub color: String,
    pub slug: String,
}

/// Tag create payload (staff only)
#[derive(Debug, Deserialize)]
pub struct TagCreate {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Tag partial update payload (staff only)
#[derive(Debug, Default, Deserialize)]
pub struct TagUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub slug: Option<String>,
}

impl TagCreate {
    pub fn validate(&self) -> Result<()> {
        validate_tag_name(&self.name)?;
        validate_tag_color(&self.color)?;
        validate_tag_slug(&self.slug)
    }
}

impl TagUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_tag_name(name)?;
        }
        if let Some(color) = &self.color {
            validate_tag_color(color)?;
        }
        if let Some(slug) = &self.slug {
            validate_tag_slug(slug)?;
        }
        Ok(())
    }
}

impl Tag {
    /// `#` followed by exactly six hex digits
    pub fn is_valid_color(color: &str) -> bool {
        match color.strip_prefix('#') {
            Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }

    /// ASCII letters, digits, hyphens and underscores
    pub fn is_valid_slug(slug: &str) -> bool {
        !slug.is_empty()
            && slug.len() <= MAX_TAG_SLUG_LENGTH
            && slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Colors are stored upper-cased so `#ff0000` and `#FF0000` collide
    pub fn normalize_color(color: &str) -> String {
        color.to_ascii_uppercase()
    }
}

fn validate_tag_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.chars().count() > MAX_TAG_NAME_LENGTH {
        return Err(AppError::validation(
            "name",
            format!("Tag name must be 1 to {MAX_TAG_NAME_LENGTH} characters"),
        ));
    }
    Ok(())
}

fn validate_tag_color(color: &str) -> Result<()> {
    if !Tag::is_valid_color(color) {
        return Err(AppError::validation(
            "color",
            "Color must be a hex value like #E26C2D",
        ));
    }
    Ok(())
}

fn validate_tag_slug(slug: &str) -> Result<()> {
    if !Tag::is_valid_slug(slug) {
        return Err(AppError::validation(
            "slug",
            "Slug may contain only latin letters, digits, hyphens and underscores",
        ));
    }
    Ok(())
}
