use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::*;
use crate::error::{AppError, Result};
use crate::models::{Tag, UserProfile};

/// Recipe row as stored in the `recipes` table
///
/// `image` is the path relative to the media root.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i64,
    pub pub_date: DateTime<Utc>,
}

/// Ingredient line of a recipe, joined with the ingredient reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct IngredientAmount {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Ingredient line as submitted by a client: reference id plus amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmountWrite {
    pub id: i64,
    pub amount: i64,
}

/// Full recipe representation returned by reads and writes
#[derive(Debug, Clone, Serialize)]
pub struct RecipeRead {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<IngredientAmount>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

/// Shortened recipe used by favorites, cart and subscriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortRecipe {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

/// Ingredient and tag sets; replaced as a whole on every write
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeComposition {
    pub ingredients: Vec<IngredientAmountWrite>,
    pub tags: Vec<i64>,
}

/// Recipe create payload
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeCreate {
    #[serde(flatten)]
    pub composition: RecipeComposition,
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
}

/// Recipe update payload; absent scalar fields keep their stored values
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeUpdate {
    #[serde(flatten)]
    pub composition: RecipeComposition,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

/// Scalar recipe columns after validation and image storage
#[derive(Debug, Clone)]
pub struct RecipeFields {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i64,
}

impl RecipeComposition {
    /// Tag and ingredient rules that need no database access
    ///
    /// Existence of the referenced rows is checked inside the write
    /// transaction.
    pub fn validate(&self) -> Result<()> {
        if self.tags.is_empty() {
            return Err(AppError::validation("tags", ERR_TAGS_REQUIRED));
        }
        let mut seen = HashSet::with_capacity(self.tags.len());
        if !self.tags.iter().all(|id| seen.insert(*id)) {
            return Err(AppError::validation("tags", ERR_TAGS_NOT_UNIQUE));
        }

        if self.ingredients.is_empty() {
            return Err(AppError::validation("ingredients", ERR_INGREDIENTS_REQUIRED));
        }
        let mut seen = HashSet::with_capacity(self.ingredients.len());
        for line in &self.ingredients {
            if !seen.insert(line.id) {
                return Err(AppError::validation("ingredients", ERR_INGREDIENTS_NOT_UNIQUE));
            }
            if !(MIN_INGREDIENT_AMOUNT..=MAX_INGREDIENT_AMOUNT).contains(&line.amount) {
                return Err(AppError::validation("ingredients", ERR_AMOUNT_OUT_OF_RANGE));
            }
        }

        Ok(())
    }

    pub fn ingredient_ids(&self) -> Vec<i64> {
        self.ingredients.iter().map(|line| line.id).collect()
    }
}

impl RecipeCreate {
    pub fn validate(&self) -> Result<()> {
        validate_recipe_name(&self.name)?;
        validate_recipe_text(&self.text)?;
        validate_cooking_time(self.cooking_time)?;
        if self.image.trim().is_empty() {
            return Err(AppError::validation("image", "An image is required"));
        }
        self.composition.validate()
    }
}

impl RecipeUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_recipe_name(name)?;
        }
        if let Some(text) = &self.text {
            validate_recipe_text(text)?;
        }
        if let Some(cooking_time) = self.cooking_time {
            validate_cooking_time(cooking_time)?;
        }
        self.composition.validate()
    }
}

fn validate_recipe_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.chars().count() > MAX_RECIPE_NAME_LENGTH {
        return Err(AppError::validation(
            "name",
            format!("Recipe name must be 1 to {MAX_RECIPE_NAME_LENGTH} characters"),
        ));
    }
    Ok(())
}

fn validate_recipe_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::validation("text", "This field may not be blank"));
    }
    Ok(())
}

fn validate_cooking_time(cooking_time: i64) -> Result<()> {
    if cooking_time < MIN_COOKING_TIME {
        return Err(AppError::validation("cooking_time", ERR_COOKING_TIME));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composition(ingredients: &[(i64, i64)], tags: &[i64]) -> RecipeComposition {
        RecipeComposition {
            ingredients: ingredients
                .iter()
                .map(|&(id, amount)| IngredientAmountWrite { id, amount })
                .collect(),
            tags: tags.to_vec(),
        }
    }

    fn field_of(result: Result<()>) -> &'static str {
        match result {
            Err(AppError::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_composition() {
        assert!(composition(&[(1, 200), (2, 1)], &[1, 2]).validate().is_ok());
    }

    #[test]
    fn test_empty_tags_rejected() {
        assert_eq!(field_of(composition(&[(1, 200)], &[]).validate()), "tags");
    }

    #[test]
    fn test_duplicate_tags_rejected() {
        assert_eq!(
            field_of(composition(&[(1, 200)], &[3, 3]).validate()),
            "tags"
        );
    }

    #[test]
    fn test_duplicate_ingredients_rejected() {
        assert_eq!(
            field_of(composition(&[(1, 200), (1, 5)], &[1]).validate()),
            "ingredients"
        );
    }

    #[test]
    fn test_empty_ingredients_rejected() {
        assert_eq!(field_of(composition(&[], &[1]).validate()), "ingredients");
    }

    #[test]
    fn test_amount_bounds() {
        assert!(composition(&[(1, 1)], &[1]).validate().is_ok());
        assert!(composition(&[(1, 10_000)], &[1]).validate().is_ok());
        assert_eq!(
            field_of(composition(&[(1, 0)], &[1]).validate()),
            "ingredients"
        );
        assert_eq!(
            field_of(composition(&[(1, 10_001)], &[1]).validate()),
            "ingredients"
        );
        assert_eq!(
            field_of(composition(&[(1, -5)], &[1]).validate()),
            "ingredients"
        );
    }

    #[test]
    fn test_create_validation() {
        let create = RecipeCreate {
            composition: composition(&[(1, 100)], &[1]),
            image: "data:image/png;base64,AAAA".to_string(),
            name: "Pancakes".to_string(),
            text: "Mix and fry.".to_string(),
            cooking_time: 0,
        };
        assert_eq!(field_of(create.validate()), "cooking_time");

        let create = RecipeCreate {
            cooking_time: 1,
            ..create
        };
        assert!(create.validate().is_ok());

        let create = RecipeCreate {
            name: "x".repeat(201),
            ..create
        };
        assert_eq!(field_of(create.validate()), "name");
    }

    #[test]
    fn test_update_keeps_optional_fields_optional() {
        let update = RecipeUpdate {
            composition: composition(&[(1, 100)], &[1]),
            image: None,
            name: None,
            text: None,
            cooking_time: None,
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_create_payload_deserializes_flat() {
        let create: RecipeCreate = serde_json::from_value(serde_json::json!({
            "ingredients": [{ "id": 1, "amount": 10 }],
            "tags": [1, 2],
            "image": "data:image/png;base64,AAAA",
            "name": "Soup",
            "text": "Boil.",
            "cooking_time": 30
        }))
        .unwrap();

        assert_eq!(create.composition.tags, vec![1, 2]);
        assert_eq!(create.composition.ingredient_ids(), vec![1]);
        assert_eq!(create.cooking_time, 30);
    }
}
