use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::error::{is_unique_violation, AppError, Result};
use crate::models::{Ingredient, IngredientCreate, IngredientUpdate};

/// Ingredients whose name starts with `prefix` (ASCII case-insensitive), by name
pub async fn search(conn: &mut SqliteConnection, prefix: Option<&str>) -> Result<Vec<Ingredient>> {
    let ingredients = match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => {
            sqlx::query_as::<_, Ingredient>(
                "SELECT id, name, measurement_unit FROM ingredients
                 WHERE name LIKE ? ESCAPE '\\'
                 ORDER BY name ASC, id ASC",
            )
            .bind(format!("{}%", escape_like(prefix)))
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, Ingredient>(
                "SELECT id, name, measurement_unit FROM ingredients ORDER BY name ASC, id ASC",
            )
            .fetch_all(&mut *conn)
            .await?
        }
    };
    Ok(ingredients)
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn get_ingredient(conn: &mut SqliteConnection, id: i64) -> Result<Option<Ingredient>> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(ingredient)
}

pub async fn insert_ingredient(
    conn: &mut SqliteConnection,
    ingredient: &IngredientCreate,
) -> Result<Ingredient> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        "INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)
         RETURNING id, name, measurement_unit",
    )
    .bind(ingredient.name.trim())
    .bind(ingredient.measurement_unit.trim())
    .fetch_one(&mut *conn)
    .await
    .map_err(ingredient_conflict)?;
    Ok(ingredient)
}

pub async fn update_ingredient(
    conn: &mut SqliteConnection,
    id: i64,
    update: &IngredientUpdate,
) -> Result<Option<Ingredient>> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        "UPDATE ingredients
         SET name = COALESCE(?, name), measurement_unit = COALESCE(?, measurement_unit)
         WHERE id = ?
         RETURNING id, name, measurement_unit",
    )
    .bind(update.name.as_deref().map(str::trim))
    .bind(update.measurement_unit.as_deref().map(str::trim))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(ingredient_conflict)?;
    Ok(ingredient)
}

/// Deleting an ingredient removes it from every recipe that used it
pub async fn delete_ingredient(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM ingredients WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Fails with a validation error naming the first id that has no ingredient
pub async fn ensure_ingredients_exist(conn: &mut SqliteConnection, ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id FROM ingredients WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: Vec<i64> = query.build_query_scalar().fetch_all(&mut *conn).await?;
    if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
        return Err(AppError::validation(
            "ingredients",
            format!("Ingredient {missing} does not exist"),
        ));
    }
    Ok(())
}

/// Counts reported by the reference data loader
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub created: u64,
    pub skipped: u64,
}

/// Insert each (name, unit) pair unless it is already present
pub async fn load_reference_data(
    conn: &mut SqliteConnection,
    records: &[IngredientCreate],
) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();
    for record in records {
        let result = sqlx::query(
            "INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)
             ON CONFLICT (name, measurement_unit) DO NOTHING",
        )
        .bind(record.name.trim())
        .bind(record.measurement_unit.trim())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            summary.created += 1;
        } else {
            summary.skipped += 1;
        }
    }
    Ok(summary)
}

fn ingredient_conflict(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::conflict(
            "name",
            "An ingredient with this name and measurement unit already exists",
        )
    } else {
        AppError::Database(err)
    }
}
