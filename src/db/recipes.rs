use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::{ingredients, tags};
use crate::error::Result;
use crate::models::{IngredientAmount, RecipeComposition, RecipeFields, RecipeRow};

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.text, r.image, r.cooking_time, r.pub_date";

/// Listing filters; every field is optional and they combine with AND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Recipe carries any of these tag slugs
    pub tag_slugs: Vec<String>,
    pub author_id: Option<i64>,
    /// Only recipes this user has favorited
    pub favorited_by: Option<i64>,
    /// Only recipes in this user's cart
    pub in_cart_of: Option<i64>,
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &RecipeFilter) {
    query.push(" WHERE 1 = 1");

    if !filter.tag_slugs.is_empty() {
        query.push(
            " AND r.id IN (SELECT rt.recipe_id FROM recipe_tags rt
               JOIN tags t ON t.id = rt.tag_id WHERE t.slug IN (",
        );
        let mut separated = query.separated(", ");
        for slug in &filter.tag_slugs {
            separated.push_bind(slug.clone());
        }
        separated.push_unseparated("))");
    }

    if let Some(author_id) = filter.author_id {
        query.push(" AND r.author_id = ").push_bind(author_id);
    }

    if let Some(user_id) = filter.favorited_by {
        query
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    if let Some(user_id) = filter.in_cart_of {
        query
            .push(" AND EXISTS (SELECT 1 FROM carts c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

pub async fn count_recipes(conn: &mut SqliteConnection, filter: &RecipeFilter) -> Result<i64> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_filters(&mut query, filter);

    let count: i64 = query.build_query_scalar().fetch_one(&mut *conn).await?;
    Ok(count)
}

/// Filtered recipes, newest first
pub async fn list_recipes(
    conn: &mut SqliteConnection,
    filter: &RecipeFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<RecipeRow>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes r"));
    push_filters(&mut query, filter);
    query
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = query
        .build_query_as::<RecipeRow>()
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn get_recipe(conn: &mut SqliteConnection, id: i64) -> Result<Option<RecipeRow>> {
    let row = sqlx::query_as::<_, RecipeRow>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Insert a recipe with its ingredients and tags
///
/// Run inside a transaction: referenced tags and ingredients are checked
/// here and a failure must discard the recipe row.
pub async fn create_recipe(
    conn: &mut SqliteConnection,
    author_id: i64,
    fields: &RecipeFields,
    composition: &RecipeComposition,
) -> Result<i64> {
    ensure_references_exist(conn, composition).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO recipes (author_id, name, text, image, cooking_time, pub_date)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(author_id)
    .bind(fields.name.trim())
    .bind(&fields.text)
    .bind(&fields.image)
    .bind(fields.cooking_time)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    insert_composition(conn, id, composition).await?;

    Ok(id)
}

/// Overwrite scalar columns and replace the ingredient and tag sets
///
/// Run inside a transaction so readers never see the recipe between the
/// delete and the re-insert of its ingredient lines.
pub async fn update_recipe(
    conn: &mut SqliteConnection,
    id: i64,
    fields: &RecipeFields,
    composition: &RecipeComposition,
) -> Result<()> {
    ensure_references_exist(conn, composition).await?;

    sqlx::query(
        "UPDATE recipes SET name = ?, text = ?, image = ?, cooking_time = ? WHERE id = ?",
    )
    .bind(fields.name.trim())
    .bind(&fields.text)
    .bind(&fields.image)
    .bind(fields.cooking_time)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    insert_composition(conn, id, composition).await
}

async fn ensure_references_exist(
    conn: &mut SqliteConnection,
    composition: &RecipeComposition,
) -> Result<()> {
    tags::ensure_tags_exist(conn, &composition.tags).await?;
    ingredients::ensure_ingredients_exist(conn, &composition.ingredient_ids()).await
}

async fn insert_composition(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    composition: &RecipeComposition,
) -> Result<()> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query.push_values(&composition.ingredients, |mut row, line| {
        row.push_bind(recipe_id)
            .push_bind(line.id)
            .push_bind(line.amount);
    });
    query.build().execute(&mut *conn).await?;

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(&composition.tags, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    query.build().execute(&mut *conn).await?;

    Ok(())
}

/// Deletes the recipe; ingredient lines, tag links, favorites and cart
/// entries go with it through ON DELETE CASCADE
pub async fn delete_recipe(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Ingredient lines in insertion order
pub async fn ingredients_for_recipe(
    conn: &mut SqliteConnection,
    recipe_id: i64,
) -> Result<Vec<IngredientAmount>> {
    let lines = sqlx::query_as::<_, IngredientAmount>(
        "SELECT i.id, i.name, i.measurement_unit, ri.amount
         FROM recipe_ingredients ri
         JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = ?
         ORDER BY ri.id ASC",
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}

/// An author's recipes, newest first; `limit` of None returns all of them
pub async fn recipes_by_author(
    conn: &mut SqliteConnection,
    author_id: i64,
    limit: Option<i64>,
) -> Result<Vec<RecipeRow>> {
    // SQLite treats a negative LIMIT as no limit
    let rows = sqlx::query_as::<_, RecipeRow>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r
         WHERE r.author_id = ?
         ORDER BY r.pub_date DESC, r.id DESC
         LIMIT ?"
    ))
    .bind(author_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn count_by_author(conn: &mut SqliteConnection, author_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}
