use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::error::{is_unique_violation, AppError, Result};
use crate::models::{Tag, TagCreate, TagUpdate};

pub async fn list_tags(conn: &mut SqliteConnection) -> Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags ORDER BY name ASC")
        .fetch_all(&mut *conn)
        .await?;
    Ok(tags)
}

pub async fn get_tag(conn: &mut SqliteConnection, id: i64) -> Result<Option<Tag>> {
    let tag = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(tag)
}

pub async fn insert_tag(conn: &mut SqliteConnection, tag: &TagCreate) -> Result<Tag> {
    let tag = sqlx::query_as::<_, Tag>(
        "INSERT INTO tags (name, color, slug) VALUES (?, ?, ?)
         RETURNING id, name, color, slug",
    )
    .bind(tag.name.trim())
    .bind(Tag::normalize_color(&tag.color))
    .bind(&tag.slug)
    .fetch_one(&mut *conn)
    .await
    .map_err(tag_conflict)?;
    Ok(tag)
}

/// Apply a partial update; returns None when the tag does not exist
pub async fn update_tag(
    conn: &mut SqliteConnection,
    id: i64,
    update: &TagUpdate,
) -> Result<Option<Tag>> {
    let tag = sqlx::query_as::<_, Tag>(
        "UPDATE tags
         SET name = COALESCE(?, name), color = COALESCE(?, color), slug = COALESCE(?, slug)
         WHERE id = ?
         RETURNING id, name, color, slug",
    )
    .bind(update.name.as_deref().map(str::trim))
    .bind(update.color.as_deref().map(Tag::normalize_color))
    .bind(update.slug.as_deref())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(tag_conflict)?;
    Ok(tag)
}

/// Deleting a tag also unlinks it from every recipe
pub async fn delete_tag(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Tags attached to a recipe, ordered by name
pub async fn tags_for_recipe(conn: &mut SqliteConnection, recipe_id: i64) -> Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>(
        "SELECT t.id, t.name, t.color, t.slug
         FROM recipe_tags rt
         JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id = ?
         ORDER BY t.name ASC",
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(tags)
}

/// Fails with a validation error naming the first id that has no tag
pub async fn ensure_tags_exist(conn: &mut SqliteConnection, ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id FROM tags WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: Vec<i64> = query.build_query_scalar().fetch_all(&mut *conn).await?;
    if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
        return Err(AppError::validation(
            "tags",
            format!("Tag {missing} does not exist"),
        ));
    }
    Ok(())
}

fn tag_conflict(err: sqlx::Error) -> AppError {
    if !is_unique_violation(&err) {
        return AppError::Database(err);
    }
    let message = err.to_string();
    let field = ["name", "color", "slug"]
        .into_iter()
        .find(|column| message.contains(&format!("tags.{column}")))
        .unwrap_or("name");
    AppError::conflict(field, format!("A tag with this {field} already exists"))
}
