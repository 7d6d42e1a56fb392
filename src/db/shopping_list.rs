use sqlx::SqliteConnection;

use crate::error::Result;
use crate::models::ShoppingListItem;

/// Sum ingredient amounts over every recipe in the user's cart
///
/// Groups by (name, unit) and orders by name; equal names keep the order in
/// which their first recipe line was inserted.
pub async fn aggregate_cart(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<ShoppingListItem>> {
    let items = sqlx::query_as::<_, ShoppingListItem>(
        "SELECT i.name AS name,
                i.measurement_unit AS measurement_unit,
                CAST(SUM(ri.amount) AS INTEGER) AS total
         FROM carts c
         JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
         JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE c.user_id = ?
         GROUP BY i.name, i.measurement_unit
         ORDER BY i.name ASC, MIN(ri.id) ASC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}
