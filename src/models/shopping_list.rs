use crate::constants::SHOPPING_LIST_HEADER;

/// One aggregated line of a shopping list
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Render the plain-text shopping list document
///
/// Items are written in the order given; the aggregation query already sorts
/// them by ingredient name.
pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    let mut out = String::from(SHOPPING_LIST_HEADER);
    out.push('\n');
    for item in items {
        out.push_str(&format!(
            "{} - {} {}\n",
            item.name, item.total, item.measurement_unit
        ));
    }
    out
}
