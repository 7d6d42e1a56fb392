/// Per-user recipe marks sharing the `(id, user_id, recipe_id)` layout
///
/// Favorites and cart entries behave identically apart from the table they
/// live in and the message returned on a duplicate add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeMark {
    /// favorites: user_id -> recipe_id
    Favorite,
    /// carts: user_id -> recipe_id, aggregated into the shopping list
    Cart,
}

impl RecipeMark {
    pub const fn table(self) -> &'static str {
        match self {
            RecipeMark::Favorite => "favorites",
            RecipeMark::Cart => "carts",
        }
    }

    pub const fn already_exists_message(self) -> &'static str {
        match self {
            RecipeMark::Favorite => crate::constants::ERR_ALREADY_FAVORITED,
            RecipeMark::Cart => crate::constants::ERR_ALREADY_IN_CART,
        }
    }

    pub const fn not_found_label(self) -> &'static str {
        match self {
            RecipeMark::Favorite => "Favorite",
            RecipeMark::Cart => "Shopping cart entry",
        }
    }
}
