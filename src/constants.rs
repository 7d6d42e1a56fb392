/// Smallest amount of a single ingredient in a recipe
pub const MIN_INGREDIENT_AMOUNT: i64 = 1;

/// Largest amount of a single ingredient in a recipe
pub const MAX_INGREDIENT_AMOUNT: i64 = 10_000;

/// Minimum cooking time in minutes
pub const MIN_COOKING_TIME: i64 = 1;

/// Number of recipes shown per author in the subscription list
pub const SUBSCRIPTION_RECIPES_PREVIEW: i64 = 3;

/// Maximum decoded recipe image size in bytes (5MB)
pub const MAX_IMAGE_SIZE_BYTES: usize = 5_242_880;

/// Request body limit; base64 inflates the image by 4/3
pub const MAX_REQUEST_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const MAX_RECIPE_NAME_LENGTH: usize = 200;
pub const MAX_INGREDIENT_NAME_LENGTH: usize = 200;
pub const MAX_MEASUREMENT_UNIT_LENGTH: usize = 30;
pub const MAX_TAG_NAME_LENGTH: usize = 30;
pub const MAX_TAG_SLUG_LENGTH: usize = 50;
pub const MAX_USER_NAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;

// =============================================================================
// Shopping list
// =============================================================================

/// First line of the downloaded shopping list
pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";

/// Attachment file name for the downloaded shopping list
pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";

// =============================================================================
// Error Messages
// =============================================================================

pub const ERR_TAGS_REQUIRED: &str = "At least one tag is required";

pub const ERR_TAGS_NOT_UNIQUE: &str = "Tags must be unique";

pub const ERR_INGREDIENTS_REQUIRED: &str = "At least one ingredient is required";

pub const ERR_INGREDIENTS_NOT_UNIQUE: &str = "Ingredients must not repeat";

pub const ERR_AMOUNT_OUT_OF_RANGE: &str = "Ingredient amount must be between 1 and 10000";

pub const ERR_COOKING_TIME: &str = "Minimum cooking time is 1 minute";

pub const ERR_SELF_FOLLOW: &str = "You cannot subscribe to yourself";

pub const ERR_ALREADY_FOLLOWING: &str = "You are already subscribed to this author";

pub const ERR_ALREADY_FAVORITED: &str = "Recipe is already in favorites";

pub const ERR_ALREADY_IN_CART: &str = "Recipe is already in the shopping cart";
