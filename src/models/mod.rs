pub mod follow;
pub mod ingredient;
pub mod recipe;
pub mod shopping_list;
pub mod tag;
pub mod user;

pub use follow::Subscription;
pub use ingredient::{Ingredient, IngredientCreate, IngredientUpdate};
pub use recipe::{
    IngredientAmount, IngredientAmountWrite, RecipeComposition, RecipeCreate, RecipeFields,
    RecipeRead, RecipeRow, RecipeUpdate, ShortRecipe,
};
pub use shopping_list::{render_shopping_list, ShoppingListItem};
pub use tag::{Tag, TagCreate, TagUpdate};
pub use user::{
    LoginRequest, LoginResponse, SetPasswordRequest, SignupRequest, User, UserFields,
    UserProfile,
};
