pub mod health;
pub mod ingredients;
pub mod marks;
pub mod recipes;
pub mod shopping_cart;
pub mod subscriptions;
pub mod tags;
pub mod tokens;
pub mod users;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::constants::MAX_REQUEST_BODY_BYTES;
use crate::AppState;

pub use health::health_check;

/// Build the application router
///
/// CORS is left to the caller; the server binary adds it from configuration.
pub fn router(state: AppState) -> Router {
    let media_url = state.config.media_url.clone();

    let api = Router::new()
        // Tokens
        .route("/auth/token/login", post(tokens::login))
        .route("/auth/token/logout", post(tokens::logout))
        // Users and subscriptions
        .route("/users", get(users::list_users).post(users::signup))
        .route("/users/me", get(users::me))
        .route("/users/set_password", post(users::set_password))
        .route("/users/subscriptions", get(subscriptions::list_subscriptions))
        .route("/users/:id", get(users::get_user))
        .route(
            "/users/:id/subscribe",
            post(subscriptions::subscribe).delete(subscriptions::unsubscribe),
        )
        // Reference data
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/tags/:id",
            get(tags::get_tag)
                .patch(tags::update_tag)
                .delete(tags::delete_tag),
        )
        .route(
            "/ingredients",
            get(ingredients::list_ingredients).post(ingredients::create_ingredient),
        )
        .route(
            "/ingredients/:id",
            get(ingredients::get_ingredient)
                .patch(ingredients::update_ingredient)
                .delete(ingredients::delete_ingredient),
        )
        // Recipes
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/download_shopping_cart",
            get(shopping_cart::download_shopping_cart),
        )
        .route(
            "/recipes/:id",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/recipes/:id/favorite",
            post(marks::add_favorite).delete(marks::remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart",
            post(marks::add_to_cart).delete(marks::remove_from_cart),
        );

    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api);

    // Uploaded images are served locally only when MEDIA_URL is a path
    if media_url.starts_with('/') && media_url.len() > 1 {
        app = app.nest_service(&media_url, ServeDir::new(state.media.root().clone()));
    }

    app.layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
