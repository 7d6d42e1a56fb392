//! Integration tests for the Foodgram API
//!
//! These tests drive the full router over a temporary SQLite database.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinSet;
use tower::ServiceExt;

use foodgram::db;
use foodgram::models::{IngredientCreate, TagCreate};
use foodgram::{open_database, router, AppState, Config, Db};

const PASSWORD: &str = "s3cretpass";
const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

// =============================================================================
// Test Helpers
// =============================================================================

/// Router plus the pool behind it; the temp dir lives as long as the app
struct TestApp {
    router: Router,
    pool: Db,
    _dir: TempDir,
}

/// Reference rows created directly in the database
struct Reference {
    breakfast: i64,
    lunch: i64,
    flour: i64,
    sugar: i64,
    eggs: i64,
}

/// Create a test configuration rooted in `dir`
fn test_config(dir: &TempDir) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
        media_root: dir.path().join("media").to_string_lossy().into_owned(),
        media_url: "/media".to_string(),
        allowed_origins: vec!["http://localhost:3000".to_string()],
        environment: "test".to_string(),
        recipes_page_size: 6,
        subscriptions_page_size: 10,
        max_page_size: 100,
        insecure_password_hashing: true,
    }
}

/// Create a test app over a fresh database
async fn create_test_app() -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(&dir);
    let pool = open_database(&config.database_path)
        .await
        .expect("Failed to create test database");

    TestApp {
        router: router(AppState::new(pool.clone(), config)),
        pool,
        _dir: dir,
    }
}

async fn seed_reference(pool: &Db) -> Reference {
    let mut conn = pool.acquire().await.unwrap();

    let tag = |name: &str, color: &str| TagCreate {
        name: name.to_string(),
        color: color.to_string(),
        slug: name.to_lowercase(),
    };
    let breakfast = db::tags::insert_tag(&mut conn, &tag("Breakfast", "#E26C2D"))
        .await
        .unwrap()
        .id;
    let lunch = db::tags::insert_tag(&mut conn, &tag("Lunch", "#49B64E"))
        .await
        .unwrap()
        .id;

    let ingredient = |name: &str, unit: &str| IngredientCreate {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
    };
    let flour = db::ingredients::insert_ingredient(&mut conn, &ingredient("flour", "g"))
        .await
        .unwrap()
        .id;
    let sugar = db::ingredients::insert_ingredient(&mut conn, &ingredient("sugar", "g"))
        .await
        .unwrap()
        .id;
    let eggs = db::ingredients::insert_ingredient(&mut conn, &ingredient("eggs", "pcs"))
        .await
        .unwrap()
        .id;

    Reference {
        breakfast,
        lunch,
        flour,
        sugar,
        eggs,
    }
}

/// Build a request with an optional token and JSON body
fn make_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and parse the response body as JSON (Null when empty)
async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(make_request(method, uri, token, body))
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register `username` and log in; returns (user id, token)
async fn create_user(app: &TestApp, username: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/users",
        None,
        Some(json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "first_name": "Test",
            "last_name": "Cook",
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    let id = body["id"].as_i64().unwrap();

    let token = login(app, username, PASSWORD).await;
    (id, token)
}

async fn login(app: &TestApp, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/token/login",
        None,
        Some(json!({ "email": format!("{username}@example.com"), "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["auth_token"].as_str().unwrap().to_string()
}

async fn create_staff(app: &TestApp, username: &str) -> (i64, String) {
    let (id, token) = create_user(app, username).await;
    let mut conn = app.pool.acquire().await.unwrap();
    assert!(db::users::grant_staff(&mut conn, &format!("{username}@example.com"))
        .await
        .unwrap());
    (id, token)
}

fn recipe_payload(name: &str, ingredients: &[(i64, i64)], tags: &[i64]) -> Value {
    json!({
        "ingredients": ingredients
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect::<Vec<_>>(),
        "tags": tags,
        "image": PIXEL,
        "name": name,
        "text": "Mix everything and bake.",
        "cooking_time": 25,
    })
}

/// Create a recipe and return its id
async fn create_recipe(app: &TestApp, token: &str, payload: Value) -> i64 {
    let (status, body) = send(app, "POST", "/api/recipes", Some(token), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "recipe create failed: {body}");
    body["id"].as_i64().unwrap()
}

async fn count_rows(pool: &Db, sql: &str, id: i64) -> i64 {
    sqlx::query_scalar(sql).bind(id).fetch_one(pool).await.unwrap()
}

fn ids(values: &Value, key: &str) -> Vec<i64> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v[key].as_i64().unwrap())
        .collect()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_check_returns_healthy() {
    let app = create_test_app().await;

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

// =============================================================================
// Users and tokens
// =============================================================================

#[tokio::test]
async fn test_signup_login_and_me() {
    let app = create_test_app().await;
    let (id, token) = create_user(&app, "ann").await;

    let (status, body) = send(&app, "GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["username"], "ann");
    assert_eq!(body["email"], "ann@example.com");
    assert_eq!(body["is_subscribed"], false);
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_signup_duplicate_email_names_field() {
    let app = create_test_app().await;
    create_user(&app, "ann").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        None,
        Some(json!({
            "email": "ann@example.com",
            "username": "someone_else",
            "first_name": "A",
            "last_name": "B",
            "password": PASSWORD,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "email");
}

#[tokio::test]
async fn test_signup_rejects_short_password() {
    let app = create_test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        None,
        Some(json!({
            "email": "bob@example.com",
            "username": "bob",
            "first_name": "Bob",
            "last_name": "Baker",
            "password": "short",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "password");
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let app = create_test_app().await;
    create_user(&app, "ann").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/token/login",
        None,
        Some(json!({ "email": "ann@example.com", "password": "wrong-password" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_token_rejected_on_open_endpoint() {
    let app = create_test_app().await;

    let (status, _) = send(&app, "GET", "/api/recipes", Some("not-a-real-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/recipes", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = create_test_app().await;
    let (_, token) = create_user(&app, "ann").await;

    let (status, _) = send(&app, "POST", "/api/auth/token/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_set_password() {
    let app = create_test_app().await;
    let (_, token) = create_user(&app, "ann").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/users/set_password",
        Some(&token),
        Some(json!({ "current_password": "wrong-password", "new_password": "another-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "current_password");

    let (status, _) = send(
        &app,
        "POST",
        "/api/users/set_password",
        Some(&token),
        Some(json!({ "current_password": PASSWORD, "new_password": "another-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    login(&app, "ann", "another-pass").await;
}

#[tokio::test]
async fn test_user_list_is_paginated() {
    let app = create_test_app().await;
    for name in ["ann", "bob", "cid"] {
        create_user(&app, name).await;
    }

    let (status, body) = send(&app, "GET", "/api/users?limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["next"], "/api/users?limit=2&page=2");
    assert!(body["previous"].is_null());

    let (status, _) = send(&app, "GET", "/api/users/9999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Tags and ingredients
// =============================================================================

#[tokio::test]
async fn test_tag_management_requires_staff() {
    let app = create_test_app().await;
    let (_, user_token) = create_user(&app, "ann").await;
    let (_, staff_token) = create_staff(&app, "chef").await;
    let tag = json!({ "name": "Dinner", "color": "#8775d2", "slug": "dinner" });

    let (status, _) = send(&app, "POST", "/api/tags", None, Some(tag.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/tags", Some(&user_token), Some(tag.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
        send(&app, "POST", "/api/tags", Some(&staff_token), Some(tag.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["color"], "#8775D2");

    let (status, body) = send(&app, "POST", "/api/tags", Some(&staff_token), Some(tag)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let (status, body) = send(&app, "GET", "/api/tags", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ingredient_prefix_search() {
    let app = create_test_app().await;
    seed_reference(&app.pool).await;

    let (status, body) = send(&app, "GET", "/api/ingredients?name=FL", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["flour"]);

    let (_, body) = send(&app, "GET", "/api/ingredients", None, None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_reference_loader_skips_existing_pairs() {
    let app = create_test_app().await;
    let records = vec![
        IngredientCreate {
            name: "salt".to_string(),
            measurement_unit: "g".to_string(),
        },
        IngredientCreate {
            name: "salt".to_string(),
            measurement_unit: "pinch".to_string(),
        },
    ];

    let mut conn = app.pool.acquire().await.unwrap();
    let first = db::ingredients::load_reference_data(&mut conn, &records)
        .await
        .unwrap();
    assert_eq!((first.created, first.skipped), (2, 0));

    let second = db::ingredients::load_reference_data(&mut conn, &records)
        .await
        .unwrap();
    assert_eq!((second.created, second.skipped), (0, 2));
}

// =============================================================================
// Recipes
// =============================================================================

#[tokio::test]
async fn test_create_recipe_returns_input_sets() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (author_id, token) = create_user(&app, "ann").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/recipes",
        Some(&token),
        Some(recipe_payload(
            "Pancakes",
            &[(reference.flour, 200), (reference.eggs, 2)],
            &[reference.breakfast, reference.lunch],
        )),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["author"]["id"], author_id);
    assert_eq!(body["is_favorited"], false);
    assert_eq!(body["is_in_shopping_cart"], false);

    let mut tag_ids = ids(&body["tags"], "id");
    tag_ids.sort();
    let mut expected_tags = vec![reference.breakfast, reference.lunch];
    expected_tags.sort();
    assert_eq!(tag_ids, expected_tags);

    let ingredients = body["ingredients"].as_array().unwrap();
    assert_eq!(ingredients.len(), 2);
    assert_eq!(ingredients[0]["id"], reference.flour);
    assert_eq!(ingredients[0]["amount"], 200);
    assert_eq!(ingredients[0]["measurement_unit"], "g");
    assert_eq!(ingredients[1]["id"], reference.eggs);
    assert_eq!(ingredients[1]["amount"], 2);

    let image = body["image"].as_str().unwrap();
    assert!(image.starts_with("/media/recipes/"), "{image}");
    assert!(image.ends_with(".png"), "{image}");

    let response = app
        .router
        .clone()
        .oneshot(make_request("GET", image, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_recipe_requires_authentication() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/recipes",
        None,
        Some(recipe_payload("Soup", &[(reference.flour, 1)], &[reference.lunch])),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_recipe_validation() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;

    let cases = [
        (recipe_payload("No tags", &[(reference.flour, 10)], &[]), "tags"),
        (
            recipe_payload(
                "Duplicate ingredient",
                &[(reference.flour, 10), (reference.flour, 20)],
                &[reference.lunch],
            ),
            "ingredients",
        ),
        (
            recipe_payload("Zero", &[(reference.flour, 0)], &[reference.lunch]),
            "ingredients",
        ),
        (
            recipe_payload("Too much", &[(reference.flour, 10_001)], &[reference.lunch]),
            "ingredients",
        ),
        (
            recipe_payload("Unknown tag", &[(reference.flour, 10)], &[9999]),
            "tags",
        ),
        (
            recipe_payload("Unknown ingredient", &[(9999, 10)], &[reference.lunch]),
            "ingredients",
        ),
    ];

    for (payload, field) in cases {
        let (status, body) = send(&app, "POST", "/api/recipes", Some(&token), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["field"], field, "{body}");
    }

    // Nothing was written by the rejected requests
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_amount_bounds_are_inclusive() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;

    for amount in [1, 10_000] {
        create_recipe(
            &app,
            &token,
            recipe_payload("Edge", &[(reference.sugar, amount)], &[reference.lunch]),
        )
        .await;
    }
}

#[tokio::test]
async fn test_cooking_time_must_be_positive() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;

    let mut payload = recipe_payload("Instant", &[(reference.sugar, 5)], &[reference.lunch]);
    payload["cooking_time"] = json!(0);

    let (status, body) = send(&app, "POST", "/api/recipes", Some(&token), Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "cooking_time");
}

#[tokio::test]
async fn test_update_recipe_replaces_sets_and_keeps_fields() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;
    let id = create_recipe(
        &app,
        &token,
        recipe_payload(
            "Pancakes",
            &[(reference.flour, 200), (reference.eggs, 2)],
            &[reference.breakfast],
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/recipes/{id}"),
        Some(&token),
        Some(json!({
            "ingredients": [{ "id": reference.sugar, "amount": 30 }],
            "tags": [reference.lunch],
            "cooking_time": 40,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Pancakes");
    assert_eq!(body["cooking_time"], 40);
    assert_eq!(ids(&body["tags"], "id"), vec![reference.lunch]);
    assert_eq!(ids(&body["ingredients"], "id"), vec![reference.sugar]);
    assert_eq!(
        count_rows(
            &app.pool,
            "SELECT COUNT(*) FROM recipe_ingredients WHERE recipe_id = ?",
            id
        )
        .await,
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_recipe_writes_all_succeed() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;
    let id = create_recipe(
        &app,
        &token,
        recipe_payload("Pancakes", &[(reference.flour, 200)], &[reference.breakfast]),
    )
    .await;

    let mut writes = JoinSet::new();
    for n in 0..20 {
        let patch = make_request(
            "PATCH",
            &format!("/api/recipes/{id}"),
            Some(&token),
            Some(json!({
                "ingredients": [{ "id": reference.sugar, "amount": n + 1 }],
                "tags": [reference.lunch],
                "name": format!("Pancakes {n}"),
            })),
        );
        let post = make_request(
            "POST",
            "/api/recipes",
            Some(&token),
            Some(recipe_payload(
                &format!("Waffles {n}"),
                &[(reference.flour, 100), (reference.eggs, 2)],
                &[reference.breakfast, reference.lunch],
            )),
        );
        for request in [patch, post] {
            let router = app.router.clone();
            writes.spawn(async move {
                let response = router.oneshot(request).await.unwrap();
                let status = response.status();
                let bytes = response.into_body().collect().await.unwrap().to_bytes();
                (status, String::from_utf8_lossy(&bytes).into_owned())
            });
        }
    }

    while let Some(result) = writes.join_next().await {
        let (status, body) = result.unwrap();
        assert!(
            status == StatusCode::OK || status == StatusCode::CREATED,
            "concurrent write failed: {status} {body}"
        );
    }

    let recipes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(recipes, 21);
    assert_eq!(
        count_rows(
            &app.pool,
            "SELECT COUNT(*) FROM recipe_ingredients WHERE recipe_id = ?",
            id
        )
        .await,
        1
    );
}

#[tokio::test]
async fn test_failed_update_keeps_previous_recipe() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;
    let id = create_recipe(
        &app,
        &token,
        recipe_payload("Base", &[(reference.flour, 7)], &[reference.breakfast]),
    )
    .await;

    for (ingredients, tags) in [
        (json!([{ "id": reference.sugar, "amount": 5 }]), json!([9999])),
        (json!([{ "id": 9999, "amount": 5 }]), json!([reference.lunch])),
    ] {
        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/api/recipes/{id}"),
            Some(&token),
            Some(json!({ "name": "Changed", "ingredients": ingredients, "tags": tags })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }

    let (status, body) = send(&app, "GET", &format!("/api/recipes/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Base");
    assert_eq!(ids(&body["tags"], "id"), vec![reference.breakfast]);
    assert_eq!(ids(&body["ingredients"], "id"), vec![reference.flour]);
    assert_eq!(body["ingredients"][0]["amount"], 7);
}

#[tokio::test]
async fn test_non_numeric_id_is_rejected_with_error_body() {
    let app = create_test_app().await;

    for uri in ["/api/recipes/abc", "/api/tags/abc", "/api/users/abc"] {
        let (status, body) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["field"], "id", "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn test_update_recipe_requires_composition() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;
    let id = create_recipe(
        &app,
        &token,
        recipe_payload("Pancakes", &[(reference.flour, 200)], &[reference.breakfast]),
    )
    .await;

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/recipes/{id}"),
        Some(&token),
        Some(json!({ "name": "Crepes" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_author_may_modify_recipe() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, author_token) = create_user(&app, "ann").await;
    let (_, other_token) = create_user(&app, "bob").await;
    let id = create_recipe(
        &app,
        &author_token,
        recipe_payload("Pancakes", &[(reference.flour, 200)], &[reference.breakfast]),
    )
    .await;
    let uri = format!("/api/recipes/{id}");
    let update = json!({
        "ingredients": [{ "id": reference.flour, "amount": 1 }],
        "tags": [reference.breakfast],
    });

    let (status, _) = send(&app, "PATCH", &uri, None, Some(update.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "PATCH", &uri, Some(&other_token), Some(update)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "DELETE", &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &uri, Some(&author_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_recipe_cascades_links_only() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;
    let id = create_recipe(
        &app,
        &token,
        recipe_payload(
            "Pancakes",
            &[(reference.flour, 200), (reference.eggs, 2)],
            &[reference.breakfast],
        ),
    )
    .await;

    send(&app, "POST", &format!("/api/recipes/{id}/favorite"), Some(&token), None).await;
    send(&app, "POST", &format!("/api/recipes/{id}/shopping_cart"), Some(&token), None).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/recipes/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for table in ["recipe_ingredients", "recipe_tags", "favorites", "carts"] {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE recipe_id = ?");
        assert_eq!(count_rows(&app.pool, &sql, id).await, 0, "{table}");
    }

    let (_, tags) = send(&app, "GET", "/api/tags", None, None).await;
    assert_eq!(tags.as_array().unwrap().len(), 2);
    let (_, ingredients) = send(&app, "GET", "/api/ingredients", None, None).await;
    assert_eq!(ingredients.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_deleting_tag_unlinks_recipes() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_staff(&app, "chef").await;
    let id = create_recipe(
        &app,
        &token,
        recipe_payload(
            "Pancakes",
            &[(reference.flour, 200)],
            &[reference.breakfast, reference.lunch],
        ),
    )
    .await;

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/tags/{}", reference.lunch),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &format!("/api/recipes/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["tags"], "id"), vec![reference.breakfast]);
}

// =============================================================================
// Listing, filtering and pagination
// =============================================================================

#[tokio::test]
async fn test_recipe_filters() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (ann_id, ann) = create_user(&app, "ann").await;
    let (_, bob) = create_user(&app, "bob").await;

    let pancakes = create_recipe(
        &app,
        &ann,
        recipe_payload("Pancakes", &[(reference.flour, 200)], &[reference.breakfast]),
    )
    .await;
    let soup = create_recipe(
        &app,
        &bob,
        recipe_payload("Soup", &[(reference.eggs, 3)], &[reference.lunch]),
    )
    .await;

    let (_, body) = send(&app, "GET", "/api/recipes", None, None).await;
    assert_eq!(ids(&body["results"], "id"), vec![soup, pancakes]);

    let (_, body) = send(&app, "GET", "/api/recipes?tags=breakfast", None, None).await;
    assert_eq!(ids(&body["results"], "id"), vec![pancakes]);

    let (_, body) = send(&app, "GET", "/api/recipes?tags=breakfast&tags=lunch", None, None).await;
    assert_eq!(body["count"], 2);

    let (_, body) = send(&app, "GET", &format!("/api/recipes?author={ann_id}"), None, None).await;
    assert_eq!(ids(&body["results"], "id"), vec![pancakes]);

    send(&app, "POST", &format!("/api/recipes/{soup}/favorite"), Some(&ann), None).await;

    let (_, body) = send(&app, "GET", "/api/recipes?is_favorited=1", Some(&ann), None).await;
    assert_eq!(ids(&body["results"], "id"), vec![soup]);
    assert_eq!(body["results"][0]["is_favorited"], true);

    let uri = "/api/recipes?is_in_shopping_cart=true";
    let (_, body) = send(&app, "GET", uri, Some(&ann), None).await;
    assert_eq!(body["count"], 0);

    let (status, body) = send(&app, "GET", "/api/recipes?author=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "author");
}

#[tokio::test]
async fn test_is_favorited_ignored_for_anonymous() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;
    for name in ["One", "Two"] {
        create_recipe(
            &app,
            &token,
            recipe_payload(name, &[(reference.flour, 10)], &[reference.lunch]),
        )
        .await;
    }

    let (status, body) = send(&app, "GET", "/api/recipes?is_favorited=true", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_recipe_pagination_links() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;
    for index in 0..3 {
        create_recipe(
            &app,
            &token,
            recipe_payload(
                &format!("Recipe {index}"),
                &[(reference.flour, 10)],
                &[reference.lunch],
            ),
        )
        .await;
    }

    let uri = "/api/recipes?tags=lunch&limit=1&page=2";
    let (status, body) = send(&app, "GET", uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["next"], "/api/recipes?tags=lunch&limit=1&page=3");
    assert_eq!(body["previous"], "/api/recipes?tags=lunch&limit=1");

    let (status, body) = send(&app, "GET", "/api/recipes?limit=1&page=4", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid page");
}

// =============================================================================
// Favorites and shopping cart
// =============================================================================

#[tokio::test]
async fn test_favorite_twice_and_unfavorite_twice() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;
    let id = create_recipe(
        &app,
        &token,
        recipe_payload("Pancakes", &[(reference.flour, 200)], &[reference.breakfast]),
    )
    .await;
    let uri = format!("/api/recipes/{id}/favorite");

    let (status, body) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], id);
    assert_eq!(body["name"], "Pancakes");
    assert_eq!(body["cooking_time"], 25);
    assert!(body.get("ingredients").is_none());

    let (status, _) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_add_twice_and_remove_twice() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;
    let id = create_recipe(
        &app,
        &token,
        recipe_payload("Pancakes", &[(reference.flour, 200)], &[reference.breakfast]),
    )
    .await;
    let uri = format!("/api/recipes/{id}/shopping_cart");

    let (status, body) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], id);

    let (status, body) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(
        count_rows(&app.pool, "SELECT COUNT(*) FROM carts WHERE recipe_id = ?", id).await,
        1
    );

    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_marks_on_missing_recipe() {
    let app = create_test_app().await;
    let (_, token) = create_user(&app, "ann").await;

    let (status, _) = send(&app, "POST", "/api/recipes/9999/favorite", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/api/recipes/9999/shopping_cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_shopping_list_aggregates_cart() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;

    let a = create_recipe(
        &app,
        &token,
        recipe_payload("A", &[(reference.flour, 200)], &[reference.lunch]),
    )
    .await;
    let b = create_recipe(
        &app,
        &token,
        recipe_payload(
            "B",
            &[(reference.sugar, 50), (reference.flour, 300)],
            &[reference.lunch],
        ),
    )
    .await;
    for id in [a, b] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/recipes/{id}/shopping_cart"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let response = app
        .router
        .clone()
        .oneshot(make_request(
            "GET",
            "/api/recipes/download_shopping_cart",
            Some(&token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("shopping_cart.txt"));
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        String::from_utf8(bytes.to_vec()).unwrap(),
        "Shopping list:\nflour - 500 g\nsugar - 50 g\n"
    );
}

#[tokio::test]
async fn test_shopping_list_groups_by_name_and_unit() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, token) = create_user(&app, "ann").await;

    let flour_cups = {
        let mut conn = app.pool.acquire().await.unwrap();
        let record = IngredientCreate {
            name: "flour".to_string(),
            measurement_unit: "cup".to_string(),
        };
        db::ingredients::insert_ingredient(&mut conn, &record)
            .await
            .unwrap()
            .id
    };

    let a = create_recipe(
        &app,
        &token,
        recipe_payload(
            "A",
            &[(reference.flour, 200), (flour_cups, 2)],
            &[reference.lunch],
        ),
    )
    .await;
    let b = create_recipe(
        &app,
        &token,
        recipe_payload(
            "B",
            &[(reference.sugar, 50), (flour_cups, 1), (reference.eggs, 3)],
            &[reference.lunch],
        ),
    )
    .await;
    let c = create_recipe(
        &app,
        &token,
        recipe_payload("C", &[(reference.flour, 300)], &[reference.lunch]),
    )
    .await;
    for id in [a, b, c] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/recipes/{id}/shopping_cart"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let response = app
        .router
        .clone()
        .oneshot(make_request(
            "GET",
            "/api/recipes/download_shopping_cart",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        String::from_utf8(bytes.to_vec()).unwrap(),
        "Shopping list:\neggs - 3 pcs\nflour - 500 g\nflour - 3 cup\nsugar - 50 g\n"
    );
}

#[tokio::test]
async fn test_empty_shopping_list_has_only_header() {
    let app = create_test_app().await;
    let (_, token) = create_user(&app, "ann").await;

    let response = app
        .router
        .clone()
        .oneshot(make_request(
            "GET",
            "/api/recipes/download_shopping_cart",
            Some(&token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Shopping list:\n");
}

// =============================================================================
// Subscriptions
// =============================================================================

#[tokio::test]
async fn test_self_follow_always_fails() {
    let app = create_test_app().await;
    let (id, token) = create_user(&app, "ann").await;
    let uri = format!("/api/users/{id}/subscribe");

    for _ in 0..2 {
        let (status, body) = send(&app, "POST", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "author");
    }
}

#[tokio::test]
async fn test_subscribe_list_and_unsubscribe() {
    let app = create_test_app().await;
    let reference = seed_reference(&app.pool).await;
    let (_, reader) = create_user(&app, "ann").await;
    let (author_id, author) = create_user(&app, "chef").await;
    for index in 0..4 {
        create_recipe(
            &app,
            &author,
            recipe_payload(&format!("Dish {index}"), &[(reference.flour, 10)], &[reference.lunch]),
        )
        .await;
    }
    let uri = format!("/api/users/{author_id}/subscribe");

    let (status, body) = send(&app, "POST", &uri, Some(&reader), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], author_id);
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 4);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 4);

    let (status, _) = send(&app, "POST", &uri, Some(&reader), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/users/subscriptions", Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let entry = &body["results"][0];
    assert_eq!(entry["username"], "chef");
    assert_eq!(entry["recipes"].as_array().unwrap().len(), 3);
    assert_eq!(entry["recipes"][0]["name"], "Dish 3");

    let (_, body) = send(
        &app,
        "GET",
        "/api/users/subscriptions?recipes_limit=1",
        Some(&reader),
        None,
    )
    .await;
    assert_eq!(body["results"][0]["recipes"].as_array().unwrap().len(), 1);

    let profile_uri = format!("/api/users/{author_id}");
    let (_, profile) = send(&app, "GET", &profile_uri, Some(&reader), None).await;
    assert_eq!(profile["is_subscribed"], true);

    let (status, _) = send(&app, "DELETE", &uri, Some(&reader), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", &uri, Some(&reader), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscribe_to_missing_user() {
    let app = create_test_app().await;
    let (_, token) = create_user(&app, "ann").await;

    let (status, _) = send(&app, "POST", "/api/users/9999/subscribe", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/users/subscriptions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
