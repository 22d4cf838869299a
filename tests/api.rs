//! End-to-end requests against a migrated database. Run with
//! `DATABASE_URL` pointing at a Postgres server and `--ignored`.

use foodgram::{
    actions::{ingredients, tags, tokens, users},
    config::Config,
    middleware::Context,
    payload::UserRegistration,
    routes,
    schema::{Id, User},
};
use serde_json::{json, Value};
use sqlx::PgPool;
use warp::http::StatusCode;

const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

struct TestApp {
    context: Context,
}

impl TestApp {
    fn new(pool: PgPool) -> Self {
        let config = Config {
            port: 8000,
            database_url: String::new(),
            db_max_connections: 1,
            secret_key: "integration-secret".to_string(),
            media_root: std::env::temp_dir().join(format!("foodgram-it-{}", uuid::Uuid::new_v4())),
            public_url: "http://testserver".to_string(),
        };
        Self {
            context: Context::new(pool, config),
        }
    }

    fn pool(&self) -> &PgPool {
        &self.context.pool
    }

    async fn user(&self, name: &str) -> (User, String) {
        let registration = UserRegistration {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            first_name: "Test".to_string(),
            last_name: "Cook".to_string(),
            password: "Str0ng-Passw0rd".to_string(),
        };
        let user = users::register_user(&registration, false, self.pool()).await.unwrap();
        let key = tokens::get_or_create_token(&user, &self.context.config.secret_key, self.pool())
            .await
            .unwrap();
        (user, format!("Token {key}"))
    }

    async fn catalog(&self) -> (Id, Vec<Id>) {
        let tag = tags::create_tag("Breakfast", Some("#E26C2D"), Some("breakfast"), self.pool())
            .await
            .unwrap();
        let rows = vec![
            ("flour".to_string(), "g".to_string()),
            ("sugar".to_string(), "g".to_string()),
            ("milk".to_string(), "ml".to_string()),
        ];
        ingredients::import_ingredients(&rows, self.pool()).await.unwrap();
        // Ids in import order: flour, sugar, milk.
        let mut ids: Vec<Id> = ingredients::list_ingredients(None, self.pool())
            .await
            .unwrap()
            .iter()
            .map(|ingredient| ingredient.id)
            .collect();
        ids.sort();
        (tag.id, ids)
    }

    async fn send(&self, method: &str, path: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Value) {
        let (status, body) = self.send_raw(method, path, body, token).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn send_raw(&self, method: &str, path: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut request = warp::test::request().method(method).path(path);
        if let Some(body) = body {
            request = request
                .header("content-type", "application/json")
                .body(body.to_string());
        }
        if let Some(token) = token {
            request = request.header("authorization", token);
        }

        let response = request.reply(&routes(self.context.clone())).await;
        (response.status(), response.body().to_vec())
    }

    async fn recipe(&self, token: &str, name: &str, tag: Id, parts: &[(Id, i64)]) -> Id {
        let ingredients: Vec<Value> = parts
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect();
        let (status, body) = self
            .send(
                "POST",
                "/api/recipes/",
                Some(json!({
                    "ingredients": ingredients,
                    "tags": [tag],
                    "image": PIXEL_PNG,
                    "name": name,
                    "text": "Mix and bake.",
                    "cooking_time": 20,
                })),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }
}

/// Files stored below `root`, at any depth.
fn stored_files(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return vec![];
    };
    entries
        .flatten()
        .flat_map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                stored_files(&path)
            } else {
                vec![path]
            }
        })
        .collect()
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.context.config.media_root);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn register_login_me_logout(pool: PgPool) {
    let app = TestApp::new(pool);

    let (status, body) = app
        .send(
            "POST",
            "/api/users/",
            Some(json!({
                "email": "chef@Example.COM",
                "username": "chef",
                "first_name": "Julia",
                "last_name": "Child",
                "password": "Str0ng-Passw0rd",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "chef");
    assert!(body.get("password").is_none());

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/token/login/",
            Some(json!({ "email": "chef@example.com", "password": "Str0ng-Passw0rd" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = format!("Token {}", body["auth_token"].as_str().unwrap());

    let (status, me) = app.send("GET", "/api/users/me/", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["first_name"], "Julia");
    assert_eq!(me["is_subscribed"], false);

    let (status, _) = app.send("POST", "/api/auth/token/logout/", None, Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send("GET", "/api/users/me/", None, Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid token.");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn login_replaces_token_signed_with_old_secret(pool: PgPool) {
    let app = TestApp::new(pool);
    let (user, _) = app.user("cook").await;
    tokens::delete_token(user.id, app.pool()).await.unwrap();
    let old_key = tokens::get_or_create_token(&user, "rotated-out-secret", app.pool())
        .await
        .unwrap();

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/token/login/",
            Some(json!({ "email": "cook@example.com", "password": "Str0ng-Passw0rd" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let new_key = body["auth_token"].as_str().unwrap().to_string();
    assert_ne!(new_key, old_key);

    let (status, _) = app
        .send("GET", "/api/users/me/", None, Some(&format!("Token {new_key}")))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send("GET", "/api/users/me/", None, Some(&format!("Token {old_key}")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn wrong_password_is_refused(pool: PgPool) {
    let app = TestApp::new(pool);
    app.user("cook").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/token/login/",
            Some(json!({ "email": "cook@example.com", "password": "nope" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn duplicate_registration_is_a_field_error(pool: PgPool) {
    let app = TestApp::new(pool);
    app.user("cook").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/users/",
            Some(json!({
                "email": "cook@example.com",
                "username": "cook",
                "first_name": "A",
                "last_name": "B",
                "password": "Str0ng-Passw0rd",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());
    assert!(body["username"].is_array());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn favorites_are_added_once(pool: PgPool) {
    let app = TestApp::new(pool);
    let (tag, parts) = app.catalog().await;
    let (_, token) = app.user("cook").await;
    let recipe = app.recipe(&token, "Pancakes", tag, &[(parts[0], 200)]).await;
    let path = format!("/api/recipes/{recipe}/favorite/");

    let (status, body) = app.send("POST", &path, None, Some(&token)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Pancakes");

    let (status, _) = app.send("POST", &path, None, Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("DELETE", &path, None, Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send("DELETE", &path, None, Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("POST", "/api/recipes/999999/favorite/", None, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn shopping_list_sums_shared_ingredients(pool: PgPool) {
    let app = TestApp::new(pool);
    let (tag, parts) = app.catalog().await;
    let (_, token) = app.user("cook").await;

    let pancakes = app.recipe(&token, "Pancakes", tag, &[(parts[0], 200), (parts[1], 30)]).await;
    let muffins = app.recipe(&token, "Muffins", tag, &[(parts[0], 150)]).await;

    // Ingredient lines come back newest first.
    let (_, body) = app.send("GET", &format!("/api/recipes/{pancakes}/"), None, None).await;
    assert_eq!(body["ingredients"][0]["name"], "sugar");
    assert_eq!(body["ingredients"][1]["name"], "flour");

    let (status, _) = app.send("GET", "/api/recipes/download_shopping_cart/", None, Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for recipe in [pancakes, muffins] {
        let (status, _) = app
            .send("POST", &format!("/api/recipes/{recipe}/shopping_cart/"), None, Some(&token))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .send_raw("GET", "/api/recipes/download_shopping_cart/", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let list = String::from_utf8(body).unwrap();
    assert!(list.contains("* Flour (g) — 350"), "{list}");
    assert!(list.contains("* Sugar (g) — 30"), "{list}");
    assert!(!list.contains("Milk"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn recipe_flags_follow_the_viewer(pool: PgPool) {
    let app = TestApp::new(pool);
    let (tag, parts) = app.catalog().await;
    let (_, token) = app.user("cook").await;
    let recipe = app.recipe(&token, "Pancakes", tag, &[(parts[0], 200)]).await;
    app.send("POST", &format!("/api/recipes/{recipe}/favorite/"), None, Some(&token))
        .await;

    let path = format!("/api/recipes/{recipe}/");
    let (_, own) = app.send("GET", &path, None, Some(&token)).await;
    assert_eq!(own["is_favorited"], true);
    assert_eq!(own["is_in_shopping_cart"], false);
    assert!(own["image"].as_str().unwrap().starts_with("http://testserver/media/recipes/"));

    app.send("POST", &format!("/api/recipes/{recipe}/shopping_cart/"), None, Some(&token))
        .await;
    let (_, own) = app.send("GET", &path, None, Some(&token)).await;
    assert_eq!(own["is_in_shopping_cart"], true);

    let (status, anonymous) = app.send("GET", &path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(anonymous["is_favorited"], false);
    assert_eq!(anonymous["is_in_shopping_cart"], false);
    assert_eq!(anonymous["author"]["is_subscribed"], false);

    let (_, favorites) = app.send("GET", "/api/recipes/?is_favorited=1", None, Some(&token)).await;
    assert_eq!(favorites["count"], 1);
    let (_, nothing) = app.send("GET", "/api/recipes/?is_favorited=1", None, None).await;
    assert_eq!(nothing["count"], 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn recipe_payload_is_validated(pool: PgPool) {
    let app = TestApp::new(pool);
    let (tag, parts) = app.catalog().await;
    let (_, token) = app.user("cook").await;

    let body = |ingredients: Value, tags: Value| {
        json!({
            "ingredients": ingredients,
            "tags": tags,
            "image": PIXEL_PNG,
            "name": "Soup",
            "text": "Boil.",
            "cooking_time": 10,
        })
    };

    let duplicate = body(
        json!([{ "id": parts[0], "amount": 1 }, { "id": parts[0], "amount": 2 }]),
        json!([tag]),
    );
    let (status, _) = app.send("POST", "/api/recipes/", Some(duplicate), Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let zero = body(json!([{ "id": parts[0], "amount": 0 }]), json!([tag]));
    let (status, _) = app.send("POST", "/api/recipes/", Some(zero), Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown_tag = body(json!([{ "id": parts[0], "amount": 1 }]), json!([999999]));
    let (status, _) = app.send("POST", "/api/recipes/", Some(unknown_tag), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let unknown_ingredient = body(json!([{ "id": 999999, "amount": 1 }]), json!([tag]));
    let (status, _) = app
        .send("POST", "/api/recipes/", Some(unknown_ingredient), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn failed_recipe_writes_leave_nothing_behind(pool: PgPool) {
    let app = TestApp::new(pool);
    let (tag, parts) = app.catalog().await;
    let (_, token) = app.user("cook").await;
    let recipe = app.recipe(&token, "Pancakes", tag, &[(parts[0], 200)]).await;
    let stored = stored_files(&app.context.config.media_root);
    assert_eq!(stored.len(), 1);

    // Ingredient lines are written after the recipe row, inside the same transaction.
    sqlx::query(
        "CREATE FUNCTION refuse_amounts() RETURNS trigger AS $$
         BEGIN RAISE EXCEPTION 'ingredient amounts are read-only'; END;
         $$ LANGUAGE plpgsql",
    )
    .execute(app.pool())
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER refuse_amounts BEFORE INSERT ON ingredient_amounts \
         FOR EACH ROW EXECUTE FUNCTION refuse_amounts()",
    )
    .execute(app.pool())
    .await
    .unwrap();

    let (status, _) = app
        .send(
            "POST",
            "/api/recipes/",
            Some(json!({
                "ingredients": [{ "id": parts[1], "amount": 5 }],
                "tags": [tag],
                "image": PIXEL_PNG,
                "name": "Muffins",
                "text": "Bake.",
                "cooking_time": 30,
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (recipes,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(recipes, 1);
    assert_eq!(stored_files(&app.context.config.media_root), stored);

    let path = format!("/api/recipes/{recipe}/");
    let (status, _) = app
        .send(
            "PATCH",
            &path,
            Some(json!({
                "name": "Crepes",
                "image": PIXEL_PNG,
                "ingredients": [{ "id": parts[2], "amount": 300 }],
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, body) = app.send("GET", &path, None, None).await;
    assert_eq!(body["name"], "Pancakes");
    assert_eq!(body["ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(body["ingredients"][0]["amount"], 200);
    assert_eq!(stored_files(&app.context.config.media_root), stored);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn only_the_author_edits(pool: PgPool) {
    let app = TestApp::new(pool);
    let (tag, parts) = app.catalog().await;
    let (_, author) = app.user("author").await;
    let (_, other) = app.user("other").await;
    let recipe = app.recipe(&author, "Pancakes", tag, &[(parts[0], 200)]).await;
    let path = format!("/api/recipes/{recipe}/");

    let (status, _) = app
        .send("PATCH", &path, Some(json!({ "name": "Mine now" })), Some(&other))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            "PATCH",
            &path,
            Some(json!({
                "name": "Crepes",
                "ingredients": [{ "id": parts[2], "amount": 300 }],
                "tags": [tag],
            })),
            Some(&author),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Crepes");
    assert_eq!(body["ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(body["ingredients"][0]["measurement_unit"], "ml");
    assert_eq!(body["ingredients"][0]["amount"], 300);

    let (status, _) = app.send("DELETE", &path, None, Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send("DELETE", &path, None, Some(&author)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send("GET", &path, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn subscriptions_list_followed_authors(pool: PgPool) {
    let app = TestApp::new(pool);
    let (tag, parts) = app.catalog().await;
    let (author, author_token) = app.user("author").await;
    let (reader, reader_token) = app.user("reader").await;
    for name in ["One", "Two", "Three"] {
        app.recipe(&author_token, name, tag, &[(parts[0], 10)]).await;
    }

    let (status, _) = app
        .send("POST", &format!("/api/users/{}/subscribe/", reader.id), None, Some(&reader_token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let subscribe = format!("/api/users/{}/subscribe/?recipes_limit=2", author.id);
    let (status, body) = app.send("POST", &subscribe, None, Some(&reader_token)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 3);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 2);

    let (status, _) = app.send("POST", &subscribe, None, Some(&reader_token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, page) = app
        .send("GET", "/api/users/subscriptions/", None, Some(&reader_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["username"], "author");

    let (status, _) = app.send("DELETE", &subscribe, None, Some(&reader_token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send("DELETE", &subscribe, None, Some(&reader_token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn recipe_listing_pages_and_filters(pool: PgPool) {
    let app = TestApp::new(pool);
    let (tag, parts) = app.catalog().await;
    let (author, token) = app.user("cook").await;
    for name in ["One", "Two", "Three"] {
        app.recipe(&token, name, tag, &[(parts[0], 10)]).await;
    }

    let (status, page) = app.send("GET", "/api/recipes/?limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    assert_eq!(page["results"][0]["name"], "Three");
    assert_eq!(page["next"], "http://testserver/api/recipes/?limit=2&page=2");
    assert_eq!(page["previous"], Value::Null);

    let (_, tagged) = app
        .send("GET", &format!("/api/recipes/?tags=breakfast&author={}", author.id), None, None)
        .await;
    assert_eq!(tagged["count"], 3);

    let (status, _) = app.send("GET", "/api/recipes/?tags=dinner", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("GET", "/api/recipes/?page=5", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn ingredient_search_matches_prefix(pool: PgPool) {
    let app = TestApp::new(pool);
    app.catalog().await;

    let (status, body) = app.send("GET", "/api/ingredients/?name=FL", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|ingredient| ingredient["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["flour"]);

    let (status, tags) = app.send("GET", "/api/tags/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags[0]["slug"], "breakfast");
}
