use axum::http::StatusCode;
use recipe_suggest::recipes::repo;
use serde_json::{json, Value};

mod common;

use common::TestOptions;

fn titles(body: &Value) -> Vec<String> {
    body.as_array()
        .expect("array")
        .iter()
        .map(|r| r["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn generate_without_model_uses_templates() {
    let t = common::spawn().await;
    let (user_id, _) = t.register("chef").await;

    let (status, body) = t
        .post(
            "/api/generate-recipes",
            json!({"ingredients": ["chicken", "rice"], "user_id": user_id}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Recipes generated successfully");
    assert_eq!(body["source"], "fallback");

    let recipes = body["recipes"].as_array().unwrap();
    assert_eq!(recipes.len(), 3);
    assert_eq!(recipes[0]["title"], "Simple Chicken Stir Fry");
    assert_eq!(recipes[1]["title"], "Chicken and Vegetable Soup");
    assert_eq!(recipes[2]["title"], "Roasted Chicken Medley");
    for r in recipes {
        assert_eq!(r["user_id"], user_id);
        assert!(r["id"].as_i64().unwrap() > 0);
        assert!(r["created_at"].as_str().is_some());
    }

    assert_eq!(repo::count(&t.state.db).await.unwrap(), 3);
}

#[tokio::test]
async fn generate_with_model_reply() {
    let reply = r#"Here you go:
```json
[{"title": "Garlic Chicken Rice", "ingredients": ["chicken", "rice", "garlic"],
  "instructions": ["Cook rice", "Fry chicken"], "cooking_time": 25, "difficulty": "Easy"}]
```"#;
    let t = common::spawn_with(TestOptions {
        model_reply: Some(reply.into()),
        ..Default::default()
    })
    .await;
    let (user_id, _) = t.register("chef").await;

    let (status, body) = t
        .post(
            "/api/generate-recipes",
            json!({"ingredients": "chicken, rice", "user_id": user_id.to_string()}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source"], "ai");

    let recipes = body["recipes"].as_array().unwrap();
    assert_eq!(recipes.len(), 3);
    assert_eq!(recipes[0]["title"], "Garlic Chicken Rice");
    assert_eq!(recipes[0]["ingredients"], "chicken, rice, garlic");
    assert_eq!(recipes[0]["instructions"], "1. Cook rice\n2. Fry chicken");
    assert_eq!(recipes[0]["cooking_time"], "25 minutes");
    assert_eq!(recipes[0]["servings"], "4");
    // padded from the templates at the same positions
    assert_eq!(recipes[1]["title"], "Chicken and Vegetable Soup");
    assert_eq!(recipes[2]["title"], "Roasted Chicken Medley");
}

#[tokio::test]
async fn unusable_model_reply_falls_back() {
    let t = common::spawn_with(TestOptions {
        model_reply: Some("1. Chicken stir fry\n2. Rice bowl".into()),
        ..Default::default()
    })
    .await;
    let (user_id, _) = t.register("chef").await;

    let (status, body) = t
        .post(
            "/api/generate-recipes",
            json!({"ingredients": ["chicken"], "user_id": user_id}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["recipes"][0]["title"], "Simple Chicken Stir Fry");
}

#[tokio::test]
async fn generate_uses_token_when_body_has_no_user() {
    let t = common::spawn().await;
    let (user_id, token) = t.register("chef").await;

    let req = axum::http::Request::post("/api/generate-recipes")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(axum::body::Body::from(json!({"ingredients": ["tofu"]}).to_string()))
        .unwrap();
    let (status, body) = t.send(req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recipes"][0]["user_id"], user_id);
}

#[tokio::test]
async fn generate_validation_errors() {
    let t = common::spawn().await;
    let (user_id, _) = t.register("chef").await;

    for ingredients in [json!([]), json!(["  ", ""]), json!(null), json!("")] {
        let (status, body) = t
            .post(
                "/api/generate-recipes",
                json!({"ingredients": ingredients, "user_id": user_id}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No ingredients provided");
    }

    let (status, body) = t
        .post("/api/generate-recipes", json!({"ingredients": ["egg"]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User ID required");

    let (status, body) = t
        .post(
            "/api/generate-recipes",
            json!({"ingredients": ["egg"], "user_id": 9999}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");

    assert_eq!(repo::count(&t.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn list_is_newest_first_and_filters_by_user() {
    let t = common::spawn().await;
    let (alice, _) = t.register("alice").await;
    let (bob, _) = t.register("bob").await;

    t.post("/api/generate-recipes", json!({"ingredients": ["chicken"], "user_id": alice}))
        .await;
    t.post("/api/generate-recipes", json!({"ingredients": ["beef"], "user_id": bob}))
        .await;

    let (status, body) = t.get("/api/recipes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        titles(&body),
        vec![
            "Roasted Beef Medley",
            "Beef and Vegetable Soup",
            "Simple Beef Stir Fry",
            "Roasted Chicken Medley",
            "Chicken and Vegetable Soup",
            "Simple Chicken Stir Fry",
        ]
    );

    let (_, body) = t.get(&format!("/api/recipes?user_id={}", alice)).await;
    let only_alice = body.as_array().unwrap();
    assert_eq!(only_alice.len(), 3);
    assert!(only_alice.iter().all(|r| r["user_id"] == alice));

    let (_, body) = t.get("/api/recipes?limit=2&offset=1").await;
    assert_eq!(
        titles(&body),
        vec!["Beef and Vegetable Soup", "Simple Beef Stir Fry"]
    );

    let (status, _) = t.get("/api/recipes?limit=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_existing_and_missing() {
    let t = common::spawn().await;
    let (user_id, _) = t.register("chef").await;
    let (_, body) = t
        .post("/api/generate-recipes", json!({"ingredients": ["egg"], "user_id": user_id}))
        .await;
    let id = body["recipes"][0]["id"].as_i64().unwrap();

    let (status, body) = t.delete(&format!("/api/recipes/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Recipe deleted successfully");
    assert_eq!(repo::count(&t.state.db).await.unwrap(), 2);

    let (status, body) = t.delete(&format!("/api/recipes/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Recipe not found");
    assert_eq!(repo::count(&t.state.db).await.unwrap(), 2);
}

#[tokio::test]
async fn health_reports_database_and_features() {
    let t = common::spawn().await;
    let (status, body) = t.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["openai_available"], false);
    assert_eq!(body["payments_enabled"], false);
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn health_survives_closed_pool() {
    let t = common::spawn().await;
    t.state.db.close().await;
    let (status, body) = t.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn batch_is_all_or_nothing() {
    let t = common::spawn().await;
    let (user_id, _) = t.register("chef").await;

    // the third template recipe cannot be stored
    sqlx::query(
        "CREATE TRIGGER reject_roasted BEFORE INSERT ON recipes \
         WHEN NEW.title LIKE 'Roasted%' \
         BEGIN SELECT RAISE(ABORT, 'roasted recipes are disabled'); END",
    )
    .execute(&t.state.db)
    .await
    .unwrap();

    let (status, body) = t
        .post(
            "/api/generate-recipes",
            json!({"ingredients": ["chicken"], "user_id": user_id}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(repo::count(&t.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn malformed_input_gets_json_400() {
    let t = common::spawn().await;
    let (user_id, _) = t.register("chef").await;

    let (status, body) = t
        .post(
            "/api/generate-recipes",
            json!({"ingredients": [1, 2], "user_id": user_id}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));

    let req = axum::http::Request::post("/api/generate-recipes")
        .body(axum::body::Body::from(
            json!({"ingredients": ["egg"], "user_id": user_id}).to_string(),
        ))
        .unwrap();
    let (status, body) = t.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = t.get("/api/recipes?user_id=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid query"));

    let (status, body) = t.delete("/api/recipes/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid path"));

    assert_eq!(repo::count(&t.state.db).await.unwrap(), 0);
}
