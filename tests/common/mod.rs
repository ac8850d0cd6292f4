#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use recipe_suggest::{
    app::build_app,
    config::AppConfig,
    db,
    generator::{ChatMessage, ChatModel, CompletionOptions, RecipeGenerator},
    premium::checkout::{CheckoutProvider, CheckoutRequest, CheckoutSession, MockCheckoutProvider},
    state::AppState,
};
use serde_json::Value;
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec-test";

/// Chat model that always answers with the same text.
pub struct CannedModel(pub String);

#[async_trait]
impl ChatModel for CannedModel {
    async fn complete(&self, _m: &[ChatMessage], _o: CompletionOptions) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

/// Checkout provider that is always down.
pub struct BrokenCheckout;

#[async_trait]
impl CheckoutProvider for BrokenCheckout {
    async fn create_checkout(&self, _req: &CheckoutRequest) -> anyhow::Result<CheckoutSession> {
        anyhow::bail!("provider timed out")
    }
}

#[derive(Default)]
pub struct TestOptions {
    pub model_reply: Option<String>,
    pub payments: bool,
    pub webhook_secret: Option<&'static str>,
    pub checkout: Option<Arc<dyn CheckoutProvider>>,
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
}

pub async fn spawn() -> TestApp {
    spawn_with(TestOptions::default()).await
}

/// In-memory SQLite app with migrations applied.
pub async fn spawn_with(opts: TestOptions) -> TestApp {
    let mut vars: HashMap<&str, String> = HashMap::new();
    vars.insert("DATABASE_URL", "sqlite::memory:".into());
    vars.insert("SECRET_KEY", "test-secret".into());
    vars.insert("PUBLIC_BASE_URL", "http://test.local".into());
    if opts.payments {
        vars.insert("ENABLE_PAYMENTS", "true".into());
    }
    if let Some(secret) = opts.webhook_secret {
        vars.insert("PAYMENT_WEBHOOK_SECRET", secret.into());
    }
    let config = AppConfig::from_lookup(|k| vars.get(k).cloned()).expect("config");

    let pool = db::connect(&config.database).await.expect("connect");
    db::migrate(&pool, config.database.kind).await.expect("migrate");

    let model = opts
        .model_reply
        .map(|reply| Arc::new(CannedModel(reply)) as Arc<dyn ChatModel>);
    let checkout = opts
        .checkout
        .unwrap_or_else(|| Arc::new(MockCheckoutProvider::new(&config.payments.public_base_url)));

    let state = AppState::from_parts(
        pool,
        Arc::new(config),
        Arc::new(RecipeGenerator::new(model)),
        checkout,
    );
    TestApp {
        app: build_app(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.expect("response");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, &body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::delete(uri).body(Body::empty()).unwrap()).await
    }

    /// Registers a user and returns `(user_id, access_token)`.
    pub async fn register(&self, username: &str) -> (i64, String) {
        let (status, body) = self
            .post(
                "/api/register",
                serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "correct horse",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        (
            body["user_id"].as_i64().expect("user_id"),
            body["access_token"].as_str().expect("token").to_string(),
        )
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
