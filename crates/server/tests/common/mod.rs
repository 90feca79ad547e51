//! Common test utilities for in-process API testing.
//!
//! Provides a test fixture that wires the router to a throwaway SQLite
//! database, so the whole HTTP surface can be exercised without binding a
//! socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use pronto_core::{Config, DatabaseConfig, OrderStore, SqliteOrderStore};
use pronto_server::api::create_router;
use pronto_server::state::AppState;

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Test fixture wrapping an in-process server.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Temporary directory holding the test database
    #[allow(dead_code)]
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            ..Default::default()
        };

        let order_store: Arc<dyn OrderStore> =
            Arc::new(SqliteOrderStore::new(&db_path).expect("Failed to create order store"));

        let state = Arc::new(AppState::new(config, order_store));
        let router = create_router(state);

        Self { router, temp_dir }
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a POST request with JSON body, acting as `user` with `role`.
    pub async fn post_as(&self, path: &str, body: Value, user: &str, role: &str) -> TestResponse {
        self.request("POST", path, Some(body), Some((user, role)))
            .await
    }

    /// Send a PUT request with JSON body, acting as `user` with `role`.
    pub async fn put_as(&self, path: &str, body: Value, user: &str, role: &str) -> TestResponse {
        self.request("PUT", path, Some(body), Some((user, role)))
            .await
    }

    /// Send a POST request with JSON body and no identity headers.
    pub async fn post_anonymous(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a PUT request with JSON body and no identity headers.
    #[allow(dead_code)]
    pub async fn put_anonymous(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body), None).await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        actor: Option<(&str, &str)>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some((user, role)) = actor {
            request_builder = request_builder
                .header("X-User-Id", user)
                .header("X-User-Role", role);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Create a delivery-mode order as customer `alice`, returning its id.
    pub async fn create_order(&self) -> String {
        let response = self
            .post_as(
                "/api/v1/orders",
                json!({
                    "restaurant_id": "trattoria-1",
                    "items": [
                        { "menu_item_id": "margherita", "quantity": 2, "unit_price_cents": 850 },
                        { "menu_item_id": "birra", "quantity": 1, "unit_price_cents": 400, "preference": "cold" }
                    ],
                    "mode": "delivery"
                }),
                "alice",
                "customer",
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Drive an order to the point where its delivery row exists, returning
    /// (order_id, delivery_id).
    pub async fn create_accepted_order(&self) -> (String, String) {
        let order_id = self.create_order().await;
        let response = self
            .put_as(
                &format!("/api/v1/orders/{}/status", order_id),
                json!({ "status": "preparing" }),
                "staff-1",
                "restaurant_staff",
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

        let delivery = self
            .get(&format!("/api/v1/orders/{}/delivery", order_id))
            .await;
        assert_eq!(delivery.status, StatusCode::OK, "{:?}", delivery.body);
        let delivery_id = delivery.body["id"].as_str().unwrap().to_string();
        (order_id, delivery_id)
    }
}
