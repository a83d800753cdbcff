//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use api::AppState;
use api::auth::ADMIN_ROLE;
use api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use common::ProductId;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::InventoryLedger;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    state: Arc<AppState>,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    async fn with_config(config: Config) -> Self {
        let state = Arc::new(AppState::in_memory(&config));
        for (sku, stock) in [("A", 10), ("B", 1)] {
            state
                .lifecycle
                .ledger()
                .set_stock(&ProductId::new(sku), stock)
                .await
                .unwrap();
        }
        let app = api::create_app(state.clone(), get_metrics_handle());
        Self { app, state }
    }

    fn token(&self, subject: &str, role: &str) -> String {
        self.state
            .auth
            .issue(subject, role, Duration::hours(1))
            .unwrap()
    }

    fn admin(&self) -> String {
        self.token("admin-1", ADMIN_ROLE)
    }

    fn customer(&self) -> String {
        self.token("user-1", "customer")
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn stock(&self, sku: &str) -> u32 {
        self.state
            .lifecycle
            .ledger()
            .stock_level(&ProductId::new(sku))
            .await
            .unwrap()
    }

    /// Places the canonical two-widget order and returns its id.
    async fn place(&self, reference: &str) -> String {
        let (status, json) = self
            .send(
                "POST",
                "/orders",
                Some(&self.customer()),
                Some(order_body(reference)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["order"]["id"].as_str().unwrap().to_string()
    }
}

fn order_body(reference: &str) -> Value {
    json!({
        "items": [{ "productId": "A", "name": "Widget", "price": 100, "quantity": 2 }],
        "shippingAddress": {
            "fullName": "Test Customer",
            "email": "customer@example.com",
            "phone": "555-0100",
            "street": "1 Main St",
            "city": "Springfield",
            "postalCode": "12345",
            "country": "US"
        },
        "paymentIntentId": reference,
        "subtotal": 200,
        "shippingCost": 10,
        "total": 210
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let (status, json) = app.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new().await;
    app.place("cod_1").await;

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_placed_total"));
}

#[tokio::test]
async fn test_create_cash_on_delivery_order() {
    let app = TestApp::new().await;

    let (status, json) = app
        .send(
            "POST",
            "/orders",
            Some(&app.customer()),
            Some(order_body("cod_1718000000")),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    let order = &json["order"];
    assert_eq!(order["orderNumber"], "ORD-000001");
    assert_eq!(order["paymentInfo"]["paymentMethod"], "cash_on_delivery");
    assert_eq!(order["paymentInfo"]["paymentStatus"], "pending");
    assert_eq!(order["orderStatus"], "pending");
    assert_eq!(order["customerId"], "user-1");
    assert_eq!(order["total"], 210);
    assert_eq!(app.stock("A").await, 8);
}

#[tokio::test]
async fn test_create_requires_token() {
    let app = TestApp::new().await;

    let (status, json) = app
        .send("POST", "/orders", None, Some(order_body("cod_1")))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);

    let (status, _) = app
        .send("POST", "/orders", Some("not-a-jwt"), Some(order_body("cod_1")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.stock("A").await, 10);
}

#[tokio::test]
async fn test_create_validation_error() {
    let app = TestApp::new().await;
    let mut body = order_body("cod_1");
    body["total"] = json!(999);

    let (status, json) = app
        .send("POST", "/orders", Some(&app.customer()), Some(body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["field"], "total");
    assert_eq!(app.stock("A").await, 10);
}

#[tokio::test]
async fn test_overflowing_amounts_are_bad_request() {
    let app = TestApp::new().await;
    let mut body = order_body("cod_1");
    body["subtotal"] = json!(i64::MAX);
    body["shippingCost"] = json!(1);
    body["total"] = json!(5);

    let (status, json) = app
        .send("POST", "/orders", Some(&app.customer()), Some(body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["field"], "total");
    assert_eq!(app.stock("A").await, 10);
}

#[tokio::test]
async fn test_fractional_amounts_are_bad_request() {
    let app = TestApp::new().await;
    let mut body = order_body("cod_1");
    body["total"] = json!(2.10);

    let (status, json) = app
        .send("POST", "/orders", Some(&app.customer()), Some(body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(app.stock("A").await, 10);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new().await;

    let (status, json) = app
        .send(
            "POST",
            "/orders",
            Some(&app.customer()),
            Some(json!({ "items": "nope" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_insufficient_stock_is_rejected_atomically() {
    let app = TestApp::new().await;
    let mut body = order_body("cod_1");
    body["items"] = json!([
        { "productId": "A", "name": "Widget", "price": 100, "quantity": 2 },
        { "productId": "B", "name": "Gadget", "price": 0, "quantity": 2 }
    ]);

    let (status, json) = app
        .send("POST", "/orders", Some(&app.customer()), Some(body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Insufficient stock"));
    assert_eq!(app.stock("A").await, 10);
    assert_eq!(app.stock("B").await, 1);
}

#[tokio::test]
async fn test_payment_completion_advances_order() {
    let app = TestApp::new().await;
    let id = app.place("cod_1").await;

    let (status, json) = app
        .send(
            "PATCH",
            &format!("/orders/{id}/payment-status"),
            Some(&app.admin()),
            Some(json!({ "paymentStatus": "completed" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["paymentInfo"]["paymentStatus"], "completed");
    assert!(json["order"]["paymentInfo"]["paidAt"].is_string());
    assert_eq!(json["order"]["orderStatus"], "processing");
}

#[tokio::test]
async fn test_status_transitions() {
    let app = TestApp::new().await;
    let id = app.place("cod_1").await;
    let admin = app.admin();
    let uri = format!("/orders/{id}/status");

    let (status, _) = app
        .send("PATCH", &uri, Some(&admin), Some(json!({ "orderStatus": "delivered" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .send("PATCH", &uri, Some(&admin), Some(json!({ "orderStatus": "processing" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Payment"));

    let (status, _) = app
        .send("PATCH", &uri, Some(&admin), Some(json!({ "orderStatus": "shipped" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .send("PATCH", &uri, Some(&admin), Some(json!({ "orderStatus": "delivered" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["orderStatus"], "delivered");
    assert!(json["order"]["deliveredAt"].is_string());

    let (status, _) = app
        .send("PATCH", &uri, Some(&admin), Some(json!({ "orderStatus": "teleported" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_routes_require_admin() {
    let app = TestApp::new().await;
    let id = app.place("cod_1").await;

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/orders/{id}/status"),
            Some(&app.customer()),
            Some(json!({ "orderStatus": "cancelled" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let missing = common::OrderId::new();

    let (status, json) = app
        .send(
            "PATCH",
            &format!("/orders/{missing}/status"),
            Some(&app.admin()),
            Some(json!({ "orderStatus": "shipped" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_get_order_visibility() {
    let app = TestApp::new().await;
    let id = app.place("cod_1").await;
    let uri = format!("/orders/{id}");

    let (status, json) = app.send("GET", &uri, Some(&app.customer()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["id"], id.as_str());

    let stranger = app.token("user-2", "customer");
    let (status, _) = app.send("GET", &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("GET", &uri, Some(&app.admin()), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_orders_with_filters_and_counts() {
    let app = TestApp::new().await;
    app.place("cod_1").await;
    app.place("pi_2").await;
    app.place("bank_transfer_3").await;

    let (status, json) = app
        .send(
            "GET",
            "/orders?paymentMethod=card",
            Some(&app.admin()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["orders"][0]["orderNumber"], "ORD-000002");
    assert_eq!(json["statusCounts"]["pending"], 2);
    assert_eq!(json["statusCounts"]["processing"], 1);
    assert_eq!(json["statusCounts"]["delivered"], 0);

    let (status, json) = app
        .send("GET", "/orders?orderStatus=pending", Some(&app.admin()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);

    let (status, _) = app.send("GET", "/orders", Some(&app.customer()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_dashboard_stats() {
    let app = TestApp::with_config(Config {
        user_count: 7,
        ..Config::default()
    })
    .await;
    app.place("pi_1").await;
    app.place("cod_2").await;

    let (status, json) = app
        .send("GET", "/dashboard/stats", Some(&app.admin()), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    let stats = &json["stats"];
    assert_eq!(stats["totalOrders"], 2);
    assert_eq!(stats["totalRevenue"], 210);
    assert_eq!(stats["completedOrders"], 1);
    assert_eq!(stats["totalProducts"], 2);
    assert_eq!(stats["totalUsers"], 7);
    assert_eq!(stats["recentOrders"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_revenue_analytics() {
    let app = TestApp::new().await;
    app.place("pi_1").await;

    let (status, json) = app
        .send("GET", "/analytics/revenue?period=30d", Some(&app.admin()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["period"], "30d");
    let series = json["series"].as_array().unwrap();
    assert_eq!(series.len(), 30);
    assert_eq!(series.last().unwrap()["revenue"], 210);
    let total: i64 = series.iter().map(|day| day["revenue"].as_i64().unwrap()).sum();
    assert_eq!(total, 210);

    let (status, json) = app
        .send("GET", "/analytics/revenue", Some(&app.admin()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["series"].as_array().unwrap().len(), 7);

    let (status, _) = app
        .send("GET", "/analytics/revenue?period=1y", Some(&app.admin()), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inventory_endpoints() {
    let app = TestApp::new().await;
    let admin = app.admin();

    let (status, json) = app
        .send("PUT", "/inventory/C", Some(&admin), Some(json!({ "stock": 4 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stock"], 4);

    let (status, json) = app.send("GET", "/inventory/C", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["productId"], "C");
    assert_eq!(json["stock"], 4);

    let (status, _) = app.send("GET", "/inventory/missing", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send("GET", "/inventory/C", Some(&app.customer()), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cancel_restocks_when_configured() {
    let app = TestApp::with_config(Config {
        restock_on_cancel: true,
        ..Config::default()
    })
    .await;
    let id = app.place("cod_1").await;
    assert_eq!(app.stock("A").await, 8);

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/orders/{id}/status"),
            Some(&app.admin()),
            Some(json!({ "orderStatus": "cancelled" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock("A").await, 10);
}
