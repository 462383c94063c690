//! # Integration Tests for pawmart-api
//!
//! Drives the full router in-process: storefront browsing, cart, checkout
//! with stock deduction and cancellation restock, reservation lifecycle,
//! admin back office, authentication, and transactional mail delivery.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use zeroize::Zeroizing;

use pawmart_api::auth::{self, Role};
use pawmart_api::config::AppConfig;
use pawmart_api::state::{AppState, UserRecord};

const ADMIN: &str = "admin-test-token";

struct TestApp {
    state: AppState,
    router: axum::Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with_mail(None)
    }

    fn with_mail(mail: Option<pawmart_mail::MailClient>) -> Self {
        Self::build(AppConfig::default(), mail)
    }

    fn with_rate_limit(per_minute: u64) -> Self {
        let config = AppConfig {
            rate_limit_per_minute: per_minute,
            ..AppConfig::default()
        };
        Self::build(config, None)
    }

    fn build(config: AppConfig, mail: Option<pawmart_mail::MailClient>) -> Self {
        let config = AppConfig {
            admin_token: Some(Zeroizing::new(ADMIN.to_string())),
            ..config
        };
        let state = AppState::with_config(config, mail, None);
        let router = pawmart_api::app(state.clone());
        Self { state, router }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    /// A customer account with a cheap password hash and a live session.
    async fn customer(&self, email: &str) -> (Uuid, String) {
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Test Customer".into(),
            phone: None,
            role: Role::Customer,
            password_hash: auth::hash_password_with_rounds("correct horse", 1),
            created_at: now,
            updated_at: now,
        };
        self.state.users.insert(user.id, user.clone());
        let session = auth::issue_session(&self.state, user.id).await.unwrap();
        (user.id, session.token)
    }

    async fn create_product(&self, name: &str, price: &str, stock: u32) -> Value {
        let (status, body) = self
            .post(
                "/v1/admin/products",
                Some(ADMIN),
                json!({
                    "name": name,
                    "description": format!("{name} description"),
                    "category": "toys",
                    "species": ["dog"],
                    "price": price,
                    "stock": stock,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    async fn create_pet(&self, name: &str) -> Value {
        let (status, body) = self
            .post(
                "/v1/admin/pets",
                Some(ADMIN),
                json!({
                    "name": name,
                    "species": "dog",
                    "breed": "Beagle",
                    "age_months": 14,
                    "size": "medium",
                    "sex": "male",
                    "adoption_fee": "120.00",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

fn address() -> Value {
    json!({
        "full_name": "Ada Lovelace",
        "line1": "12 Analytical Way",
        "city": "London",
        "postal_code": "N1 7AA",
        "country": "UK",
    })
}

fn visit_slot(hour: u32) -> String {
    (Utc::now() + Duration::days(2))
        .date_naive()
        .and_hms_opt(hour, 15, 0)
        .unwrap()
        .and_utc()
        .to_rfc3339()
}

// -- Health & OpenAPI ---------------------------------------------------------

#[tokio::test]
async fn test_health_probes() {
    let app = TestApp::new();
    let (status, body) = app.get("/health/liveness", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
    let (status, body) = app.get("/health/readiness", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ready"));
}

#[tokio::test]
async fn test_openapi_is_public() {
    let app = TestApp::new();
    let (status, body) = app.get("/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/checkout"].is_object());
}

#[tokio::test]
async fn test_rate_limit_through_router() {
    let app = TestApp::with_rate_limit(2);
    for _ in 0..2 {
        let (status, _) = app.get("/v1/products", None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app.get("/v1/products", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    // Probes sit outside the limiter.
    let (status, _) = app.get("/health/liveness", None).await;
    assert_eq!(status, StatusCode::OK);
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_register_login_me_logout() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/v1/auth/register",
            None,
            json!({"email": " Ada@Example.com ", "password": "s3cure-pass", "name": "Ada"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["account"]["email"], "ada@example.com");
    assert_eq!(body["account"]["role"], "customer");
    assert!(body["account"].get("password_hash").is_none());

    let (status, body) = app
        .post(
            "/v1/auth/register",
            None,
            json!({"email": "ada@example.com", "password": "another-pass", "name": "Ada 2"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = app
        .post(
            "/v1/auth/login",
            None,
            json!({"email": "ada@example.com", "password": "wrong-pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/v1/auth/login",
            None,
            json!({"email": "ADA@example.com", "password": "s3cure-pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["session"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");

    let (status, _) = app
        .send(Method::POST, "/v1/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get("/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_short_password_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/v1/auth/register",
            None,
            json!({"email": "bo@example.com", "password": "short", "name": "Bo"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new();
    let (status, body) = app.get("/v1/cart", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = app.get("/v1/cart", Some("not.a-session")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_cannot_reach_admin_routes() {
    let app = TestApp::new();
    let (_, token) = app.customer("cy@example.com").await;
    let (status, body) = app.get("/v1/admin/dashboard", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_admin_token_has_no_cart() {
    let app = TestApp::new();
    let (status, _) = app.get("/v1/cart", Some(ADMIN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_promoted_user_gains_admin_access() {
    let app = TestApp::new();
    let (user_id, token) = app.customer("staff@example.com").await;
    let (status, body) = app
        .put(
            &format!("/v1/admin/users/{user_id}/role"),
            Some(ADMIN),
            json!({"role": "admin"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    let (status, _) = app.get("/v1/admin/dashboard", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_registration_creates_one_account() {
    let app = TestApp::new();
    let register = || {
        app.post(
            "/v1/auth/register",
            None,
            json!({"email": "twin@example.com", "password": "s3cure-pass", "name": "Twin"}),
        )
    };
    let ((a, _), (b, _)) = tokio::join!(register(), register());
    let mut statuses = [a, b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
    assert_eq!(
        app.state.users.filter(|u| u.email == "twin@example.com").len(),
        1
    );
}

#[tokio::test]
async fn test_admin_cannot_demote_self() {
    let app = TestApp::new();
    let (admin_id, admin) = app.customer("lead@example.com").await;
    app.state.users.update(&admin_id, |u| u.role = Role::Admin);
    let (customer_id, _) = app.customer("shopper@example.com").await;

    let (status, body) = app
        .put(
            &format!("/v1/admin/users/{admin_id}/role"),
            Some(&admin),
            json!({"role": "customer"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(app.state.users.get(&admin_id).unwrap().role, Role::Admin);

    let (status, body) = app
        .put(
            &format!("/v1/admin/users/{customer_id}/role"),
            Some(&admin),
            json!({"role": "admin"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["role"], "admin");
}

// -- Catalog ------------------------------------------------------------------

#[tokio::test]
async fn test_product_listing_filters_and_detail_by_slug() {
    let app = TestApp::new();
    app.create_product("Squeaky Ball", "4.99", 10).await;
    app.create_product("Rope Tug", "12.50", 0).await;
    let hidden = app.create_product("Old Frisbee", "3.00", 5).await;
    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/v1/admin/products/{}", hidden["id"].as_str().unwrap()),
            Some(ADMIN),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get("/v1/products?sort=price_asc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["name"], "Squeaky Ball");

    let (_, body) = app.get("/v1/products?in_stock=true&q=rope", None).await;
    assert_eq!(body["total"], 0);

    let (status, _) = app.get("/v1/products?min_price=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/v1/products/squeaky-ball", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], "4.99");

    let (status, _) = app.get("/v1/products/old-frisbee", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_slug_is_conflict() {
    let app = TestApp::new();
    app.create_product("Chew Toy", "2.00", 1).await;
    let (status, _) = app
        .post(
            "/v1/admin/products",
            Some(ADMIN),
            json!({"name": "Chew  Toy!", "category": "toys", "price": "3.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_renaming_to_taken_slug_is_conflict() {
    let app = TestApp::new();
    app.create_product("Chew Toy", "2.00", 1).await;
    let rope = app.create_product("Rope Toy", "3.00", 1).await;
    let rope_id = rope["id"].as_str().unwrap();

    let (status, _) = app
        .put(
            &format!("/v1/admin/products/{rope_id}"),
            Some(ADMIN),
            json!({"name": "Rope Toy", "slug": "chew-toy", "category": "toys", "price": "3.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, rope) = app.get(&format!("/v1/products/{rope_id}"), None).await;
    assert_eq!(rope["slug"], "rope-toy");

    // Keeping its own slug is fine.
    let (status, body) = app
        .put(
            &format!("/v1/admin/products/{rope_id}"),
            Some(ADMIN),
            json!({"name": "Rope Toy", "category": "toys", "price": "3.50", "stock": 4}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["price"], "3.50");
}

// -- Cart & Checkout ----------------------------------------------------------

#[tokio::test]
async fn test_checkout_deducts_stock_and_cancel_restocks() {
    let app = TestApp::new();
    let (_, token) = app.customer("buyer@example.com").await;
    let ball = app.create_product("Tennis Ball", "10.00", 5).await;
    let ball_id = ball["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/v1/cart/items",
            Some(&token),
            json!({"product_id": ball_id, "quantity": 3}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["quote"]["subtotal"], "30.00");
    // Below the 50.00 free-shipping threshold: flat 5.99, 8% tax.
    assert_eq!(body["quote"]["shipping"], "5.99");
    assert_eq!(body["quote"]["tax"], "2.40");
    assert_eq!(body["quote"]["total"], "38.39");

    let (status, order) = app
        .post(
            "/v1/checkout",
            Some(&token),
            json!({"shipping_address": address(), "payment_method": "cash_on_delivery"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["total"], "38.39");
    assert_eq!(order["contact_email"], "buyer@example.com");
    assert!(order["order_number"].as_str().unwrap().starts_with("PM-"));

    let (_, product) = app.get(&format!("/v1/products/{ball_id}"), None).await;
    assert_eq!(product["stock"], 2);

    let (_, cart) = app.get("/v1/cart", Some(&token)).await;
    assert_eq!(cart["lines"], json!([]));

    let (_, orders) = app.get("/v1/orders", Some(&token)).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let order_id = order["id"].as_str().unwrap();
    let (status, cancelled) = app
        .send(
            Method::POST,
            &format!("/v1/orders/{order_id}/cancel"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    let (_, product) = app.get(&format!("/v1/products/{ball_id}"), None).await;
    assert_eq!(product["stock"], 5);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/v1/orders/{order_id}/cancel"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, dashboard) = app.get("/v1/admin/dashboard", Some(ADMIN)).await;
    assert_eq!(dashboard["metrics"]["orders_placed"], 1);
    assert_eq!(dashboard["revenue"], "0.00");
}

#[tokio::test]
async fn test_checkout_reports_every_stock_conflict() {
    let app = TestApp::new();
    let (_, token) = app.customer("late@example.com").await;
    let a = app.create_product("Cat Tree", "60.00", 2).await;
    let b = app.create_product("Laser Pointer", "8.00", 4).await;
    let (a_id, b_id) = (a["id"].as_str().unwrap(), b["id"].as_str().unwrap());

    app.post("/v1/cart/items", Some(&token), json!({"product_id": a_id, "quantity": 2}))
        .await;
    app.post("/v1/cart/items", Some(&token), json!({"product_id": b_id, "quantity": 1}))
        .await;

    // Stock drops and a product is withdrawn after the items were added.
    app.put(
        &format!("/v1/admin/products/{a_id}/stock"),
        Some(ADMIN),
        json!({"stock": 1}),
    )
    .await;
    app.send(
        Method::DELETE,
        &format!("/v1/admin/products/{b_id}"),
        Some(ADMIN),
        None,
    )
    .await;

    let (status, body) = app
        .post(
            "/v1/checkout",
            Some(&token),
            json!({"shipping_address": address(), "payment_method": "card_on_delivery"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "STOCK_CONFLICT");
    let issues = body["error"]["details"].as_array().unwrap();
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0]["kind"], "insufficient_stock");
    assert_eq!(issues[0]["available"], 1);
    assert_eq!(issues[1]["kind"], "unavailable");

    // Nothing was deducted and the cart is intact.
    let (_, cart) = app.get("/v1/cart", Some(&token)).await;
    assert_eq!(cart["lines"].as_array().unwrap().len(), 2);
    assert_eq!(cart["issues"].as_array().unwrap().len(), 2);
    assert!(app.state.orders.is_empty());
}

#[tokio::test]
async fn test_empty_cart_checkout_is_validation_error() {
    let app = TestApp::new();
    let (_, token) = app.customer("empty@example.com").await;
    let (status, _) = app
        .post(
            "/v1/checkout",
            Some(&token),
            json!({"shipping_address": address(), "payment_method": "cash_on_delivery"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_free_shipping_over_threshold() {
    let app = TestApp::new();
    let (_, token) = app.customer("big@example.com").await;
    let bed = app.create_product("Orthopedic Bed", "89.00", 3).await;
    app.post(
        "/v1/cart/items",
        Some(&token),
        json!({"product_id": bed["id"], "quantity": 1}),
    )
    .await;
    let (status, body) = app
        .send(Method::POST, "/v1/checkout/quote", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quote"]["shipping"], "0.00");
    assert_eq!(body["quote"]["tax"], "7.12");
    assert_eq!(body["quote"]["total"], "96.12");
}

#[tokio::test]
async fn test_orders_are_private_and_admin_drives_status() {
    let app = TestApp::new();
    let (_, alice) = app.customer("alice@example.com").await;
    let (_, bob) = app.customer("bob@example.com").await;
    let toy = app.create_product("Puzzle Feeder", "20.00", 5).await;
    app.post(
        "/v1/cart/items",
        Some(&alice),
        json!({"product_id": toy["id"], "quantity": 1}),
    )
    .await;
    let (_, order) = app
        .post(
            "/v1/checkout",
            Some(&alice),
            json!({"shipping_address": address(), "payment_method": "cash_on_delivery"}),
        )
        .await;
    let order_id = order["id"].as_str().unwrap();

    let (status, _) = app.get(&format!("/v1/orders/{order_id}"), Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/v1/admin/orders/{order_id}/status");
    let (status, _) = app.put(&uri, Some(ADMIN), json!({"status": "SHIPPED"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, body) = app
        .put(&uri, Some(ADMIN), json!({"status": "PROCESSING"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status_history"].as_array().unwrap().len(), 2);

    // Customers can only cancel while PENDING.
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/v1/orders/{order_id}/cancel"),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, order) = app.get(&format!("/v1/orders/{order_id}"), Some(&alice)).await;
    assert_eq!(order["status"], "PROCESSING");
    let (_, toy) = app.get(&format!("/v1/products/{}", toy["id"].as_str().unwrap()), None).await;
    assert_eq!(toy["stock"], 4);

    let (_, listed) = app
        .get("/v1/admin/orders?status=PROCESSING", Some(ADMIN))
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

// -- Wishlist -----------------------------------------------------------------

#[tokio::test]
async fn test_wishlist_is_idempotent_and_moves_to_cart() {
    let app = TestApp::new();
    let (_, token) = app.customer("wish@example.com").await;
    let collar = app.create_product("Leather Collar", "15.00", 2).await;
    let id = collar["id"].as_str().unwrap();

    for _ in 0..2 {
        let (status, body) = app
            .post("/v1/wishlist/items", Some(&token), json!({"product_id": id}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    let (status, cart) = app
        .send(
            Method::POST,
            &format!("/v1/wishlist/items/{id}/move-to-cart"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"][0]["quantity"], 1);
    let (_, wishlist) = app.get("/v1/wishlist", Some(&token)).await;
    assert_eq!(wishlist, json!([]));
}

// -- Reservations -------------------------------------------------------------

#[tokio::test]
async fn test_reservation_lifecycle_updates_pet() {
    let app = TestApp::new();
    let (_, token) = app.customer("visitor@example.com").await;
    let (_, other) = app.customer("other@example.com").await;
    let pet = app.create_pet("Biscuit").await;
    let pet_id = pet["id"].as_str().unwrap();

    let booking = json!({
        "pet_id": pet_id,
        "scheduled_for": visit_slot(11),
        "party_size": 2,
        "contact_name": "Vi Sitor",
        "contact_email": "Visitor@Example.com",
    });
    let (status, reservation) = app.post("/v1/reservations", Some(&token), booking.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{reservation}");
    assert_eq!(reservation["status"], "PENDING");
    assert_eq!(reservation["contact_email"], "visitor@example.com");
    assert!(reservation["scheduled_for"].as_str().unwrap().contains("11:00:00"));

    // Same pet, same hour.
    let (status, _) = app.post("/v1/reservations", Some(&other), booking).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let id = reservation["id"].as_str().unwrap();
    let uri = format!("/v1/admin/reservations/{id}/status");
    let (status, _) = app.put(&uri, Some(ADMIN), json!({"status": "CONFIRMED"})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, pet) = app.get(&format!("/v1/pets/{pet_id}"), None).await;
    assert_eq!(pet["status"], "RESERVED");

    // A reserved pet takes no new bookings.
    let (status, _) = app
        .post(
            "/v1/reservations",
            Some(&other),
            json!({
                "pet_id": pet_id,
                "scheduled_for": visit_slot(14),
                "contact_name": "Other",
                "contact_email": "other@example.com",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/v1/reservations/{id}/cancel"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    let (_, pet) = app.get(&format!("/v1/pets/{pet_id}"), None).await;
    assert_eq!(pet["status"], "AVAILABLE");
}

#[tokio::test]
async fn test_reservation_outside_opening_hours_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.customer("night@example.com").await;
    let pet = app.create_pet("Luna").await;
    let (status, body) = app
        .post(
            "/v1/reservations",
            Some(&token),
            json!({
                "pet_id": pet["id"],
                "scheduled_for": visit_slot(21),
                "contact_name": "Night Owl",
                "contact_email": "night@example.com",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_cancelling_pending_visit_keeps_pet_hold() {
    let app = TestApp::new();
    let (_, token) = app.customer("visitor@example.com").await;
    let pet = app.create_pet("Pepper").await;
    let pet_id = pet["id"].as_str().unwrap();
    let (status, reservation) = app
        .post(
            "/v1/reservations",
            Some(&token),
            json!({
                "pet_id": pet_id,
                "scheduled_for": visit_slot(10),
                "contact_name": "Vi Sitor",
                "contact_email": "visitor@example.com",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{reservation}");

    // Staff hold the pet by hand while the visit is still pending.
    let pet_uuid: Uuid = pet_id.parse().unwrap();
    app.state
        .pets
        .update(&pet_uuid, |p| p.status = pawmart_core::AdoptionStatus::Reserved);

    let id = reservation["id"].as_str().unwrap();
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/v1/reservations/{id}/cancel"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, pet) = app.get(&format!("/v1/pets/{pet_id}"), None).await;
    assert_eq!(pet["status"], "RESERVED");
}

#[tokio::test]
async fn test_deleting_pet_with_active_visit_is_conflict() {
    let app = TestApp::new();
    let (_, token) = app.customer("visitor@example.com").await;
    let pet = app.create_pet("Mochi").await;
    let pet_id = pet["id"].as_str().unwrap();
    let (_, reservation) = app
        .post(
            "/v1/reservations",
            Some(&token),
            json!({
                "pet_id": pet_id,
                "scheduled_for": visit_slot(13),
                "contact_name": "Vi Sitor",
                "contact_email": "visitor@example.com",
            }),
        )
        .await;

    let uri = format!("/v1/admin/pets/{pet_id}");
    let (status, body) = app.send(Method::DELETE, &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let id = reservation["id"].as_str().unwrap();
    app.send(
        Method::POST,
        &format!("/v1/reservations/{id}/cancel"),
        Some(&token),
        None,
    )
    .await;
    let (status, _) = app.send(Method::DELETE, &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/v1/pets/{pet_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Content ------------------------------------------------------------------

#[tokio::test]
async fn test_team_and_gallery_pages() {
    let app = TestApp::new();
    for (name, order, active) in [("Zed", 2, true), ("Amy", 1, true), ("Old", 0, false)] {
        let (status, _) = app
            .post(
                "/v1/admin/team",
                Some(ADMIN),
                json!({"name": name, "position": "Keeper", "display_order": order, "active": active}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, team) = app.get("/v1/team", None).await;
    let names: Vec<_> = team
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Amy", "Zed"]);

    let (status, _) = app
        .post(
            "/v1/admin/gallery",
            Some(ADMIN),
            json!({"title": "Happy tails", "image_url": "https://img.example/1.jpg", "tags": ["Dogs"]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, gallery) = app.get("/v1/gallery?tag=dogs", None).await;
    assert_eq!(gallery.as_array().unwrap().len(), 1);
    let (_, gallery) = app.get("/v1/gallery?tag=cats", None).await;
    assert_eq!(gallery, json!([]));
}

// -- Mail ---------------------------------------------------------------------

#[tokio::test]
async fn test_order_confirmation_email_is_sent() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
        .mount(&server)
        .await;

    let config = pawmart_mail::MailConfig::local_mock(&server.uri(), "test-key").unwrap();
    let client = pawmart_mail::MailClient::new(config).unwrap();
    let app = TestApp::with_mail(Some(client));
    let (_, token) = app.customer("mail@example.com").await;
    let bowl = app.create_product("Steel Bowl", "9.00", 4).await;
    app.post(
        "/v1/cart/items",
        Some(&token),
        json!({"product_id": bowl["id"], "quantity": 1}),
    )
    .await;
    let (status, _) = app
        .post(
            "/v1/checkout",
            Some(&token),
            json!({"shipping_address": address(), "payment_method": "cash_on_delivery"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Delivery happens on a background task.
    let mut received = Vec::new();
    for _ in 0..50 {
        received = server.received_requests().await.unwrap_or_default();
        if !received.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(received.len(), 1);
    let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(sent["to"], json!(["mail@example.com"]));
    assert!(sent["subject"].as_str().unwrap().contains("confirmed"));
}
