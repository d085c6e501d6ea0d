use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use db::{
    DBService,
    models::{
        record::{CreateRecord, Record},
        user::{User, UserRole},
    },
};
use serde_json::{Value, json};
use server::{Deployment, middleware::SESSION_COOKIE, routes};
use services::services::config::Config;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    app: Router,
    deployment: Deployment,
}

struct TestResponse {
    status: StatusCode,
    /// `name=value` of the session cookie, when the response set one.
    cookie: Option<String>,
    body: Value,
}

impl TestApp {
    async fn new() -> Self {
        let db = DBService::new_in_memory().await.unwrap();
        let deployment = Deployment::new(db, Config::for_tests()).unwrap();
        let app = routes::router(deployment.clone());
        Self { app, deployment }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let prefix = format!("{SESSION_COOKIE}=");
        let cookie = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with(&prefix))
            .and_then(|value| value.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse { status, cookie, body }
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, cookie, None).await
    }

    async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, cookie, Some(body)).await
    }

    async fn record(&self, title: &str, price_cents: i64, stock_quantity: i64) -> Record {
        let data = CreateRecord {
            title: title.to_string(),
            release_year: Some(1969),
            record_type: None,
            price_cents,
            stock_quantity,
            description: None,
            cover_image_url: None,
            release_id: None,
            manufacturer_profile_id: None,
        };
        Record::create(&self.deployment.db().pool, &data, Uuid::new_v4())
            .await
            .unwrap()
    }

    async fn user(&self, username: &str, role: UserRole) -> User {
        self.deployment
            .auth()
            .create_user(
                &self.deployment.db().pool,
                username,
                &format!("{username}@example.com"),
                "secret",
                role,
            )
            .await
            .unwrap()
    }

    /// Logs `username` in and returns the session cookie to send afterwards.
    async fn login(&self, username: &str) -> String {
        let response = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": format!("{username}@example.com"), "password": "secret" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.cookie.expect("login sets the session cookie")
    }

    async fn stock_of(&self, record_id: Uuid) -> i64 {
        Record::find_by_id(&self.deployment.db().pool, record_id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity
    }
}

#[tokio::test]
async fn health_reports_a_migrated_database() {
    let app = TestApp::new().await;

    let response = app.get("/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["is_initialized"], true);
    assert_eq!(response.body["data"]["missing_tables"], json!([]));
    assert!(response.cookie.is_none());
}

#[tokio::test]
async fn anonymous_visitor_gets_one_session() {
    let app = TestApp::new().await;

    let first = app.get("/api/cart", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["data"]["lines"], json!([]));
    let cookie = first.cookie.expect("fresh session sets a cookie");

    let second = app.get("/api/cart", Some(&cookie)).await;
    assert_eq!(second.status, StatusCode::OK);
    assert!(second.cookie.is_none());
}

#[tokio::test]
async fn register_login_and_logout() {
    let app = TestApp::new().await;

    let registered = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "username": "dana",
                "email": "dana@example.com",
                "password": "secret",
                "confirm_password": "secret"
            }),
        )
        .await;
    assert_eq!(registered.status, StatusCode::OK);
    assert_eq!(registered.body["data"]["role"], "customer");
    assert!(registered.body["data"].get("password_hash").is_none());

    let duplicate = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "username": "dana",
                "email": "other@example.com",
                "password": "secret",
                "confirm_password": "secret"
            }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let cookie = app.login("dana").await;
    let me = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(me.body["data"]["username"], "dana");

    let logout = app
        .request(Method::POST, "/api/auth/logout", Some(&cookie), None)
        .await;
    assert_eq!(logout.status, StatusCode::OK);

    let me = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(me.body["data"], Value::Null);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    app.user("erin", UserRole::Customer).await;

    let response = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "erin@example.com", "password": "wrong" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["message"], "Invalid email or password");
}

#[tokio::test]
async fn cart_refuses_more_than_stock() {
    let app = TestApp::new().await;
    let record = app.record("Abbey Road", 250_000, 2).await;
    let uri = format!("/api/cart/items/{}", record.id);

    let added = app.post(&uri, None, json!({ "quantity": 2 })).await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(added.body["message"], "Added \"Abbey Road\" to cart");
    assert_eq!(added.body["data"]["total_cents"], 500_000);
    let cookie = added.cookie.unwrap();

    let too_many = app.post(&uri, Some(&cookie), json!({ "quantity": 1 })).await;
    assert_eq!(too_many.status, StatusCode::CONFLICT);
    assert!(
        too_many.body["message"]
            .as_str()
            .unwrap()
            .starts_with("Not enough stock")
    );

    let over = app
        .request(Method::PUT, &uri, Some(&cookie), Some(json!({ "quantity": 3 })))
        .await;
    assert_eq!(over.status, StatusCode::CONFLICT);
    assert!(over.body["message"].as_str().unwrap().starts_with("Not enough stock"));

    let negative = app
        .request(Method::PUT, &uri, Some(&cookie), Some(json!({ "quantity": -1 })))
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let lowered = app
        .request(Method::PUT, &uri, Some(&cookie), Some(json!({ "quantity": 1 })))
        .await;
    assert_eq!(lowered.status, StatusCode::OK);
    assert_eq!(lowered.body["data"]["total_cents"], 250_000);

    let removed = app
        .request(Method::DELETE, &uri, Some(&cookie), None)
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["data"]["lines"], json!([]));
}

#[tokio::test]
async fn unknown_record_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .post(
            &format!("/api/cart/items/{}", Uuid::new_v4()),
            None,
            json!({}),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn checkout_requires_login() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/checkout",
            None,
            json!({ "shipping_address": "1 Main St", "payment_method": "card" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cart_survives_login_and_checks_out() {
    let app = TestApp::new().await;
    let record = app.record("Kind of Blue", 199_900, 5).await;
    app.user("frank", UserRole::Customer).await;

    let added = app
        .post(
            &format!("/api/cart/items/{}", record.id),
            None,
            json!({ "quantity": 2 }),
        )
        .await;
    let anonymous = added.cookie.unwrap();

    let login = app
        .post(
            "/api/auth/login",
            Some(&anonymous),
            json!({ "email": "frank@example.com", "password": "secret" }),
        )
        .await;
    let cookie = login.cookie.unwrap();
    assert_ne!(cookie, anonymous);

    let cart = app.get("/api/cart", Some(&cookie)).await;
    assert_eq!(cart.body["data"]["item_count"], 2);

    let placed = app
        .post(
            "/api/checkout",
            Some(&cookie),
            json!({ "shipping_address": "1 Main St", "payment_method": "card" }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.body);
    assert_eq!(placed.body["data"]["total_cents"], 399_800);
    assert_eq!(placed.body["data"]["status"], "processing");
    assert_eq!(placed.body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(app.stock_of(record.id).await, 3);

    let cart = app.get("/api/cart", Some(&cookie)).await;
    assert_eq!(cart.body["data"]["lines"], json!([]));

    let orders = app.get("/api/orders", Some(&cookie)).await;
    assert_eq!(orders.body["data"].as_array().unwrap().len(), 1);

    let order_id = placed.body["data"]["id"].as_str().unwrap();
    let cancelled = app
        .request(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["data"]["status"], "cancelled");
    assert_eq!(app.stock_of(record.id).await, 5);
}

#[tokio::test]
async fn empty_cart_checkout_is_rejected() {
    let app = TestApp::new().await;
    app.user("gina", UserRole::Customer).await;
    let cookie = app.login("gina").await;

    let response = app
        .post(
            "/api/checkout",
            Some(&cookie),
            json!({ "shipping_address": "1 Main St", "payment_method": "card" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Cart is empty");
}

#[tokio::test]
async fn admin_area_is_role_gated() {
    let app = TestApp::new().await;
    app.user("hank", UserRole::Customer).await;
    app.user("root", UserRole::Admin).await;
    app.record("Low", 100_000, 1).await;

    let anonymous = app.get("/api/admin/dashboard", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let customer = app.login("hank").await;
    let forbidden = app.get("/api/admin/dashboard", Some(&customer)).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let admin = app.login("root").await;
    let dashboard = app.get("/api/admin/dashboard", Some(&admin)).await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.body["data"]["record_count"], 1);
    assert_eq!(dashboard.body["data"]["low_stock"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_manages_the_catalog() {
    let app = TestApp::new().await;
    app.user("root", UserRole::Admin).await;
    let admin = app.login("root").await;

    let genre = app
        .post("/api/admin/genres", Some(&admin), json!({ "name": "Jazz" }))
        .await;
    assert_eq!(genre.status, StatusCode::CREATED);

    let duplicate = app
        .post("/api/admin/genres", Some(&admin), json!({ "name": "Jazz" }))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let genres = app.get("/api/genres", None).await;
    assert_eq!(genres.body["data"][0]["name"], "Jazz");

    let genre_id = genre.body["data"]["id"].as_str().unwrap();
    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/admin/genres/{genre_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let missing = app
        .request(
            Method::DELETE,
            &format!("/api/admin/genres/{genre_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manufacturer_lists_only_own_records() {
    let app = TestApp::new().await;
    app.user("root", UserRole::Admin).await;
    let admin = app.login("root").await;
    app.record("Someone Else's", 100_000, 1).await;

    let created = app
        .post(
            "/api/admin/manufacturers",
            Some(&admin),
            json!({
                "username": "pressing",
                "email": "pressing@example.com",
                "password": "secret",
                "company_name": "Pressing Plant",
                "company_address": null
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);

    let cookie = app.login("pressing").await;
    let added = app
        .post(
            "/api/my-records",
            Some(&cookie),
            json!({ "title": "  Fresh Press ", "price_cents": 120_000, "stock_quantity": 10 }),
        )
        .await;
    assert_eq!(added.status, StatusCode::CREATED, "{}", added.body);
    assert_eq!(added.body["data"]["title"], "Fresh Press");

    let mine = app.get("/api/my-records", Some(&cookie)).await;
    let titles: Vec<&str> = mine.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Fresh Press"]);

    let invalid = app
        .post(
            "/api/my-records",
            Some(&cookie),
            json!({ "title": "Free", "price_cents": -1, "stock_quantity": 1 }),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customers_cannot_reach_manufacturer_screens() {
    let app = TestApp::new().await;
    app.user("ivy", UserRole::Customer).await;
    let cookie = app.login("ivy").await;

    let response = app.get("/api/my-records", Some(&cookie)).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn record_search_filters_and_paginates() {
    let app = TestApp::new().await;
    app.record("Blue Train", 150_000, 3).await;
    app.record("Blue Monk", 160_000, 0).await;
    app.record("Giant Steps", 170_000, 4).await;

    let blue = app.get("/api/records?search=blue", None).await;
    assert_eq!(blue.status, StatusCode::OK);
    assert_eq!(blue.body["data"]["total"], 2);

    let in_stock = app
        .get("/api/records?search=blue&in_stock_only=true", None)
        .await;
    assert_eq!(in_stock.body["data"]["total"], 1);
    assert_eq!(in_stock.body["data"]["records"][0]["title"], "Blue Train");

    let paged = app.get("/api/records?per_page=2&page=2", None).await;
    assert_eq!(paged.body["data"]["total"], 3);
    assert_eq!(paged.body["data"]["total_pages"], 2);
    assert_eq!(paged.body["data"]["records"].as_array().unwrap().len(), 1);

    let missing = app
        .get(&format!("/api/records/{}", Uuid::new_v4()), None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
