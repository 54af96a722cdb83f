//! Router-level tests: the full middleware stack over the in-memory store
//! and the mock payment gateway.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use zapshift::payment_gateway::MockPaymentGateway;
use zapshift::store::memory::{Catalog, InMemoryStore};
use zapshift::store::Stores;
use zapshift::{AppState, Config, app};
use zapshift_core::FixedClock;
use zapshift_core::catalog::Warehouse;
use zapshift_web::CORRELATION_ID_HEADER;

const ORIGIN: &str = "http://localhost:5173";

struct TestApp {
    router: Router,
    gateway: MockPaymentGateway,
    store: InMemoryStore,
}

fn test_app_with(vars: &[(&str, &str)]) -> TestApp {
    let mut vars: Vec<(String, String)> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    vars.push(("CLIENT_URL".to_string(), ORIGIN.to_string()));
    let config = Config::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    });

    let store = InMemoryStore::with_catalog(Catalog {
        warehouses: vec![warehouse("w1", "active"), warehouse("w2", "inactive")],
        ..Catalog::default()
    });
    let gateway = MockPaymentGateway::new();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap());
    let state = AppState::new(
        Stores::from_backend(store.clone()),
        Arc::new(gateway.clone()),
        Arc::new(clock),
        &config,
    );

    TestApp {
        router: app(state, &config),
        gateway,
        store,
    }
}

fn test_app() -> TestApp {
    test_app_with(&[])
}

fn warehouse(id: &str, status: &str) -> Warehouse {
    serde_json::from_value(json!({
        "_id": id,
        "region": "Dhaka",
        "district": format!("District {id}"),
        "city": "Dhaka",
        "covered_area": ["Mirpur"],
        "status": status,
        "flowchart": "https://example.com/internal.png"
    }))
    .unwrap()
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn json(&self, method: Method, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn checkout(&self, parcel_id: &str, origin: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::post("/create-checkout-session")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(origin) = origin {
            request = request.header(header::ORIGIN, origin);
        }
        let request = request
            .body(Body::from(json!({ "parcelId": parcel_id }).to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn create_parcel(&self) -> Value {
        let (status, parcel) = self
            .json(
                Method::POST,
                "/create-parcel",
                &json!({
                    "parcelType": "non-document",
                    "parcelName": "Books",
                    "weight": 2.5,
                    "senderEmail": "sender@example.com",
                    "senderDivision": "A",
                    "receiverDivision": "B"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        parcel
    }
}

fn session_id(url: &str) -> &str {
    url.rsplit('/').next().unwrap()
}

#[tokio::test]
async fn parcel_is_priced_paid_and_settled_once() {
    let app = test_app();

    let parcel = app.create_parcel().await;
    assert_eq!(parcel["deliveryCost"], 15000);
    assert_eq!(parcel["status"], "pending");
    assert_eq!(parcel["paymentStatus"], "unpaid");
    assert_eq!(parcel["state"], json!([]));
    let parcel_id = parcel["_id"].as_str().unwrap().to_string();

    let (status, session) = app.checkout(&parcel_id, Some(ORIGIN)).await;
    assert_eq!(status, StatusCode::OK);
    let session_id = session_id(session["url"].as_str().unwrap()).to_string();
    assert!(app.gateway.complete(&session_id, true).unwrap());

    let uri = format!("/update-paymentStatus?session_id={session_id}");
    let (status, receipt) = app.json(Method::PATCH, &uri, &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["amount"], 150.0);
    assert_eq!(receipt["currency"], "usd");
    assert_eq!(receipt["parcelId"], parcel_id);
    assert!(receipt["transactionId"].as_str().unwrap().starts_with("pi_mock_"));

    let (status, tracked) = app.get(&format!("/track-parcel/{parcel_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tracked["paymentStatus"], "paid");
    assert_eq!(tracked["state"].as_array().unwrap().len(), 1);
    assert_eq!(tracked["state"][0]["title"], "Payment Successful");

    let (status, error) = app.json(Method::PATCH, &uri, &json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "ALREADY_SETTLED");
    let (_, unchanged) = app.get(&format!("/track-parcel/{parcel_id}")).await;
    assert_eq!(unchanged, tracked);
}

#[tokio::test]
async fn session_id_may_come_from_the_body() {
    let app = test_app();
    let parcel = app.create_parcel().await;
    let (_, session) = app.checkout(parcel["_id"].as_str().unwrap(), Some(ORIGIN)).await;
    let session_id = session_id(session["url"].as_str().unwrap()).to_string();
    app.gateway.complete(&session_id, true).unwrap();

    let (status, _) = app
        .json(
            Method::PATCH,
            "/update-paymentStatus",
            &json!({ "sessionId": session_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, error) = app
        .json(Method::PATCH, "/update-paymentStatus", &json!({}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unpaid_and_open_sessions_are_reported() {
    let app = test_app();
    let parcel = app.create_parcel().await;
    let parcel_id = parcel["_id"].as_str().unwrap().to_string();
    let (_, session) = app.checkout(&parcel_id, Some(ORIGIN)).await;
    let session_id = session_id(session["url"].as_str().unwrap()).to_string();
    let uri = format!("/update-paymentStatus?session_id={session_id}");

    let (status, error) = app.json(Method::PATCH, &uri, &json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "SESSION_INCOMPLETE");

    app.gateway.complete(&session_id, false).unwrap();
    let (status, error) = app.json(Method::PATCH, &uri, &json!({})).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(error["code"], "PAYMENT_NOT_COMPLETED");

    let (_, tracked) = app.get(&format!("/track-parcel/{parcel_id}")).await;
    assert_eq!(tracked["paymentStatus"], "failed");
    assert_eq!(tracked["state"][0]["title"], "Payment Failed");
}

#[tokio::test]
async fn checkout_requires_an_allowed_origin() {
    let app = test_app();
    let parcel = app.create_parcel().await;
    let parcel_id = parcel["_id"].as_str().unwrap();

    let (status, error) = app.checkout(parcel_id, Some("https://evil.example.com")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["code"], "FORBIDDEN");

    let (status, _) = app.checkout(parcel_id, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, error) = app.checkout("no-such-parcel", Some(ORIGIN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NOT_FOUND");

    assert!(app.gateway.requests().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_parcel_fails_open_or_closed() {
    let open = test_app();
    let (status, body) = open.get("/track-parcel/missing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let closed = test_app_with(&[("FAIL_OPEN_READS", "false")]);
    let (status, body) = closed.get("/track-parcel/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn invalid_parcel_is_rejected() {
    let app = test_app();
    let (status, error) = app
        .json(
            Method::POST,
            "/create-parcel",
            &json!({ "parcelType": "document", "senderEmail": "a@example.com", "receiverDivision": "B" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "VALIDATION_ERROR");
    assert_eq!(app.store.parcel_count().unwrap(), 0);
}

#[tokio::test]
async fn rider_applications_are_unique_and_decidable() {
    let app = test_app();
    let form = json!({ "name": "Rahim", "email": "rahim@example.com", "region": "Dhaka" });

    let (status, application) = app.json(Method::POST, "/rider-request", &form).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(application["status"], "pending");
    assert_eq!(application["role"], "user");

    let (status, error) = app.json(Method::POST, "/rider-request", &form).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "DUPLICATE_APPLICATION");
    assert_eq!(app.store.application_count().unwrap(), 1);

    let decision = json!({ "id": application["_id"], "status": "approved" });
    let (status, decided) = app
        .json(Method::PATCH, "/rider-requests-status", &decision)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["role"], "rider");
    assert_eq!(decided["status"], "approved");

    let (status, riders) = app.get("/find-employees?role=rider&status=approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(riders["total"], 1);
    assert_eq!(riders["items"][0]["email"], "rahim@example.com");

    let unknown = json!({ "id": "missing", "status": "rejected" });
    let (status, _) = app
        .json(Method::PATCH, "/rider-requests-status", &unknown)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn parcel_listing_is_paginated() {
    let app = test_app();
    for _ in 0..3 {
        app.create_parcel().await;
    }

    let (status, page) = app
        .get("/parcel-data?email=sender@example.com&status=pending&limit=2")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let (_, empty) = app.get("/parcel-data?email=nobody@example.com").await;
    assert_eq!(empty, json!({ "items": [], "total": 0 }));
}

#[tokio::test]
async fn reports_and_reference_data() {
    let app = test_app();
    app.create_parcel().await;

    let (status, report) = app.get("/track-deliveries").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["statesResult"], json!([{ "status": "pending", "count": 1 }]));
    assert_eq!(report["deliveriesResult"], json!([]));

    let (status, deliveries) = app.get("/rider-deliveries?email=rider@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deliveries, json!([]));

    let (_, warehouses) = app.get("/ware-houses").await;
    assert_eq!(warehouses.as_array().unwrap().len(), 1);
    assert!(warehouses[0].get("status").is_none());
    assert!(warehouses[0].get("flowchart").is_none());

    let (_, branches) = app.get("/branches").await;
    assert_eq!(branches, json!([{ "region": "Dhaka", "district": "District w1" }]));

    let (status, divisions) = app.get("/divisions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(divisions, json!([]));
}

#[tokio::test]
async fn health_endpoints_and_correlation_header() {
    let app = test_app();

    let (status, banner) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(banner, Value::String("ZapShift server is running".to_string()));

    let (status, health) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    let (status, ready) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["status"], "ok");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/health")
                .header(CORRELATION_ID_HEADER, "trace-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers().get(CORRELATION_ID_HEADER).unwrap(), "trace-42");
}
