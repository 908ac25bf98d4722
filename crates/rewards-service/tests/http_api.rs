//! HTTP 接口集成测试
//!
//! 通过 `tower::ServiceExt::oneshot` 直接驱动路由，不监听端口

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::TestHarness;
use fake::{Fake, faker::internet::en::SafeEmail};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sykle_rewards::routes;
use tower::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
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

/// 创建用户并同步 10km 骑行（1000 积分）
async fn rider_with_1000_points(app: &Router) -> String {
    let email: String = SafeEmail().fake();
    let (status, body) = send(app, "POST", "/api/users", Some(json!({ "email": email }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app,
        "POST",
        "/api/rides",
        Some(json!({
            "userId": user_id,
            "rides": [{
                "externalId": format!("hk-{}", user_id),
                "startDate": "2025-03-01T08:00:00Z",
                "endDate": "2025-03-01T08:30:00Z",
                "distanceKm": 10.0,
                "durationMinutes": 0.0
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pointsEarned"], 1000);

    user_id
}

#[tokio::test]
async fn test_service_info_and_health() {
    let h = TestHarness::new().await;
    let app = routes::app(h.state.clone());

    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "sykle-rewards-service");

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_returns_envelope() {
    let h = TestHarness::new().await;
    let app = routes::app(h.state.clone());

    let (status, body) = send(&app, "GET", "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_create_user_is_idempotent_by_email() {
    let h = TestHarness::new().await;
    let app = routes::app(h.state.clone());

    let email: String = SafeEmail().fake();
    let (status, first) = send(&app, "POST", "/api/users", Some(json!({ "email": email }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, second) = send(&app, "POST", "/api/users", Some(json!({ "email": email }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["id"], second["data"]["id"]);

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({ "email": "no-at-sign" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_redeem_and_verify_flow() {
    let h = TestHarness::new().await;
    let app = routes::app(h.state.clone());
    let user_id = rider_with_1000_points(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/rewards/redeem",
        Some(json!({ "userId": user_id, "rewardId": "reward-2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["remainingPoints"], 250);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["partner"]["id"], "partner-1");
    let code = body["data"]["code"].as_str().unwrap().to_string();
    assert!(code.starts_with("SYKLE-"));

    let (status, body) = send(&app, "GET", &format!("/api/users/{}/balance", user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available"], 250);
    assert_eq!(body["data"]["reserved"], 750);

    let (status, body) = send(
        &app,
        "POST",
        "/api/rewards/verify",
        Some(json!({ "qrCode": code, "partnerId": "partner-2" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["data"]["valid"], false);
    assert_eq!(body["data"]["reason"], "wrong_location");

    let (status, body) = send(
        &app,
        "POST",
        "/api/rewards/verify",
        Some(json!({ "qrCode": code, "partnerId": "partner-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["rewardName"], "Pastry of the Day");
    assert_eq!(body["data"]["pointsSpent"], 750);

    let (status, body) = send(
        &app,
        "POST",
        "/api/rewards/verify",
        Some(json!({ "qrCode": code, "partnerId": "partner-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["data"]["usedAt"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/api/rewards/verify",
        Some(json!({ "qrCode": "SYKLE-UNKNOWN00000", "partnerId": "partner-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["reason"], "invalid_code");
}

#[tokio::test]
async fn test_insufficient_points_reports_amounts() {
    let h = TestHarness::new().await;
    let app = routes::app(h.state.clone());
    let user_id = rider_with_1000_points(&app).await;

    // reward-5: 2000 积分
    let (status, body) = send(
        &app,
        "POST",
        "/api/rewards/redeem",
        Some(json!({ "userId": user_id, "rewardId": "reward-5" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_POINTS");
    assert_eq!(body["data"]["required"], 2000);
    assert_eq!(body["data"]["available"], 1000);
}

#[tokio::test]
async fn test_expired_voucher_returns_gone() {
    let h = TestHarness::new().await;
    let app = routes::app(h.state.clone());
    let user_id = rider_with_1000_points(&app).await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/rewards/redeem",
        Some(json!({ "userId": user_id, "rewardId": "reward-1" })),
    )
    .await;
    let code = body["data"]["code"].as_str().unwrap().to_string();

    h.advance_minutes(16);

    let (status, body) = send(
        &app,
        "POST",
        "/api/rewards/verify",
        Some(json!({ "qrCode": code, "partnerId": "partner-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["data"]["reason"], "expired");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/rewards/redemptions/{}?status=expired", user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/rewards/redemptions/{}?status=used", user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let h = TestHarness::new().await;
    let app = routes::app(h.state.clone());

    let (status, body) = send(&app, "GET", "/api/rewards?maxPoints=700", None).await;
    assert_eq!(status, StatusCode::OK);
    let costs: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["pointsCost"].as_i64().unwrap())
        .collect();
    assert_eq!(costs, vec![500, 600, 700]);

    let (status, body) = send(
        &app,
        "GET",
        "/api/partners?lat=51.5387&lng=-0.0166&radius=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let partners = body["data"].as_array().unwrap();
    assert_eq!(partners[0]["id"], "partner-1");
    assert_eq!(partners[0]["distanceKm"], 0.0);
    assert!(
        partners
            .iter()
            .all(|p| p["distanceKm"].as_f64().unwrap() <= 1.0)
    );

    let (status, body) = send(&app, "GET", "/api/partners/partner-3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rewards"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", "/api/rewards/reward-404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "REWARD_NOT_FOUND");
}

#[tokio::test]
async fn test_ride_listing_and_stats() {
    let h = TestHarness::new().await;
    let app = routes::app(h.state.clone());
    let user_id = rider_with_1000_points(&app).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/rides/user/{}?limit=10", user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["limit"], 10);
    let ride_id = body["data"]["rides"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", &format!("/api/rides/{}", ride_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pointsEarned"], 1000);

    let (status, body) = send(&app, "GET", &format!("/api/users/{}/stats", user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalPoints"], 1000);
    assert_eq!(body["data"]["availablePoints"], 1000);
    assert_eq!(body["data"]["totalRides"], 1);
    assert_eq!(body["data"]["totalCo2SavedG"], 1500);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", user_id),
        Some(json!({ "name": "Grace" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Grace");

    let (status, body) = send(&app, "GET", "/api/users/missing-user/stats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let h = TestHarness::new().await;
    let app = routes::app(h.state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-42");
}
