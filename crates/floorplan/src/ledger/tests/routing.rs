use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::ledger::domain::PaymentType;
use crate::ledger::router::ledger_router;

fn router(fx: &Fixture) -> Router {
    ledger_router(fx.ledger.clone())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn provider_account_and_unit_can_be_created_over_http() {
    let fx = fixture();

    let response = router(&fx)
        .oneshot(post_json(
            "/api/v1/floor-plans/providers",
            json!({
                "name": "Northpoint Commercial",
                "default_interest_rate": 8,
                "default_curtailment_days": 30,
                "default_curtailment_percent": 10
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let provider = json_body(response).await;

    let response = router(&fx)
        .oneshot(post_json(
            "/api/v1/floor-plans/accounts",
            json!({
                "dealer_id": "dealer-1",
                "provider_id": provider["id"],
                "credit_limit": 100000,
                "open_date": "2025-01-01"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let account = json_body(response).await;
    assert_eq!(account["curtailment_days"], 30);
    assert_eq!(account["status"], "active");

    let response = router(&fx)
        .oneshot(post_json(
            "/api/v1/floor-plans/units",
            json!({
                "listing_id": "vin-1001",
                "account_id": account["id"],
                "floor_amount": 50000,
                "floor_date": "2025-01-01"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let unit = json_body(response).await;
    assert_eq!(unit["next_curtailment_date"], "2025-01-31");
    assert_eq!(unit["days_floored"], 59);
    assert_eq!(unit["curtailment_status"], "past_due");

    let uri = format!(
        "/api/v1/floor-plans/accounts/{}",
        account["id"].as_str().unwrap()
    );
    let fetched = json_body(router(&fx).oneshot(get(&uri)).await.unwrap()).await;
    assert_eq!(fetched["available_credit"], 50000.0);
    assert_eq!(fetched["credit_limit"], 100000.0);
    assert_eq!(fetched["provider_name"], "Northpoint Commercial");
    assert!(fetched.get("account").is_none());

    let listed = json_body(
        router(&fx)
            .oneshot(get("/api/v1/floor-plans/accounts?dealer_id=dealer-1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(listed[0]["id"], account["id"]);
    assert_eq!(listed[0]["available_credit"], 50000.0);
    assert_eq!(listed[0]["provider_name"], "Northpoint Commercial");
}

#[tokio::test]
async fn flooring_past_the_limit_is_a_conflict() {
    let fx = fixture();
    let account = fx.account(dec!(10000));

    let response = router(&fx)
        .oneshot(post_json(
            "/api/v1/floor-plans/units",
            json!({
                "listing_id": "vin-1001",
                "account_id": account.id,
                "floor_amount": 25000,
                "floor_date": "2025-01-01"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("credit"));
}

#[tokio::test]
async fn unknown_unit_is_not_found() {
    let fx = fixture();

    let response = router(&fx)
        .oneshot(get(
            "/api/v1/floor-plans/units/7d0e8a4f-54a4-4bd2-9f57-1c2b0d6f7a11",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payments_are_recorded_and_exported_as_csv() {
    let fx = fixture();
    let account = fx.account(dec!(100000));
    let unit = fx
        .floor(&account, "vin-1001", dec!(50000), date(2025, 1, 1))
        .expect("unit");
    let payments_uri = format!("/api/v1/floor-plans/units/{}/payments", unit.id);

    let response = router(&fx)
        .oneshot(post_json(
            &payments_uri,
            json!({
                "payment_type": "curtailment",
                "amount": 5000,
                "payment_date": "2025-01-31",
                "reference": "CHK-1042"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = json_body(response).await;
    assert_eq!(receipt["payment"]["balance_after"], 45000.0);
    assert_eq!(receipt["unit"]["curtailments_paid"], 1);

    fx.pay(unit.id, PaymentType::Interest, dec!(328.77), date(2025, 2, 1))
        .expect("interest");

    let response = router(&fx)
        .oneshot(get(&format!("{payments_uri}?format=csv")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("payment_id,unit_id,payment_type"));
    assert!(lines[1].contains(",curtailment,2025-01-31,5000.00,45000.00,CHK-1042,"));
    assert!(lines[2].contains(",interest,2025-02-01,328.77,45000.00,,"));
}

#[tokio::test]
async fn payoff_without_a_body_settles_as_of_today() {
    let fx = fixture();
    let account = fx.account(dec!(100000));
    let unit = fx
        .floor(&account, "vin-1001", dec!(50000), date(2025, 1, 1))
        .expect("unit");

    let response = router(&fx)
        .oneshot(
            Request::post(format!("/api/v1/floor-plans/units/{}/payoff", unit.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = json_body(response).await;
    assert_eq!(receipt["unit"]["status"], "paid_off");
    assert_eq!(receipt["payment"]["payment_date"], "2025-03-01");
    assert_eq!(fx.available_credit(&account), dec!(100000));
}

#[tokio::test]
async fn invalid_payment_is_a_bad_request() {
    let fx = fixture();
    let account = fx.account(dec!(100000));
    let unit = fx
        .floor(&account, "vin-1001", dec!(50000), date(2025, 1, 1))
        .expect("unit");

    let response = router(&fx)
        .oneshot(post_json(
            &format!("/api/v1/floor-plans/units/{}/payments", unit.id),
            json!({
                "payment_type": "interest",
                "amount": 0,
                "payment_date": "2025-01-31"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
