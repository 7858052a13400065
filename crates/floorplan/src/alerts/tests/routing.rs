use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use super::common::*;
use crate::alerts::{alert_router, AlertRoutes, TriggerSettings};

fn router(harness: &Harness, secret: Option<&str>) -> Router {
    alert_router(Arc::new(AlertRoutes {
        generator: harness.generator.clone(),
        inbox: harness.inbox.clone(),
        trigger: TriggerSettings {
            secret: secret.map(str::to_string),
            accrue_interest: true,
        },
    }))
}

fn trigger(token: Option<&str>) -> Request<Body> {
    let mut request = Request::post("/api/v1/floor-plans/alerts/run");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    request.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn trigger_requires_the_shared_secret() {
    let (harness, _, _) = seeded();

    let missing = router(&harness, Some("s3cret"))
        .oneshot(trigger(None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = router(&harness, Some("s3cret"))
        .oneshot(trigger(Some("guess")))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(harness.inbox.list(&dealer(), true).unwrap().is_empty());
}

#[tokio::test]
async fn trigger_is_rejected_when_no_secret_is_configured() {
    let (harness, _, _) = seeded();

    let response = router(&harness, None)
        .oneshot(trigger(Some("")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authorized_trigger_returns_camel_case_summary() {
    let (harness, _, _) = seeded();

    let response = router(&harness, Some("s3cret"))
        .oneshot(trigger(Some("s3cret")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["unitsEvaluated"], 2);
    assert_eq!(body["accountsEvaluated"], 1);
    assert!(body["alertsGenerated"].as_u64().unwrap() >= 3);
    assert!(body["timestamp"].is_string());
    assert_eq!(body["interestAccrual"]["units_flagged_past_due"], 1);
}

#[tokio::test]
async fn list_returns_alerts_with_severity_counts() {
    let (harness, _, _) = seeded();
    harness.generator.run().unwrap();

    let response = router(&harness, None)
        .oneshot(
            Request::get("/api/v1/floor-plans/alerts?dealer_id=dealer-alerts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["alerts"].as_array().unwrap().len(), 3);
    assert_eq!(body["counts"]["critical"], 1);
    assert_eq!(body["counts"]["warning"], 2);
    assert_eq!(body["counts"]["info"], 0);
}

#[tokio::test]
async fn dismiss_hides_alert_from_default_listing() {
    let (harness, _, _) = seeded();
    harness.generator.run().unwrap();
    let target = harness.inbox.list(&dealer(), false).unwrap()[0].clone();

    let response = router(&harness, None)
        .oneshot(
            Request::post(format!("/api/v1/floor-plans/alerts/{}/dismiss", target.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["is_dismissed"], true);
    let open = harness.inbox.list(&dealer(), false).unwrap();
    assert!(open.iter().all(|alert| alert.id != target.id));
}

#[tokio::test]
async fn unknown_alert_returns_not_found() {
    let (harness, _, _) = seeded();

    let response = router(&harness, None)
        .oneshot(
            Request::post(format!(
                "/api/v1/floor-plans/alerts/{}/read",
                crate::alerts::AlertId::new()
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
