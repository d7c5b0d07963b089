use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crewdesk_api::auth::{generate_jwt, Claims};
use crewdesk_api::middleware::auth::require_auth;
use crewdesk_api::tenancy::context;

// The probe handler stands in for the whole protected pipeline: it reports
// the ambient company id the middleware established, several layers away
// from where the credential was parsed.
async fn probe() -> Json<Value> {
    Json(json!({ "company": context::current().map(|c| c.as_str().to_string()) }))
}

fn app() -> Router {
    Router::new().route("/probe", get(probe)).layer(axum::middleware::from_fn(require_auth))
}

fn token_for(company: &str) -> String {
    let claims =
        Claims::new(Uuid::new_v4(), "probe@test".to_string(), company.to_string(), "member".to_string());
    generate_jwt(&claims).expect("token")
}

fn request_with_token(token: &str) -> Request<Body> {
    Request::builder()
        .uri("/probe")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn valid_token_opens_matching_tenant_scope() {
    let response = app().oneshot(request_with_token(&token_for("company-a"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["company"], json!("company-a"));
}

#[tokio::test]
async fn missing_credential_is_401() {
    let request = Request::builder().uri("/probe").body(Body::empty()).unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_credential_is_401() {
    let response = app().oneshot(request_with_token("not-a-jwt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn credential_without_company_is_400() {
    // Valid signature, structurally incomplete: distinct from the 401 class.
    let response = app().oneshot(request_with_token(&token_for(""))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn concurrent_requests_observe_their_own_company() {
    let (res_a, res_b) = tokio::join!(
        app().oneshot(request_with_token(&token_for("company-a"))),
        app().oneshot(request_with_token(&token_for("company-b"))),
    );

    let body_a = body_json(res_a.unwrap()).await;
    let body_b = body_json(res_b.unwrap()).await;
    assert_eq!(body_a["company"], json!("company-a"));
    assert_eq!(body_b["company"], json!("company-b"));
}
