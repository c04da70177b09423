//! Integration tests for the validation endpoints.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use verimail::api::{self, AppState};
use verimail::Config;
use verimail::EmailValidator;

fn test_app_with(config: Config) -> Router {
    let validator = EmailValidator::from_config(&config).unwrap();
    api::router(AppState::new(config, validator, None))
}

fn test_app() -> Router {
    test_app_with(Config::default())
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_verify_gmail() {
    let (status, body) = get(test_app(), "/verify?email=test@gmail.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "test@gmail.com");
    assert_eq!(body["is_valid_format"], true);
    assert_eq!(body["is_disposable"], false);
    assert_eq!(body["quality_score"], 95);
    assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn test_verify_disposable() {
    let (status, body) = get(test_app(), "/verify?email=user@mailinator.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_disposable"], true);
    assert!(body["quality_score"].as_u64().unwrap() < 95);
    assert_eq!(body["risk_level"], "high");
}

#[tokio::test]
async fn test_verify_invalid_format_is_not_an_error() {
    let (status, body) = get(test_app(), "/verify?email=not-an-email").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid_format"], false);
    assert_eq!(body["quality_score"], 0);
    assert_eq!(body["errors"], json!(["invalid format"]));
}

#[tokio::test]
async fn test_verify_missing_email() {
    let (status, body) = get(test_app(), "/verify").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email parameter is required");

    let (status, _) = get(test_app(), "/verify?email=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_strict_requires_paid_plan() {
    let (_, free) = get(test_app(), "/verify?email=admin@gmail.com&strict=true").await;
    assert_eq!(free["quality_score"], 95);

    let (_, pro) = get(
        test_app(),
        "/verify?email=admin@gmail.com&strict=true&plan=pro",
    )
    .await;
    assert_eq!(pro["quality_score"], 0);
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let emails = json!(["test@gmail.com", "not-an-email", 7, "user@mailinator.com"]);
    let (status, body) = post_json(test_app(), "/batch", json!({ "emails": emails })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_emails"], 4);
    assert_eq!(body["processed"], 4);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["email"], "test@gmail.com");
    assert_eq!(results[1]["email"], "not-an-email");
    assert_eq!(results[1]["is_valid_format"], false);
    assert_eq!(results[2]["email"], "7");
    assert_eq!(results[2]["errors"], json!(["email must be a string"]));
    assert_eq!(results[3]["is_disposable"], true);
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_batch_strict_follows_body_plan() {
    let (status, pro) = post_json(
        test_app(),
        "/batch",
        json!({ "emails": ["admin@gmail.com"], "plan": "pro", "strict": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pro["results"][0]["quality_score"], 0);

    let (status, free) = post_json(
        test_app(),
        "/batch",
        json!({ "emails": ["admin@gmail.com"], "plan": "free", "strict": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(free["results"][0]["quality_score"], 95);
}

#[tokio::test]
async fn test_batch_input_errors() {
    let (status, _) = post_json(test_app(), "/batch", json!({ "addresses": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(test_app(), "/batch", json!({ "emails": "a@b.co" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "'emails' must be an array");

    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/batch")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_size_limit() {
    let mut config = Config::default();
    config.server.max_batch_size = 2;

    let emails = json!(["a@b.co", "c@d.co", "e@f.co"]);
    let (status, body) = post_json(test_app_with(config), "/batch", json!({ "emails": emails })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Maximum 2 emails per batch");
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(test_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "email-validation-api");
}

#[tokio::test]
async fn test_domains_listing_is_sorted() {
    let (status, body) = get(test_app(), "/domains").await;
    assert_eq!(status, StatusCode::OK);

    let domains: Vec<String> = body["domains"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_str().unwrap().to_string())
        .collect();
    let mut sorted = domains.clone();
    sorted.sort();

    assert_eq!(domains, sorted);
    assert_eq!(body["count"].as_u64().unwrap() as usize, domains.len());
    assert!(domains.contains(&"mailinator.com".to_string()));
}

#[tokio::test]
async fn test_stats_counts_requests() {
    let app = test_app();

    get(app.clone(), "/verify?email=test@gmail.com").await;
    get(app.clone(), "/verify?email=not-an-email").await;
    let (status, body) = get(app, "/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mx_mode"], "off");
    assert_eq!(body["counters"]["single_requests"], 2);
    assert_eq!(body["counters"]["valid_format"], 1);
    assert_eq!(body["counters"]["invalid_format"], 1);
}

#[tokio::test]
async fn test_unknown_path_returns_json_404() {
    let (status, body) = get(test_app(), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], "Endpoint not found");
}

#[tokio::test]
async fn test_wrong_method_returns_json_405() {
    let (status, body) = get(test_app(), "/batch").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "method_not_allowed");
    assert_eq!(body["message"], "Method not allowed");

    let (status, body) = post_json(test_app(), "/verify", json!({})).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "method_not_allowed");
}

#[tokio::test]
async fn test_home_lists_plans() {
    let (status, body) = get(test_app(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plans"]["pro"]["strict_mode"], true);
    assert_eq!(body["plans"]["free"]["strict_mode"], false);
}
