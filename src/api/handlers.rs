use super::error::ApiError;
use super::AppState;
use crate::statistics::{GlobalStats, StatEvent};
use crate::usage::ApiKey;
use crate::validator::{ValidationResult, VerifyOptions};
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Extension, Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "email-validation-api";

pub const FEATURES: &[&str] = &[
    "email_format_validation",
    "disposable_domain_detection",
    "mx_record_check",
    "role_email_detection",
    "risk_level_scoring",
    "bulk_processing",
    "strict_mode_for_paid_plans",
];

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub email: Option<String>,
    pub plan: Option<String>,
    pub strict: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub total_emails: usize,
    pub processed: usize,
    pub results: Vec<ValidationResult>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DomainsResponse {
    pub count: usize,
    pub domains: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_disposable_domains: usize,
    pub api_version: String,
    pub features: Vec<String>,
    pub mx_mode: String,
    pub mx_cached_domains: usize,
    pub max_batch_size: usize,
    pub counters: Option<GlobalStats>,
}

/// Strict scoring needs an explicit `strict=true` and a plan that allows it.
/// An authenticated key's plan takes precedence over the query parameter.
fn verify_options(state: &AppState, api_key: Option<&ApiKey>, query: &VerifyQuery) -> VerifyOptions {
    let requested = query
        .strict
        .as_deref()
        .map(|s| s.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let plan = api_key
        .map(|k| k.plan.as_str())
        .or(query.plan.as_deref())
        .unwrap_or("free");

    VerifyOptions {
        strict: requested && state.config.plan_allows_strict(plan),
    }
}

pub async fn home(State(state): State<AppState>) -> Json<Value> {
    let plans: serde_json::Map<String, Value> = state
        .config
        .plans
        .iter()
        .map(|(name, plan)| {
            (
                name.clone(),
                json!({
                    "description": plan.description,
                    "strict_mode": plan.strict_mode,
                }),
            )
        })
        .collect();

    Json(json!({
        "api": "Email Validation API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "active",
        "endpoints": {
            "/verify?email=test@example.com": "GET - Single email validation",
            "/batch": "POST - Bulk email validation",
            "/health": "GET - Health check",
            "/stats": "GET - API statistics",
            "/domains": "GET - List disposable domains",
        },
        "plans": plans,
    }))
}

pub async fn verify(
    State(state): State<AppState>,
    api_key: Option<Extension<ApiKey>>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> Result<Json<ValidationResult>, ApiError> {
    let Query(query) = query.map_err(|e| {
        state.stats.record_event(StatEvent::RequestRejected);
        ApiError::bad_request(format!("Invalid query string: {e}"))
    })?;

    let email = query.email.as_deref().map(str::trim).unwrap_or_default();
    if email.is_empty() {
        state.stats.record_event(StatEvent::RequestRejected);
        return Err(ApiError::bad_request("Email parameter is required"));
    }

    let options = verify_options(&state, api_key.as_ref().map(|Extension(k)| k), &query);
    log::debug!("Verifying {email} (strict: {})", options.strict);

    let result = state.validator.validate(email, options).await;

    state.stats.record_event(StatEvent::SingleRequest);
    state.stats.record_event(StatEvent::from_result(&result));
    Ok(Json(result))
}

pub async fn batch(
    State(state): State<AppState>,
    api_key: Option<Extension<ApiKey>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let reject = |message: String| {
        state.stats.record_event(StatEvent::RequestRejected);
        ApiError::BadRequest(message)
    };

    let Json(payload) = payload.map_err(|e| {
        log::debug!("Rejected batch payload: {e}");
        reject("JSON payload with 'emails' array is required".to_string())
    })?;

    let emails = match payload.get("emails") {
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return Err(reject("'emails' must be an array".to_string())),
        None => {
            return Err(reject(
                "JSON payload with 'emails' array is required".to_string(),
            ))
        }
    };

    let max = state.config.server.max_batch_size;
    if emails.len() > max {
        return Err(reject(format!("Maximum {max} emails per batch")));
    }

    // Batches take `plan` and a boolean `strict` from the body
    let options = verify_options(
        &state,
        api_key.as_ref().map(|Extension(k)| k),
        &VerifyQuery {
            email: None,
            plan: payload
                .get("plan")
                .and_then(Value::as_str)
                .map(str::to_string),
            strict: payload
                .get("strict")
                .and_then(Value::as_bool)
                .map(|b| b.to_string()),
        },
    );

    let total = emails.len();
    let results = state.bulk.process(emails, options).await;

    state.stats.record_event(StatEvent::BatchRequest { size: total });
    state.stats.record_results(&results);

    Ok(Json(BatchResponse {
        total_emails: total,
        processed: results.len(),
        results,
        timestamp: timestamp(),
    }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: timestamp(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let mx = state.validator.mx_checker();
    let mx_mode = serde_json::to_value(mx.mode())
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    Json(StatsResponse {
        total_disposable_domains: state.validator.disposable_domains().len(),
        api_version: env!("CARGO_PKG_VERSION").to_string(),
        features: FEATURES.iter().map(|f| f.to_string()).collect(),
        mx_mode,
        mx_cached_domains: mx.cached_domains().await,
        max_batch_size: state.config.server.max_batch_size,
        counters: state.stats.snapshot().await,
    })
}

pub async fn domains(State(state): State<AppState>) -> Json<DomainsResponse> {
    let domains = state.validator.disposable_domains().sorted();
    Json(DomainsResponse {
        count: domains.len(),
        domains,
        timestamp: timestamp(),
    })
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
