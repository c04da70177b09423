//! API-key guard with per-day quotas.

use super::error::ApiError;
use super::AppState;
use crate::statistics::StatEvent;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

/// Checks `X-API-Key` (or the configured header) against the usage store and
/// the key's daily quota. A pass-through when auth is disabled.
///
/// A quota unit is reserved before the handler runs and handed back when the
/// response is not a success, so only successful requests count. On success
/// the `ApiKey` is attached to the request extensions.
pub async fn api_key_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.auth.enabled {
        return Ok(next.run(request).await);
    }

    let store = match state.usage.clone() {
        Some(store) => store,
        None => return Err(ApiError::Internal("API key store unavailable".to_string())),
    };

    let header_name = state.config.auth.header_name.as_str();
    let key = request
        .headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);

    let key = match key {
        Some(key) => key,
        None => {
            state.stats.record_event(StatEvent::RequestRejected);
            return Err(ApiError::Unauthorized("API key missing".to_string()));
        }
    };

    let today = Utc::now().date_naive();
    let lookup = {
        let store = store.clone();
        let key = key.clone();
        tokio::task::spawn_blocking(move || store.get_api_key(&key))
            .await
            .map_err(|e| ApiError::Internal(format!("API key lookup task failed: {e}")))??
    };

    let api_key = match lookup {
        Some(found) => found,
        None => {
            log::debug!("Rejected unknown API key");
            state.stats.record_event(StatEvent::RequestRejected);
            return Err(ApiError::Forbidden("Invalid API key".to_string()));
        }
    };

    if !api_key.is_active() {
        state.stats.record_event(StatEvent::RequestRejected);
        return Err(ApiError::Forbidden("API key suspended".to_string()));
    }

    let reserved = {
        let store = store.clone();
        let key = key.clone();
        let quota = api_key.daily_quota;
        tokio::task::spawn_blocking(move || store.try_reserve_usage(&key, today, quota))
            .await
            .map_err(|e| ApiError::Internal(format!("API usage task failed: {e}")))??
    };

    if !reserved {
        log::info!(
            "Quota exhausted for key on plan {} ({} per day)",
            api_key.plan,
            api_key.daily_quota
        );
        state.stats.record_event(StatEvent::RequestRejected);
        return Err(ApiError::QuotaExceeded);
    }

    request.extensions_mut().insert(api_key);
    let response = next.run(request).await;

    if !response.status().is_success() {
        let outcome = tokio::task::spawn_blocking(move || store.release_usage(&key, today)).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Failed to release API usage: {e:#}"),
            Err(e) => log::warn!("API usage task failed: {e}"),
        }
    }

    Ok(response)
}
