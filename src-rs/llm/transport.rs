use std::future::Future;

use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::warn;

use super::rotation::Rotator;
use super::types::ProviderError;

/// Sends a JSON request and classifies failures the same way for every provider.
pub async fn send_json(request: RequestBuilder) -> Result<Value, ProviderError> {
    let resp = request
        .header("Content-Type", "application/json")
        .send()
        .await
        .map_err(|err| ProviderError::new("network_error", &err.to_string(), true))?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if status.is_client_error() || status.is_server_error() {
        return Err(classify_status(status, &body));
    }

    serde_json::from_str(&body).map_err(|_| ProviderError::new("parse_error", "invalid json", false))
}

pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let lowered = body.to_lowercase();
    match status.as_u16() {
        401 | 403 => ProviderError::new("auth_error", body, true),
        429 => ProviderError::new("rate_limit", body, true),
        _ if lowered.contains("quota") || lowered.contains("resource_exhausted") => {
            ProviderError::new("rate_limit", body, true)
        }
        _ if status.is_server_error() => ProviderError::new("server_error", body, true),
        _ => ProviderError::new("api_error", body, false),
    }
}

/// Tries each key once, moving on only after retryable failures.
pub async fn with_key_rotation<F, Fut, T>(
    provider: &str,
    rotator: &Rotator,
    mut attempt: F,
) -> Result<T, ProviderError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    if rotator.is_empty() {
        return Err(ProviderError::new("auth_error", &format!("no {} API keys", provider), false));
    }
    let mut last_err = None;
    for _ in 0..rotator.len() {
        let key = match rotator.next() {
            Some(key) => key,
            None => break,
        };
        match attempt(key).await {
            Ok(resp) => return Ok(resp),
            Err(err) if err.retryable => {
                warn!(provider, code = %err.code, "provider call failed, rotating key");
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or_else(|| ProviderError::new("api_error", "request failed", true)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED, "").code, "auth_error");
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").code, "rate_limit");
        assert_eq!(classify_status(StatusCode::BAD_REQUEST, "RESOURCE_EXHAUSTED").code, "rate_limit");
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY, "").code, "server_error");
        let err = classify_status(StatusCode::BAD_REQUEST, "bad schema");
        assert_eq!(err.code, "api_error");
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_rotation_stops_on_fatal_error() {
        let rotator = Rotator::new(vec!["k1".into(), "k2".into()]);
        let mut tried = Vec::new();
        let result: Result<(), ProviderError> = with_key_rotation("test", &rotator, |key| {
            tried.push(key);
            async { Err(ProviderError::new("api_error", "bad", false)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(tried, vec!["k1"]);
    }

    #[tokio::test]
    async fn test_rotation_moves_past_retryable() {
        let rotator = Rotator::new(vec!["k1".into(), "k2".into()]);
        let result = with_key_rotation("test", &rotator, |key| async move {
            if key == "k1" {
                Err(ProviderError::new("rate_limit", "slow down", true))
            } else {
                Ok(key)
            }
        })
        .await;
        assert_eq!(result.unwrap(), "k2");
    }
}
