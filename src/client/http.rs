//! Response handling shared by the API clients

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::error::{ClientError, ClientResult};

/// Any 2xx answer
pub(crate) const ANY_SUCCESS: &[StatusCode] = &[];

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

pub(crate) fn build_http(timeout_ms: u64) -> ClientResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()?;
    Ok(client)
}

/// Join a server root and an API prefix without doubling slashes
pub(crate) fn api_base(base_url: &str, prefix: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), prefix)
}

/// Pass the response through when its status is accepted.
///
/// An empty `accepted` list means any 2xx. Otherwise the body's `error`
/// field becomes the failure message, or `default_message` when absent.
pub(crate) async fn ensure_status(
    response: Response,
    accepted: &[StatusCode],
    default_message: &str,
) -> ClientResult<Response> {
    let status = response.status();
    let ok = if accepted.is_empty() {
        status.is_success()
    } else {
        accepted.contains(&status)
    };
    if ok {
        return Ok(response);
    }

    let bytes = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&bytes)
        .ok()
        .and_then(|body| body.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default_message.to_string());

    tracing::debug!(status = status.as_u16(), message = %message, "API call rejected");
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Check the status, then decode the JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    accepted: &[StatusCode],
    default_message: &str,
) -> ClientResult<T> {
    let response = ensure_status(response, accepted, default_message).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_joins() {
        assert_eq!(api_base("http://localhost:8080", "/api/mp"), "http://localhost:8080/api/mp");
        assert_eq!(api_base("http://localhost:8080/", "/api/mp"), "http://localhost:8080/api/mp");
    }
}
