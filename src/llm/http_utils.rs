//! HTTP utilities shared by the two LLM wire formats.
//!
//! Adapted from the teacher's `llm/http_utils.rs`: a single place for the
//! timeout-configured client, the POST-and-parse round trip, and response
//! path navigation.

use crate::config::get_llm_http_timeout_secs;
use crate::llm::LlmError;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;

/// Build an HTTP client with the configured LLM timeout.
#[must_use]
pub fn create_http_client() -> HttpClient {
    let timeout = Duration::from_secs(get_llm_http_timeout_secs());
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// POST `body` as JSON to `url`, returning the parsed JSON response.
///
/// # Errors
///
/// `LlmError::Network` on connectivity failure, `LlmError::Api` on a
/// non-success status, `LlmError::Json` if the body doesn't parse.
pub async fn send_json_request(
    client: &HttpClient,
    url: &str,
    body: &Value,
    auth_header: Option<&str>,
    extra_headers: &[(&str, &str)],
) -> Result<Value, LlmError> {
    let mut request = client.post(url).json(body);

    if let Some(auth) = auth_header {
        request = request.header("Authorization", auth);
    }
    for (key, value) in extra_headers {
        request = request.header(*key, *value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| LlmError::Network(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        let is_html = error_text.trim_start().starts_with("<!DOCTYPE")
            || error_text.trim_start().starts_with("<html")
            || error_text.trim_start().starts_with("<HTML");

        let message = if is_html {
            format!("API error: {status} (server returned an HTML error page)")
        } else if error_text.len() > 500 {
            let truncated: String = error_text.chars().take(500).collect();
            format!("API error: {status} - {truncated}... (truncated)")
        } else {
            format!("API error: {status} - {error_text}")
        };
        return Err(LlmError::Api(message));
    }

    response
        .json()
        .await
        .map_err(|e| LlmError::Json(e.to_string()))
}

/// Navigate `response` by a path of string keys / numeric indices, returning
/// the string found there.
///
/// # Errors
///
/// `LlmError::Api` if any segment is missing or the leaf is not a string.
pub fn extract_text_content(response: &Value, path: &[&str]) -> Result<String, LlmError> {
    let mut current = response;
    for segment in path {
        current = if let Ok(index) = segment.parse::<usize>() {
            current
                .get(index)
                .ok_or_else(|| LlmError::Api(format!("invalid path: missing index {index}")))?
        } else {
            current
                .get(*segment)
                .ok_or_else(|| LlmError::Api(format!("invalid path: missing key {segment}")))?
        };
    }
    current
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| LlmError::Api(format!("expected string at path, got: {current:?}")))
}
