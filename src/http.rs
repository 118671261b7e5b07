//! Shared HTTP plumbing for provider clients.

use reqwest::{Client, Response};
use std::time::Duration;

use crate::error::{DubError, Result};
use crate::retry::is_http_retryable;

pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Pass successful responses through; turn error statuses into a retryable
/// `ProviderCallFailed` or a final `ProviderRejected`.
pub async fn check_response(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(provider, status.as_u16(), body.trim()))
}

pub fn status_error(provider: &str, status: u16, body: &str) -> DubError {
    if is_http_retryable(status) {
        DubError::provider(provider, format!("HTTP {}: {}", status, body))
    } else {
        DubError::ProviderRejected {
            provider: provider.to_string(),
            status,
            reason: body.to_string(),
        }
    }
}
