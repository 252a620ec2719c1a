//! Webhook transport: a signed JSON `POST` per event.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};

use agenthub_core::error::AppError;
use agenthub_core::events::TaskEvent;
use agenthub_core::result::AppResult;

/// Header carrying the dotted event name
pub const EVENT_HEADER: &str = "X-Agenthub-Event";

/// Header carrying the body signature, present only when a secret is set
pub const SIGNATURE_HEADER: &str = "X-Agenthub-Signature";

/// Signature header value for `body` keyed with `secret`:
/// `sha256=<hex(sha256(secret || body))>`
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(body);
    format!("sha256={:x}", hasher.finalize())
}

/// Deliver one event to a webhook endpoint.
///
/// Non-2xx responses, transport failures and timeouts are all errors.
pub async fn deliver(
    client: &Client,
    url: &str,
    secret: Option<&str>,
    timeout: Duration,
    event: &TaskEvent,
) -> AppResult<()> {
    let body = serde_json::to_vec(event)?;

    let mut request = client
        .post(url)
        .timeout(timeout)
        .header(CONTENT_TYPE, "application/json")
        .header(EVENT_HEADER, event.event.as_str());
    if let Some(secret) = secret {
        request = request.header(SIGNATURE_HEADER, sign(secret, &body));
    }

    let response = request.body(body).send().await.map_err(|e| {
        if e.is_timeout() {
            AppError::timeout(format!("Webhook {url} timed out after {}s", timeout.as_secs()))
        } else {
            AppError::external_service(format!("Webhook {url} request failed: {e}"))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::external_service(format!(
            "Webhook {url} responded with {status}"
        )));
    }
    Ok(())
}
