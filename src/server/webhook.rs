//! Webhook endpoint handler.
//!
//! Classifies the delivery, runs the pipeline on a blocking thread (git and
//! the build are synchronous), and wraps the resulting status lines in a
//! minimal HTML page. The request waits for the sync and build to finish.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, warn};

use super::AppState;
use crate::pipeline::PipelineError;
use crate::webhooks::{ParseError, RequestAuth, classify};

/// Header name for the event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for the payload signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The delivery could not be classified.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Watchlist or git failure.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// The blocking task panicked or was cancelled.
    #[error("pipeline task failed: {0}")]
    Join(#[from] JoinError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match &self {
            WebhookError::Parse(_) => {
                warn!(error = %self, "Rejected malformed webhook");
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            WebhookError::Pipeline(_) | WebhookError::Join(_) => {
                error!(error = %self, "Webhook handling failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Headers read:
///   - `X-GitHub-Event`: Event type (required unless the body is empty)
///   - `X-Hub-Signature-256`: HMAC-SHA256 signature of the payload
///   - `User-Agent`: Must identify the expected sender
/// - Body: JSON webhook payload, or empty for the greeting
///
/// # Response
///
/// - 200 OK: HTML page with zero or one status line
/// - 400 Bad Request: Missing event type or malformed payload
/// - 500 Internal Server Error: Watchlist or git failure
///
/// # Example
///
/// ```ignore
/// POST /webhook HTTP/1.1
/// X-GitHub-Event: push
/// X-Hub-Signature-256: sha256=...
/// User-Agent: GitHub-Hookshot/044aadd
///
/// {"repository": {...}, "head_commit": {...}}
///
/// HTTP/1.1 200 OK
/// Content-Type: text/html; charset=utf-8
///
/// <html><head></head><body>Build finished</body></html>
/// ```
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Html<String>, WebhookError> {
    if body.is_empty() {
        return Ok(greeting());
    }

    let event_type = header_value(&headers, HEADER_EVENT);
    let event = classify(event_type.as_deref(), &body)?;
    debug!(event_type = %event.kind(), "Received webhook");

    let auth = RequestAuth::new(
        header_value(&headers, HEADER_SIGNATURE),
        header_value(&headers, header::USER_AGENT.as_str()),
    );

    let pipeline = app_state.pipeline();
    let lines =
        tokio::task::spawn_blocking(move || pipeline.handle(&event, &body, &auth)).await??;

    Ok(page(&lines))
}

/// Handler for plain GET requests.
pub async fn greeting_handler() -> Html<String> {
    greeting()
}

fn greeting() -> Html<String> {
    page(&[
        "<h1>This is the webhook receiver</h1>".to_string(),
        "I dont think you'll want to reach me this way.".to_string(),
    ])
}

/// Wraps body lines in the response envelope.
fn page(lines: &[String]) -> Html<String> {
    Html(format!(
        "<html><head></head><body>{}</body></html>",
        lines.join("\n")
    ))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
