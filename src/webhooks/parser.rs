//! Webhook payload classifier.
//!
//! # Parsing Strategy
//!
//! 1. The event type comes from the `X-GitHub-Event` header
//! 2. The body must always be well-formed JSON
//! 3. `push` bodies are parsed into [`PushEvent`]; missing fields are errors
//! 4. `ping` and unknown types are classified without further inspection

use thiserror::Error;

use super::events::{Event, PushEvent};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// No event type was supplied alongside the body.
    #[error("missing event type")]
    MissingEventType,

    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classifies a raw webhook body.
///
/// # Examples
///
/// ```
/// use push_builder::webhooks::{Event, classify};
///
/// let body = br#"{
///     "repository": { "id": 1, "name": "demo" },
///     "head_commit": { "message": "Fix typo" }
/// }"#;
///
/// match classify(Some("push"), body).unwrap() {
///     Event::Push(push) => assert_eq!(push.repo_name().as_str(), "demo"),
///     other => panic!("unexpected event {other:?}"),
/// }
///
/// assert_eq!(classify(Some("ping"), b"{}").unwrap(), Event::Ping);
/// assert!(classify(None, b"{}").is_err());
/// ```
pub fn classify(event_type: Option<&str>, raw: &[u8]) -> Result<Event, ParseError> {
    let event_type = event_type.ok_or(ParseError::MissingEventType)?;

    match event_type {
        "push" => {
            let push: PushEvent = serde_json::from_slice(raw)?;
            Ok(Event::Push(push))
        }
        "ping" => {
            serde_json::from_slice::<serde_json::Value>(raw)?;
            Ok(Event::Ping)
        }
        other => {
            serde_json::from_slice::<serde_json::Value>(raw)?;
            Ok(Event::Unknown(other.to_string()))
        }
    }
}
