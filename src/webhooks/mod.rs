//! Webhook handling for push notifications.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Classification of raw payloads into typed events

pub mod events;
pub mod parser;
pub mod signature;

pub use events::{Event, HeadCommit, PushEvent, PushRepository};
pub use parser::{ParseError, classify};
pub use signature::{
    GITHUB_USER_AGENT_PREFIX, RequestAuth, compute_signature, format_signature_header,
    parse_signature_header, verify, verify_signature,
};
