//! Webhook signature verification using HMAC-SHA256.
//!
//! The sender signs each payload with a secret shared per repository and puts
//! the result in the `X-Hub-Signature-256` header as `sha256=<hex>`. A request
//! is only trusted when the MAC matches and the declared user agent belongs to
//! the expected sender.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::persistence::TrackedRepo;

type HmacSha256 = Hmac<Sha256>;

/// User agent prefix GitHub uses for webhook deliveries.
pub const GITHUB_USER_AGENT_PREFIX: &str = "GitHub-Hookshot/";

/// Parses a signature header (e.g., "sha256=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, invalid hex, etc.).
///
/// # Examples
///
/// ```
/// use push_builder::webhooks::parse_signature_header;
///
/// assert!(parse_signature_header("sha256=abcd1234").is_some());
/// assert!(parse_signature_header("abcd1234").is_none());
/// assert!(parse_signature_header("sha1=abcd1234").is_none());
/// assert!(parse_signature_header("sha256=xyz").is_none());
/// ```
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.trim().strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 signature of a payload using the given secret.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a header value (`sha256=<hex>`).
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Checks a payload against a signature header with constant-time comparison.
///
/// # Examples
///
/// ```
/// use push_builder::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let header = format_signature_header(&compute_signature(b"payload", b"key"));
/// assert!(verify_signature(b"payload", &header, b"key"));
/// assert!(!verify_signature(b"payload", &header, b"other-key"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(expected_signature) = parse_signature_header(signature_header) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);

    mac.verify_slice(&expected_signature).is_ok()
}

/// Transport headers that accompany a webhook body.
///
/// Both values are optional because a forged request may omit them; a missing
/// value always fails verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestAuth {
    /// Value of the `X-Hub-Signature-256` header.
    pub signature: Option<String>,
    /// Value of the `User-Agent` header.
    pub user_agent: Option<String>,
}

impl RequestAuth {
    pub fn new(signature: Option<String>, user_agent: Option<String>) -> Self {
        RequestAuth {
            signature,
            user_agent,
        }
    }
}

/// Decides whether a request for `tracked` really came from the expected sender.
///
/// The record's own secret is used when present, otherwise `default_secret`.
/// Returns `false` if there is no secret at all, the user agent does not start
/// with `user_agent_prefix`, or the signature is missing or wrong.
pub fn verify(
    tracked: &TrackedRepo,
    default_secret: Option<&str>,
    raw_body: &[u8],
    auth: &RequestAuth,
    user_agent_prefix: &str,
) -> bool {
    let Some(secret) = tracked.secret.as_deref().or(default_secret) else {
        return false;
    };

    let agent_ok = auth
        .user_agent
        .as_deref()
        .is_some_and(|ua| ua.starts_with(user_agent_prefix));
    if !agent_ok {
        return false;
    }

    match auth.signature.as_deref() {
        Some(header) => verify_signature(raw_body, header, secret.as_bytes()),
        None => false,
    }
}
