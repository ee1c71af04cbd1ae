//! Shared secret check for inbound webhooks
//!
//! Accepted locations, in order:
//! - `X-Webhook-Secret: <secret>` header
//! - `?secret=<secret>` query parameter (registries that can't set headers)

use axum::extract::Query;
use axum::http::{HeaderMap, Uri};
use serde::Deserialize;
use subtle::ConstantTimeEq;

pub const SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Deserialize)]
struct SecretQuery {
    secret: Option<String>,
}

/// Extract the caller-supplied secret from the request
pub fn extract_secret(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(value) = headers.get(SECRET_HEADER) {
        if let Ok(value) = value.to_str() {
            return Some(value.trim().to_string());
        }
    }

    // Percent-decoded; a malformed query counts as no secret
    Query::<SecretQuery>::try_from_uri(uri).ok()?.0.secret
}

/// Constant-time comparison; empty secrets never match
pub fn secret_matches(provided: &str, configured: &str) -> bool {
    if provided.is_empty() || configured.is_empty() {
        return false;
    }
    provided.as_bytes().ct_eq(configured.as_bytes()).into()
}
