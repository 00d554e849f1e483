//! Webhook signature validation.
//!
//! Inbound webhook deliveries carry an HMAC-SHA256 of the raw body in the
//! `X-Hub-Signature-256` header, formatted `sha256=<hex>`. Verification is
//! constant time. When no secret is configured validation is skipped and the
//! body is accepted unauthenticated; that fallback exists for local
//! development only and is logged loudly every time it is exercised.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify `body` against the signature header using the shared secret.
/// Returns `Ok(())` when the payload is authentic, or when no secret is
/// configured (development fallback).
pub fn validate(body: &[u8], header: Option<&str>, secret: Option<&str>) -> Result<(), AuthError> {
    let Some(secret) = secret else {
        tracing::warn!(
            "no webhook secret configured; accepting unauthenticated payload (development only)"
        );
        return Ok(());
    };

    let header = header.ok_or(AuthError::MissingSignature)?;
    let digest_hex = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(AuthError::MalformedSignature)?;
    let claimed = hex::decode(digest_hex).map_err(|_| AuthError::MalformedSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    mac.verify_slice(&claimed)
        .map_err(|_| AuthError::InvalidSignature)
}

/// Compute the `sha256=<hex>` signature for a body. Counterpart of
/// `validate`, used to sign outbound test deliveries.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}
