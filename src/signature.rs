//! HMAC-SHA256 signing on both sides of the relay.
//!
//! Inbound: GitHub signs each delivery body with the shared webhook secret and
//! sends it as `X-Hub-Signature-256: sha256=<hex>`.
//!
//! Outbound: `sign` is base64(HMAC-SHA256(key = secret, message =
//! `"{timestamp}\n{secret}"`)). Feishu's documented scheme instead keys the
//! HMAC with `"{timestamp}\n{secret}"` over an empty message, so a bot with
//! signature verification enabled rejects this value.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Computes the `sha256=<hex>` header value GitHub would send for `payload`.
pub fn compute_github_signature(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verifies a GitHub webhook signature.
///
/// * No secret configured: the check is skipped and the request passes.
/// * Secret configured but no header: fails.
/// * Otherwise the expected header is recomputed and compared in constant time.
pub fn verify_github_signature(
    secret: Option<&str>,
    payload: &[u8],
    signature_header: Option<&str>,
) -> bool {
    let Some(secret) = secret else {
        warn!("GitHub webhook secret not configured, skipping signature verification");
        return true;
    };

    let Some(signature_header) = signature_header else {
        error!("Missing X-Hub-Signature-256 header");
        return false;
    };

    let Some(expected) = compute_github_signature(secret, payload) else {
        error!("Failed to initialise HMAC for signature verification");
        return false;
    };
    let valid: bool = expected
        .as_bytes()
        .ct_eq(signature_header.as_bytes())
        .into();
    if valid {
        info!("GitHub webhook signature verified");
    } else {
        error!("GitHub webhook signature verification failed");
    }
    valid
}

/// Signs an outbound delivery.
///
/// Returns `None` when no delivery secret is configured.
pub fn sign_delivery(timestamp: &str, secret: Option<&str>) -> Option<String> {
    let secret = secret?;
    let string_to_sign = format!("{}\n{}", timestamp, secret);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(string_to_sign.as_bytes());
    Some(BASE64.encode(mac.finalize().into_bytes()))
}
