//! Twilio request signatures
//!
//! Twilio signs each webhook with HMAC-SHA1, keyed by the account auth token,
//! over the full callback URL followed by every POST parameter name and value
//! sorted by name. The base64 digest arrives in `X-Twilio-Signature`.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

fn signed_mac(auth_token: &str, url: &str, params: &[(String, String)]) -> Option<HmacSha1> {
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes()).ok()?;

    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();

    mac.update(url.as_bytes());
    for (name, value) in sorted {
        mac.update(name.as_bytes());
        mac.update(value.as_bytes());
    }
    Some(mac)
}

/// Expected `X-Twilio-Signature` for a request
pub fn compute_signature(auth_token: &str, url: &str, params: &[(String, String)]) -> String {
    match signed_mac(auth_token, url, params) {
        Some(mac) => STANDARD.encode(mac.finalize().into_bytes()),
        None => String::new(),
    }
}

/// Constant-time check of a received signature
pub fn verify_signature(
    auth_token: &str,
    url: &str,
    params: &[(String, String)],
    signature: &str,
) -> bool {
    let Ok(received) = STANDARD.decode(signature.trim()) else {
        return false;
    };

    match signed_mac(auth_token, url, params) {
        Some(mac) => mac.verify_slice(&received).is_ok(),
        None => false,
    }
}
