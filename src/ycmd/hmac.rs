//! Request and response authentication for ycmd.
//!
//! A request tag is the HMAC of the separate HMACs of method, path and
//! body. Responses carry a plain HMAC over the body.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub type HmacSha256 = Hmac<Sha256>;

/// Header carrying the base64 tag on both requests and responses.
pub const HMAC_HEADER: &str = "X-Ycm-Hmac";

pub fn create_hmac(content: &[u8], secret: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(content);

    let result = mac.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result.into_bytes());
    out
}

/// `HMAC(HMAC(method) ++ HMAC(path) ++ HMAC(body))` under `secret`.
pub fn sign(method: &str, path: &str, body: &[u8], secret: &[u8]) -> [u8; 32] {
    let mut joined = Vec::with_capacity(96);
    joined.extend_from_slice(&create_hmac(method.as_bytes(), secret));
    joined.extend_from_slice(&create_hmac(path.as_bytes(), secret));
    joined.extend_from_slice(&create_hmac(body, secret));
    create_hmac(&joined, secret)
}

pub fn sign_base64(method: &str, path: &str, body: &[u8], secret: &[u8]) -> String {
    STANDARD.encode(sign(method, path, body, secret))
}

/// Constant-time check of a response tag over `body`.
pub fn verify_response(body: &[u8], tag_base64: &str, secret: &[u8]) -> bool {
    let Ok(tag) = STANDARD.decode(tag_base64.trim()) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    mac.verify_slice(&tag).is_ok()
}
