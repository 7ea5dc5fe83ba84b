//! Session id generation and cookie signing.
//!
//! The cookie value is `<id>.<hex hmac-sha256(id)>`; anything that fails
//! verification is treated as if no cookie was sent.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generate a fresh random session id.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a random secret suitable for `session.secret`.
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Sign a session id for use as a cookie value.
pub fn sign(id: &str, secret: &str) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        // HMAC accepts keys of any length.
        return id.to_string();
    };
    mac.update(id.as_bytes());
    format!("{}.{}", id, hex::encode(mac.finalize().into_bytes()))
}

/// Verify a signed cookie value and return the session id it carries.
pub fn verify(value: &str, secret: &str) -> Option<String> {
    let (id, signature) = value.rsplit_once('.')?;
    if id.is_empty() {
        return None;
    }

    let expected = hex::decode(signature).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(id.as_bytes());
    mac.verify_slice(&expected).ok()?;

    Some(id.to_string())
}
