use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Method token used in place of an HTTP verb when signing a
/// connection-upgrade handshake.
pub const UPGRADE_METHOD: &str = "UPGRADE";

/// Body-hash placeholder for transports that carry no request body.
pub const UPGRADE_BODY_MARKER: &str = "-";

/// Build the canonical string fed into the HMAC.
///
/// Format (newline-joined, four fields):
/// `METHOD\nPATH-WITH-QUERY\nBODYHASH-HEX-OR-EMPTY\nTIMESTAMP`
///
/// The body hash is the hex-encoded SHA-256 of the raw body, or the empty
/// string when there is no body. The timestamp is signed exactly as the
/// client presents it; any reformatting on either side breaks verification.
pub fn canonical_request(method: &str, path_with_query: &str, body: &[u8], timestamp: &str) -> String {
    let body_hash = if body.is_empty() {
        String::new()
    } else {
        hex::encode(Sha256::digest(body))
    };
    format!("{}\n{}\n{}\n{}", method, path_with_query, body_hash, timestamp)
}

/// Canonical string for a WebSocket-upgrade handshake: the method field is
/// the fixed literal and the body-hash field the fixed placeholder.
pub fn canonical_upgrade(path_with_query: &str, timestamp: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        UPGRADE_METHOD, path_with_query, UPGRADE_BODY_MARKER, timestamp
    )
}

/// Sign a canonical string with HMAC-SHA256, returning the base64 signature.
pub fn sign_canonical(secret: &str, canonical: &str) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(canonical.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Verify a base64 signature against a canonical string using a
/// constant-time comparison.
///
/// Decode failures and length mismatches are plain rejections, never a
/// distinct error path.
pub fn verify_canonical(secret: &str, canonical: &str, signature: &str) -> Result<bool, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(canonical.as_bytes());
    let expected = mac.finalize().into_bytes();

    let provided = match BASE64.decode(signature.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => return Ok(false),
    };

    if provided.len() != expected.len() {
        return Ok(false);
    }

    Ok(expected.as_slice().ct_eq(provided.as_slice()).into())
}
