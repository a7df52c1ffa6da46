//! Credential handling for the cellphone login route
//!
//! The gateway expects `md5_password`, the lowercase hex MD5 digest of the
//! account password. Configs may hold either the digest or the plain password.

use md5::{Digest, Md5};

/// Hash a plaintext password into the hex digest the login route expects
pub fn hash_password(password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether a string already looks like an MD5 hex digest
pub fn is_md5_digest(value: &str) -> bool {
    value.len() == 32 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Pick the digest to send, preferring an explicit one over a plain password
pub fn resolve_digest(md5_password: Option<&str>, password: Option<&str>) -> Option<String> {
    if let Some(digest) = md5_password.map(str::trim).filter(|d| !d.is_empty()) {
        return Some(digest.to_ascii_lowercase());
    }
    password.filter(|p| !p.is_empty()).map(hash_password)
}
