//! Code and token generation, hashing and comparison.
//!
//! Only SHA-256 hex digests of codes and tokens are ever stored.

use base64::Engine;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

/// Generate a numeric one-time code of `length` digits.
///
/// Leading zeros are allowed, so every code of the given length is equally
/// likely.
#[must_use]
pub fn generate_otp(length: u8) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Generate a bearer token: 32 random bytes, base64url without padding.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 of `value`, hex encoded.
///
/// # Examples
///
/// ```
/// use service_portal_auth::crypto::hash_secret;
///
/// assert_eq!(
///     hash_secret("123456"),
///     "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
/// );
/// ```
#[must_use]
pub fn hash_secret(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Compare two digests in constant time.
#[must_use]
pub fn digests_match(a: &str, b: &str) -> bool {
    constant_time_eq::constant_time_eq(a.as_bytes(), b.as_bytes())
}

/// Hash `candidate` and compare it against a stored digest.
#[must_use]
pub fn verify_secret(candidate: &str, stored_hash: &str) -> bool {
    digests_match(&hash_secret(candidate), stored_hash)
}

/// Mask a phone number for display: first three and last two characters
/// kept, `****` for short numbers.
///
/// ```
/// use service_portal_auth::crypto::mask_phone;
///
/// assert_eq!(mask_phone("+573001234567"), "+57********67");
/// assert_eq!(mask_phone("12345"), "****");
/// ```
#[must_use]
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    let len = chars.len();
    if len <= 5 {
        return "****".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[len - 2..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(len - 5))
}
