//! HMAC-signed flash messages: one-shot notifications carried across a
//! redirect in a short-lived cookie.
//!
//! Wire form: URL-safe base64 (no padding) of `HMAC-SHA256(secret, json)`
//! followed by the JSON payload. Verification is constant-time and the
//! payload is never logged; anything that fails to verify reads as
//! "no flash".

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use na_domain::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signature length in bytes; anything shorter cannot be valid.
const SIGNATURE_LEN: usize = 32;

/// Cookie carrying the sealed flash message.
pub const FLASH_COOKIE: &str = "flash_msg";

/// Flash lifetime. Long enough to survive one redirect, short enough to
/// be gone before it can confuse a later page.
const FLASH_TTL_SECS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// The {type, message} payload. Field names match the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub t: FlashKind,
    pub m: String,
}

/// Sign and encode a flash payload.
pub fn seal(msg: &FlashMessage, secret: &[u8]) -> String {
    let payload = serde_json::to_vec(msg).expect("flash payload serializes");
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(&payload);
    let signature = mac.finalize().into_bytes();

    let mut raw = Vec::with_capacity(SIGNATURE_LEN + payload.len());
    raw.extend_from_slice(&signature);
    raw.extend_from_slice(&payload);
    URL_SAFE_NO_PAD.encode(raw)
}

/// Decode and verify a sealed flash payload.
pub fn open(opaque: &str, secret: &[u8]) -> Result<FlashMessage> {
    let raw = URL_SAFE_NO_PAD
        .decode(opaque)
        .map_err(|_| Error::Corrupted("flash cookie is not valid base64".into()))?;
    if raw.len() < SIGNATURE_LEN {
        return Err(Error::Corrupted("flash cookie is too short".into()));
    }
    let (signature, payload) = raw.split_at(SIGNATURE_LEN);

    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    if !bool::from(signature.ct_eq(expected.as_slice())) {
        return Err(Error::Corrupted("flash cookie failed verification".into()));
    }
    serde_json::from_slice(payload)
        .map_err(|_| Error::Corrupted("flash cookie payload is not valid JSON".into()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cookie plumbing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Attach a sealed flash cookie to the jar.
pub fn set_flash(
    jar: CookieJar,
    secret: &[u8],
    kind: FlashKind,
    message: impl Into<String>,
    secure: bool,
) -> CookieJar {
    let sealed = seal(
        &FlashMessage {
            t: kind,
            m: message.into(),
        },
        secret,
    );
    let cookie = Cookie::build((FLASH_COOKIE, sealed))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(FLASH_TTL_SECS))
        .build();
    jar.add(cookie)
}

/// Read and clear the flash cookie in one step. Tampered or missing
/// cookies read as `None`; the cookie is removed either way.
pub fn take_flash(jar: CookieJar, secret: &[u8]) -> (CookieJar, Option<FlashMessage>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let message = open(cookie.value(), secret).ok();
    let jar = jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/").build());
    (jar, message)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn msg() -> FlashMessage {
        FlashMessage {
            t: FlashKind::Success,
            m: "ok".into(),
        }
    }

    #[test]
    fn seal_open_round_trip() {
        let sealed = seal(&msg(), b"secret-a");
        assert_eq!(open(&sealed, b"secret-a").unwrap(), msg());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let sealed = seal(&msg(), b"secret-a");
        let err = open(&sealed, b"secret-b").unwrap_err();
        assert!(matches!(err, Error::Corrupted(_)), "{err}");
    }

    #[test]
    fn flipped_byte_is_rejected() {
        let sealed = seal(&msg(), b"secret-a");
        let mut bytes = sealed.into_bytes();
        // Flip one character of the base64 form.
        bytes[10] = if bytes[10] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(open(&tampered, b"secret-a").is_err());
    }

    #[test]
    fn short_input_is_rejected() {
        let short = URL_SAFE_NO_PAD.encode(b"tiny");
        let err = open(&short, b"secret").unwrap_err();
        assert!(err.to_string().contains("too short"), "{err}");
    }

    #[test]
    fn garbage_base64_is_rejected() {
        assert!(open("!!!not-base64!!!", b"secret").is_err());
    }

    #[test]
    fn take_flash_consumes_exactly_once() {
        let secret = b"secret-a";
        let jar = set_flash(CookieJar::new(), secret, FlashKind::Success, "ok", true);

        let (jar, first) = take_flash(jar, secret);
        assert_eq!(first, Some(msg()));

        // Removal leaves a tombstone; a second read yields nothing.
        let (_, second) = take_flash(jar, secret);
        assert_eq!(second, None);
    }

    #[test]
    fn tampered_cookie_reads_as_no_flash() {
        let secret = b"secret-a";
        let jar = CookieJar::new().add(
            Cookie::build((FLASH_COOKIE, seal(&msg(), b"other-secret")))
                .path("/")
                .build(),
        );
        let (_, message) = take_flash(jar, secret);
        assert_eq!(message, None);
    }
}
