//! One-time status messages carried in a signed cookie.
//!
//! Cookie value: `base64url(json payload) "." base64url(HMAC-SHA256(payload))`.
//! A cookie that fails verification or has expired reads as no message.

use axum::http::{HeaderMap, header};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie holding the pending message.
pub const FLASH_COOKIE: &str = "flash";

/// Seconds a flash stays readable after it was issued.
pub const FLASH_MAX_AGE_SECS: i64 = 600;

const CLEAR_COOKIE: &str = "flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

impl FlashLevel {
    pub fn css_class(self) -> &'static str {
        match self {
            FlashLevel::Success => "flash flash-success",
            FlashLevel::Error => "flash flash-error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
    /// Unix seconds.
    pub issued_at: i64,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Error, message)
    }

    fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            issued_at: Utc::now().timestamp(),
        }
    }
}

/// Signs and verifies flash cookies with a keyed HMAC.
#[derive(Clone)]
pub struct FlashSigner {
    mac: HmacSha256,
}

impl FlashSigner {
    /// Build a signer from a configured secret.
    pub fn new(secret: impl AsRef<[u8]>) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|err| anyhow::anyhow!("invalid flash signing key: {}", err))?;
        Ok(Self { mac })
    }

    /// Signer with a key that only lives as long as this process.
    pub fn random() -> anyhow::Result<Self> {
        let mut key = Vec::with_capacity(32);
        key.extend_from_slice(Uuid::new_v4().as_bytes());
        key.extend_from_slice(Uuid::new_v4().as_bytes());
        Self::new(key)
    }

    /// Encode and sign a flash into a cookie value.
    pub fn seal(&self, flash: &Flash) -> serde_json::Result<String> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(flash)?);
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", payload, signature))
    }

    /// Verify and decode a cookie value. `None` when tampered, malformed or expired.
    pub fn open(&self, value: &str) -> Option<Flash> {
        self.open_at(value, Utc::now().timestamp())
    }

    fn open_at(&self, value: &str, now: i64) -> Option<Flash> {
        let (payload, signature) = value.split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let flash: Flash = serde_json::from_slice(&json).ok()?;
        if now - flash.issued_at > FLASH_MAX_AGE_SECS {
            return None;
        }
        Some(flash)
    }

    /// Full `Set-Cookie` value carrying `flash`.
    pub fn set_cookie(&self, flash: &Flash) -> serde_json::Result<String> {
        Ok(format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            FLASH_COOKIE,
            self.seal(flash)?,
            FLASH_MAX_AGE_SECS
        ))
    }
}

/// `Set-Cookie` value that removes a pending flash.
pub fn clear_cookie() -> &'static str {
    CLEAR_COOKIE
}

/// Raw flash cookie value from the request, if the browser sent one.
pub fn cookie_value(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == FLASH_COOKIE)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn signer() -> FlashSigner {
        FlashSigner::new("test-secret-key-for-testing-only").unwrap()
    }

    #[test]
    fn seal_then_open() {
        let flash = Flash::success("Success! File \"a.pdf\" was uploaded");
        let value = signer().seal(&flash).unwrap();

        assert_eq!(signer().open(&value), Some(flash));
    }

    #[test]
    fn tampered_payload_is_ignored() {
        let value = signer().seal(&Flash::error("Invalid file type")).unwrap();
        let (_, signature) = value.split_once('.').unwrap();
        let forged = URL_SAFE_NO_PAD.encode(
            br#"{"level":"success","message":"forged","issued_at":0}"#,
        );

        assert_eq!(signer().open(&format!("{}.{}", forged, signature)), None);
        assert_eq!(signer().open("no-dot-here"), None);
        assert_eq!(signer().open("!!!.???"), None);
    }

    #[test]
    fn other_key_is_rejected() {
        let value = signer().seal(&Flash::success("ok")).unwrap();
        let other = FlashSigner::random().unwrap();

        assert_eq!(other.open(&value), None);
    }

    #[test]
    fn expired_flash_is_ignored() {
        let flash = Flash::success("old news");
        let value = signer().seal(&flash).unwrap();

        let fresh = flash.issued_at + FLASH_MAX_AGE_SECS;
        let stale = fresh + 1;
        assert!(signer().open_at(&value, fresh).is_some());
        assert!(signer().open_at(&value, stale).is_none());
    }

    #[test]
    fn set_cookie_attributes() {
        let cookie = signer().set_cookie(&Flash::success("ok")).unwrap();

        assert!(cookie.starts_with("flash="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=600"));
        assert!(clear_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn cookie_value_finds_flash_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("session=abc; flash=payload.sig; lang=en"),
        );

        assert_eq!(cookie_value(&headers), Some("payload.sig"));
        assert_eq!(cookie_value(&HeaderMap::new()), None);
    }
}
