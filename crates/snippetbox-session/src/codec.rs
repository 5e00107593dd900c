//! Signed session cookie encoding.
//!
//! Wire format: `base64url(json(payload)) "." base64url(hmac_sha256(secret, first part))`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::error::SessionError;

type HmacSha256 = Hmac<Sha256>;

/// Minimum signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// The data carried inside a session cookie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Absolute expiry, unix seconds
    pub deadline: i64,
    /// Session values
    pub values: Map<String, Value>,
}

/// Signs and verifies session cookie values.
#[derive(Clone)]
pub struct SessionCodec {
    mac: HmacSha256,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

impl SessionCodec {
    /// Creates a codec keyed with `secret`.
    pub fn new(secret: &[u8]) -> Result<Self, SessionError> {
        let too_short = || SessionError::SecretTooShort {
            min: MIN_SECRET_LEN,
            actual: secret.len(),
        };
        if secret.len() < MIN_SECRET_LEN {
            return Err(too_short());
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| too_short())?;
        Ok(Self { mac })
    }

    /// Serializes and signs `payload`.
    pub fn encode(&self, payload: &Payload) -> Result<String, SessionError> {
        let json = serde_json::to_vec(payload)?;
        let body = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac.clone();
        mac.update(body.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{body}.{signature}"))
    }

    /// Verifies and deserializes a cookie value.
    ///
    /// Returns `None` for a bad signature, a malformed payload, or a deadline
    /// at or before `now` (unix seconds).
    #[must_use]
    pub fn decode(&self, value: &str, now: i64) -> Option<Payload> {
        let (body, signature) = value.split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(body.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let json = URL_SAFE_NO_PAD.decode(body).ok()?;
        let payload: Payload = serde_json::from_slice(&json).ok()?;
        (payload.deadline > now).then_some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &[u8] = b"s6Ndh+pPbnzHbS*+9Pk8qGWhTzbpa@ge";

    fn payload(deadline: i64) -> Payload {
        let mut values = Map::new();
        values.insert("authenticatedUserID".into(), json!(7));
        values.insert("flash".into(), json!("hello"));
        Payload { deadline, values }
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = SessionCodec::new(b"too short").unwrap_err();
        assert!(matches!(err, SessionError::SecretTooShort { min: 32, actual: 9 }));
    }

    #[test]
    fn test_values_survive_round_trip() {
        let codec = SessionCodec::new(SECRET).unwrap();
        let encoded = codec.encode(&payload(2_000)).unwrap();
        assert_eq!(codec.decode(&encoded, 1_000), Some(payload(2_000)));
    }

    #[test]
    fn test_expired_payload_is_absent() {
        let codec = SessionCodec::new(SECRET).unwrap();
        let encoded = codec.encode(&payload(1_000)).unwrap();
        assert_eq!(codec.decode(&encoded, 1_000), None);
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let codec = SessionCodec::new(SECRET).unwrap();
        let encoded = codec.encode(&payload(2_000)).unwrap();
        let (_, signature) = encoded.split_once('.').unwrap();

        let mut forged = payload(2_000);
        forged.values.insert("authenticatedUserID".into(), json!(1));
        let forged_body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());

        assert_eq!(codec.decode(&format!("{forged_body}.{signature}"), 1_000), None);
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let codec = SessionCodec::new(SECRET).unwrap();
        let other = SessionCodec::new(b"another-secret-that-is-long-enough!!").unwrap();
        let encoded = other.encode(&payload(2_000)).unwrap();
        assert_eq!(codec.decode(&encoded, 1_000), None);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let codec = SessionCodec::new(SECRET).unwrap();
        assert_eq!(codec.decode("", 0), None);
        assert_eq!(codec.decode("no-dot", 0), None);
        assert_eq!(codec.decode("a.b", 0), None);
        assert_eq!(codec.decode("!!!.???", 0), None);
    }
}
