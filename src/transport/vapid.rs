//! VAPID (RFC 8292) application server authorization.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use url::Url;

use super::ece::{decode_base64url, PUBLIC_KEY_LEN};
use super::TransportError;

/// Token lifetime; push services reject anything over 24h
const TOKEN_TTL_HOURS: i64 = 12;

/// VAPID JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct VapidClaims {
    /// Origin of the push service
    pub aud: String,
    pub exp: i64,
    /// Contact URI (`mailto:` or `https:`)
    pub sub: String,
}

/// Signs ES256 VAPID tokens with the application server key
pub struct VapidSigner {
    key: EncodingKey,
    public_key: String,
    subject: String,
}

impl std::fmt::Debug for VapidSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidSigner")
            .field("public_key", &self.public_key)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl VapidSigner {
    /// `private_key_pem` is a PKCS#8 P-256 key; `public_key` is the matching
    /// uncompressed point, base64url, as handed to browsers.
    pub fn new(
        private_key_pem: &str,
        public_key: &str,
        subject: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let key = EncodingKey::from_ec_pem(private_key_pem.as_bytes())?;

        let public_key = public_key.trim().to_string();
        let raw = decode_base64url(&public_key)
            .map_err(|e| TransportError::Config(format!("VAPID public key is not base64url: {}", e)))?;
        if raw.len() != PUBLIC_KEY_LEN {
            return Err(TransportError::Config(format!(
                "VAPID public key must be {} bytes, got {}",
                PUBLIC_KEY_LEN,
                raw.len()
            )));
        }

        Ok(Self {
            key,
            public_key,
            subject: subject.into(),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Signed token for the push service hosting `endpoint`
    pub fn token(&self, endpoint: &str) -> Result<String, TransportError> {
        let claims = VapidClaims {
            aud: audience_for(endpoint)?,
            exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
            sub: self.subject.clone(),
        };

        Ok(encode(&Header::new(Algorithm::ES256), &claims, &self.key)?)
    }

    /// `Authorization` header value for `endpoint`
    pub fn authorization(&self, endpoint: &str) -> Result<String, TransportError> {
        Ok(format!("vapid t={}, k={}", self.token(endpoint)?, self.public_key))
    }
}

/// The VAPID audience: scheme, host and non-default port of the endpoint.
pub fn audience_for(endpoint: &str) -> Result<String, TransportError> {
    let url = Url::parse(endpoint)
        .map_err(|e| TransportError::Config(format!("invalid push endpoint: {}", e)))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(TransportError::Config(format!(
            "push endpoint has no origin: {}",
            endpoint
        )));
    }
    Ok(origin.ascii_serialization())
}
