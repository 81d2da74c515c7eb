//! Bearer-token issuing and verification.
//!
//! Tokens are HMAC-SHA256 signed claims with an expiry. The engine host
//! uses [`TokenIssuer::verify`] as a boolean gate before starting a
//! transfer; token transport and session handling stay outside the core.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{IngestError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject the token was issued to.
    pub sub: String,

    /// Expiry as a Unix timestamp (seconds).
    pub exp: i64,
}

/// Issues and verifies signed bearer tokens.
pub struct TokenIssuer {
    secret: String,
}

impl TokenIssuer {
    /// Create an issuer over the shared signing secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a token for `subject`, valid for `ttl_minutes`.
    pub fn issue(&self, subject: &str, ttl_minutes: i64) -> Result<String> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + Duration::minutes(ttl_minutes)).timestamp(),
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes())?);
        Ok(format!("{}.{}", payload, signature))
    }

    /// Verify a token's signature and expiry, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| IngestError::Auth("malformed token".to_string()))?;

        let provided = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| IngestError::Auth("malformed signature".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| IngestError::Auth("invalid signing secret".to_string()))?;
        mac.update(payload.as_bytes());
        if mac.verify_slice(&provided).is_err() {
            return Err(IngestError::Auth("invalid signature".to_string()));
        }

        let claims: Claims = serde_json::from_slice(
            &URL_SAFE_NO_PAD
                .decode(payload)
                .map_err(|_| IngestError::Auth("malformed payload".to_string()))?,
        )
        .map_err(|_| IngestError::Auth("malformed claims".to_string()))?;

        if claims.exp < Utc::now().timestamp() {
            return Err(IngestError::Auth("token has expired".to_string()));
        }

        Ok(claims)
    }

    /// Boolean gate used before a transfer starts.
    pub fn is_authorized(&self, token: &str) -> bool {
        self.verify(token).is_ok()
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| IngestError::Auth("invalid signing secret".to_string()))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
