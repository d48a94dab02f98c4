//! Stateless signed session tokens.
//!
//! A token is `base64url(claims_json) . base64url(hmac_sha256(claims_json))`
//! signed with a process-wide secret loaded once at startup. The server
//! keeps no per-session state; everything needed to validate is inside the
//! token. Tokens cannot be revoked before their expiry.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Claims embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id of the token holder.
    pub sub: String,
    pub email: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds: `iat + ttl`.
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Malformed token, signature mismatch, or undecodable claims.
    #[error("token is invalid")]
    Invalid,
    /// Correctly signed but past its expiry.
    #[error("token has expired")]
    Expired,
}

/// Signs and validates session tokens with a fixed secret and lifetime.
pub struct TokenIssuer {
    key: Vec<u8>,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: u64) -> Self {
        // An absurd configured lifetime clamps instead of overflowing.
        let ttl_secs = i64::try_from(ttl_minutes.saturating_mul(60)).unwrap_or(i64::MAX);
        Self {
            key: secret.as_bytes().to_vec(),
            ttl_secs,
        }
    }

    /// Issue a token for `subject_id` expiring `ttl` from now.
    pub fn issue(&self, subject_id: &str, email: &str) -> String {
        self.issue_at(subject_id, email, Utc::now().timestamp())
    }

    /// Validate a token against the current process clock. No skew is
    /// tolerated: the signature is checked before any claim is inspected,
    /// and a well-signed token past `exp` is a distinct error kind.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    pub(crate) fn issue_at(&self, subject_id: &str, email: &str, now: i64) -> String {
        let claims = Claims {
            sub: subject_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        // Claims serialization cannot fail: plain strings and integers.
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let signature = self.sign(&payload);
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    pub(crate) fn validate_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(TokenError::Invalid)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Invalid)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Invalid)?;

        // Signature first. verify_slice is constant-time.
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| TokenError::Invalid)?;
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Invalid)?;

        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Invalid)?;
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        // Key length is unconstrained for HMAC; new_from_slice cannot fail.
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}
