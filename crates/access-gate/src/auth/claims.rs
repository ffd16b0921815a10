//! Verified token claims.
//!
//! Built only after a token's signature verified. Subject and email are
//! redacted in Debug output to prevent exposure in logs.

use crate::errors::VerifyError;
use serde_json::{Map, Value};
use std::fmt;

/// Claims of a verified bearer token.
#[derive(Clone)]
pub struct TokenClaims {
    /// Subject (`sub`) - redacted in Debug output.
    pub subject: Option<String>,

    /// `email` claim, when the issuer includes one - redacted in Debug output.
    pub email: Option<String>,

    /// Issued-at timestamp (Unix epoch seconds).
    pub issued_at: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub expires_at: i64,

    /// ID of the key whose signature was verified.
    pub key_id_used: String,

    /// Full decoded payload.
    pub raw: Map<String, Value>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("TokenClaims")
            .field("subject", &redacted(&self.subject))
            .field("email", &redacted(&self.email))
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("key_id_used", &self.key_id_used)
            .field("claim_names", &self.raw.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TokenClaims {
    /// Build claims from a payload whose signature already verified.
    ///
    /// # Errors
    ///
    /// - `MissingClaim` if `iat` or `exp` is absent
    /// - `Malformed` if either is present but not a number
    pub(crate) fn from_verified_payload(
        raw: Map<String, Value>,
        key_id_used: &str,
    ) -> Result<Self, VerifyError> {
        let issued_at = numeric_claim(&raw, "iat")?;
        let expires_at = numeric_claim(&raw, "exp")?;

        Ok(Self {
            subject: string_claim(&raw, "sub"),
            email: string_claim(&raw, "email"),
            issued_at,
            expires_at,
            key_id_used: key_id_used.to_string(),
            raw,
        })
    }

    /// Look up any claim from the payload.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    /// The audiences this token was issued for: `aud` (string or list) or,
    /// for access tokens that carry no `aud`, `client_id`.
    pub fn audiences(&self) -> Vec<&str> {
        match self.raw.get("aud") {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(auds)) => auds.iter().filter_map(Value::as_str).collect(),
            _ => self
                .raw
                .get("client_id")
                .and_then(Value::as_str)
                .into_iter()
                .collect(),
        }
    }

    pub fn issuer(&self) -> Option<&str> {
        self.raw.get("iss").and_then(Value::as_str)
    }
}

fn string_claim(raw: &Map<String, Value>, name: &str) -> Option<String> {
    raw.get(name).and_then(Value::as_str).map(ToString::to_string)
}

fn numeric_claim(raw: &Map<String, Value>, name: &'static str) -> Result<i64, VerifyError> {
    let value = raw.get(name).ok_or(VerifyError::MissingClaim(name))?;

    if let Some(n) = value.as_i64() {
        return Ok(n);
    }

    // NumericDate allows fractional seconds; the cast saturates out-of-range values
    match value.as_f64() {
        Some(f) if f.is_finite() => Ok(f.floor() as i64),
        _ => {
            tracing::debug!(target: "gate.auth.jwt", claim = name, "Claim is not a NumericDate");
            Err(VerifyError::Malformed)
        }
    }
}
