//! Bearer token verification.
//!
//! Validates identity-provider JWTs using public keys from the [`KeySetCache`].
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The verification algorithm is the one bound to the key; a header `alg`
//!   that disagrees is rejected before any cryptography runs
//! - Claims are read only from the signature-checked decode
//! - Generic error messages prevent information leakage; the variant carries
//!   the reason for audit logging

use crate::auth::claims::TokenClaims;
use crate::auth::jwks::{KeySetCache, SigningKey};
use crate::config::Config;
use crate::errors::VerifyError;
use common::jwt::{extract_header, validate_iat_at, UnverifiedHeader, DEFAULT_CLOCK_SKEW};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Optional checks layered on top of signature and lifetime validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierOptions {
    /// Tolerance for `iat` values in the future.
    pub clock_skew: Duration,

    /// When set, `aud` (or `client_id`) must contain this value.
    pub audience: Option<String>,

    /// When set, `iss` must equal this value.
    pub issuer: Option<String>,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            clock_skew: DEFAULT_CLOCK_SKEW,
            audience: None,
            issuer: None,
        }
    }
}

impl VerifierOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            clock_skew: config.jwt_clock_skew,
            audience: config.token_audience.clone(),
            issuer: config.token_issuer.clone(),
        }
    }
}

/// JWT verifier using the shared signing key cache.
pub struct TokenVerifier {
    /// Cache for fetching public keys.
    keys: Arc<KeySetCache>,

    options: VerifierOptions,
}

impl TokenVerifier {
    pub fn new(keys: Arc<KeySetCache>, options: VerifierOptions) -> Self {
        Self { keys, options }
    }

    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// Verify a bearer token and return its claims.
    ///
    /// # Checks, in order
    ///
    /// 1. Size and structure; `kid` and `alg` read from the unverified header
    /// 2. Key set obtained from the cache (refreshing as needed)
    /// 3. Key located by `kid`
    /// 4. Signature verified with the key's bound algorithm
    /// 5. `iat` and `exp` present
    /// 6. Not expired, `iat` within clock skew
    /// 7. Issuer and audience, when configured
    ///
    /// # Errors
    ///
    /// Returns the `VerifyError` of the first failing check.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<TokenClaims, VerifyError> {
        let header = extract_header(token).map_err(|e| {
            tracing::debug!(target: "gate.auth.jwt", error = ?e, "Token header extraction failed");
            VerifyError::Malformed
        })?;

        let snapshot = self.keys.get_keys().await?;

        let key = snapshot.find(&header.kid).ok_or_else(|| {
            tracing::debug!(
                target: "gate.auth.jwt",
                kid = %header.kid,
                known = ?snapshot.key_ids(),
                "Token signed by key not in key set"
            );
            VerifyError::UnknownKey
        })?;

        let now = chrono::Utc::now().timestamp();
        let claims = verify_with_key(token, &header, key, &self.options, now)?;

        tracing::debug!(target: "gate.auth.jwt", kid = %claims.key_id_used, "Token verified successfully");
        Ok(claims)
    }
}

/// Verify a token against one key at an explicit `now`.
fn verify_with_key(
    token: &str,
    header: &UnverifiedHeader,
    key: &SigningKey,
    options: &VerifierOptions,
    now: i64,
) -> Result<TokenClaims, VerifyError> {
    let declared = Algorithm::from_str(&header.alg).map_err(|_| {
        tracing::debug!(target: "gate.auth.jwt", alg = %header.alg, "Unrecognised token algorithm");
        VerifyError::Malformed
    })?;

    if declared != key.algorithm() {
        tracing::warn!(
            target: "gate.auth.jwt",
            kid = %key.key_id(),
            declared = ?declared,
            bound = ?key.algorithm(),
            "Token algorithm does not match key algorithm"
        );
        return Err(VerifyError::BadSignature);
    }

    // Lifetime and audience are checked below against our own clock and rules
    let mut validation = Validation::new(key.algorithm());
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data =
        decode::<Map<String, Value>>(token, key.decoding_key(), &validation).map_err(|e| {
            tracing::debug!(target: "gate.auth.jwt", error = %e, "Token verification failed");
            match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidKeyFormat
                | ErrorKind::InvalidRsaKey(_)
                | ErrorKind::InvalidEcdsaKey => VerifyError::BadSignature,
                _ => VerifyError::Malformed,
            }
        })?;

    let claims = TokenClaims::from_verified_payload(token_data.claims, key.key_id())?;

    if now >= claims.expires_at {
        tracing::debug!(
            target: "gate.auth.jwt",
            exp = claims.expires_at,
            now = now,
            "Token expired"
        );
        return Err(VerifyError::Expired);
    }

    validate_iat_at(claims.issued_at, options.clock_skew, now)
        .map_err(|_| VerifyError::NotYetValid)?;

    if let Some(expected) = &options.issuer {
        if claims.issuer() != Some(expected.as_str()) {
            tracing::debug!(target: "gate.auth.jwt", iss = ?claims.issuer(), "Token issuer mismatch");
            return Err(VerifyError::InvalidIssuer);
        }
    }

    if let Some(expected) = &options.audience {
        if !claims.audiences().contains(&expected.as_str()) {
            tracing::debug!(target: "gate.auth.jwt", "Token audience mismatch");
            return Err(VerifyError::InvalidAudience);
        }
    }

    Ok(claims)
}
