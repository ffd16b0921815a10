//! Authorization decisions.
//!
//! Two flows end here:
//!
//! - Token path: a verified bearer token is simply allowed through. The host
//!   gateway turns a deny into its own redirect.
//! - Directory path: a username is looked up in the user directory and, if the
//!   account is confirmed and enabled, receives an [`AccessGrant`] confined to
//!   its own partition.

pub mod grant;
pub mod policy;

pub use grant::{AccessGrant, HomeDirectoryEntry, HomeDirectoryType, TransferAuthResponse};
pub use policy::PolicyDocument;

use crate::auth::{TokenClaims, TokenVerifier};
use crate::config::HomeDirectoryConfig;
use crate::directory::{IdentityStatus, UserDirectory};
use crate::errors::{AuthzError, DenyReason, DirectoryError, VerifyError};
use std::sync::Arc;
use tracing::instrument;

/// Outcome of the token path.
#[derive(Debug, Clone)]
pub enum EdgeDecision {
    /// Pass the original request through unmodified.
    Allow(TokenClaims),
    /// Refuse; the variant says which check failed.
    Deny(VerifyError),
}

impl EdgeDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, EdgeDecision::Allow(_))
    }
}

/// Decide on a verified claim set. Verification is the whole policy.
pub fn authorize_token(claims: &TokenClaims) -> EdgeDecision {
    EdgeDecision::Allow(claims.clone())
}

/// Verify `token` and decide, logging the outcome for audit.
#[instrument(skip_all)]
pub async fn authorize_bearer(verifier: &TokenVerifier, token: &str) -> EdgeDecision {
    match verifier.verify(token).await {
        Ok(claims) => {
            tracing::info!(
                target: "gate.authz",
                email = claims.email.as_deref().unwrap_or("<none>"),
                kid = %claims.key_id_used,
                "Bearer token allowed"
            );
            authorize_token(&claims)
        }
        Err(e) => {
            tracing::warn!(
                target: "gate.authz",
                reason = e.reason(),
                error = %e,
                "Bearer token denied"
            );
            EdgeDecision::Deny(e)
        }
    }
}

/// Reject usernames that would widen or escape a `{prefix}/{username}` match.
///
/// # Errors
///
/// Returns `Denied(InvalidUsername)` for empty names, `.` and `..`, and names
/// containing `/`, `*`, `?`, whitespace or control characters.
pub fn validate_username(username: &str) -> Result<(), AuthzError> {
    let unsafe_char =
        |c: char| c == '/' || c == '*' || c == '?' || c.is_whitespace() || c.is_control();

    if username.is_empty()
        || username == "."
        || username == ".."
        || username.chars().any(unsafe_char)
    {
        return Err(AuthzError::Denied(DenyReason::InvalidUsername));
    }
    Ok(())
}

/// Grants each directory user access to `{home_prefix}/{username}` only.
pub struct HomeDirectoryAuthorizer {
    config: HomeDirectoryConfig,
    directory: Arc<dyn UserDirectory>,
}

impl HomeDirectoryAuthorizer {
    pub fn new(config: HomeDirectoryConfig, directory: Arc<dyn UserDirectory>) -> Self {
        Self { config, directory }
    }

    pub fn config(&self) -> &HomeDirectoryConfig {
        &self.config
    }

    /// The partition a username maps to.
    pub fn partition(&self, username: &str) -> String {
        format!("{}/{}", self.config.home_prefix, username)
    }

    /// Decide on an already looked-up status.
    ///
    /// # Errors
    ///
    /// Returns `Denied` if the account is unconfirmed or disabled, or if the
    /// username is unsafe to embed in a path.
    pub fn authorize(
        &self,
        username: &str,
        status: &IdentityStatus,
    ) -> Result<AccessGrant, AuthzError> {
        validate_username(username)?;

        if !status.is_confirmed {
            return Err(AuthzError::Denied(DenyReason::NotConfirmed));
        }
        if status.is_disabled {
            return Err(AuthzError::Denied(DenyReason::Disabled));
        }

        Ok(AccessGrant::for_partition(
            &self.config.transfer_role_arn,
            &self.config.home_bucket,
            &self.partition(username),
        ))
    }

    /// Look up `username` and decide. The lookup is bounded by the
    /// configured directory timeout; a timeout is a transient failure.
    ///
    /// # Errors
    ///
    /// Every deny is an `AuthzError`; lookup failures never grant access.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn grant_for(&self, username: &str) -> Result<AccessGrant, AuthzError> {
        let result = self.lookup_and_authorize(username).await;

        match &result {
            Ok(grant) => tracing::info!(
                target: "gate.authz",
                target_path = grant.physical_target().unwrap_or_default(),
                "Home directory grant issued"
            ),
            Err(e) => tracing::warn!(
                target: "gate.authz",
                reason = e.reason(),
                error = %e,
                "Home directory grant denied"
            ),
        }

        result
    }

    async fn lookup_and_authorize(&self, username: &str) -> Result<AccessGrant, AuthzError> {
        validate_username(username)?;

        let status = tokio::time::timeout(
            self.config.directory_timeout,
            self.directory.lookup(username),
        )
        .await
        .map_err(|_| {
            DirectoryError::Transient(format!(
                "lookup exceeded {}s",
                self.config.directory_timeout.as_secs()
            ))
        })??;

        self.authorize(username, &status)
    }
}
