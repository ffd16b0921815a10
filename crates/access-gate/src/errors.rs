//! Access Gate error types.
//!
//! Every verification or authorization failure is a deny. The variants stay
//! distinct so the host (edge gateway or transfer identity provider) can log
//! and audit which check failed, while the `Display` text for token failures
//! stays generic to avoid leaking detail to clients.

use thiserror::Error;

/// Failure to obtain a usable signing key set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeySetError {
    /// Network, timeout, or HTTP status failure talking to the key endpoint.
    #[error("Key set fetch failed: {0}")]
    Fetch(String),

    /// The endpoint answered but the document holds no usable keys.
    #[error("Key set document unusable: {0}")]
    InvalidDocument(String),
}

/// Bearer token verification failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// Not a three-part signed token, or its header/payload cannot be parsed.
    #[error("The access token is invalid or expired")]
    Malformed,

    /// The header `kid` is not present in the current key set snapshot.
    #[error("The access token is invalid or expired")]
    UnknownKey,

    /// Signature does not verify under the key's bound algorithm.
    #[error("The access token is invalid or expired")]
    BadSignature,

    /// `exp` is at or before the verification time.
    #[error("The access token is invalid or expired")]
    Expired,

    /// A required claim is absent.
    #[error("The access token is invalid or expired")]
    MissingClaim(&'static str),

    /// `iat` lies beyond the allowed clock skew.
    #[error("The access token is invalid or expired")]
    NotYetValid,

    /// Audience check configured and not satisfied.
    #[error("The access token is invalid or expired")]
    InvalidAudience,

    /// Issuer check configured and not satisfied.
    #[error("The access token is invalid or expired")]
    InvalidIssuer,

    /// No key set has ever been fetched and the fetch failed.
    #[error("Signing keys unavailable: {0}")]
    KeysUnavailable(#[from] KeySetError),
}

impl VerifyError {
    /// Stable machine-readable reason, used for audit logs and deny output.
    pub fn reason(&self) -> &'static str {
        match self {
            VerifyError::Malformed => "malformed",
            VerifyError::UnknownKey => "unknown_key",
            VerifyError::BadSignature => "bad_signature",
            VerifyError::Expired => "expired",
            VerifyError::MissingClaim(_) => "missing_claim",
            VerifyError::NotYetValid => "not_yet_valid",
            VerifyError::InvalidAudience => "invalid_audience",
            VerifyError::InvalidIssuer => "invalid_issuer",
            VerifyError::KeysUnavailable(_) => "keys_unavailable",
        }
    }
}

/// User directory lookup failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("User not found")]
    NotFound,

    /// Network failure, throttling, or a lookup that exceeded its timeout.
    #[error("Directory lookup failed: {0}")]
    Transient(String),
}

/// Why a directory-path identity was refused a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotConfirmed,
    Disabled,
    /// The username would widen or escape the per-user prefix.
    InvalidUsername,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotConfirmed => "not_confirmed",
            DenyReason::Disabled => "disabled",
            DenyReason::InvalidUsername => "invalid_username",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory-path authorization failure. Every variant is a deny.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Access denied: {0}")]
    Denied(DenyReason),

    #[error("Access denied: {0}")]
    Directory(#[from] DirectoryError),
}

impl AuthzError {
    /// Stable machine-readable reason, used for audit logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthzError::Denied(reason) => reason.as_str(),
            AuthzError::Directory(DirectoryError::NotFound) => "user_not_found",
            AuthzError::Directory(DirectoryError::Transient(_)) => "lookup_failed",
        }
    }
}
