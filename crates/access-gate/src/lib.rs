//! Access Gate Library
//!
//! Identity verification and scoped access decisions for two flows:
//!
//! - Bearer tokens issued by a user pool, verified against the pool's
//!   published signing keys (cached, refreshed on expiry, served stale when
//!   the key endpoint is unreachable)
//! - Directory users, looked up by name and granted access to their own
//!   storage partition only
//!
//! # Modules
//!
//! - `auth` - Key set cache and token verification
//! - `authz` - Allow/deny decisions and access grants
//! - `config` - Configuration from environment
//! - `directory` - User directory contract
//! - `errors` - Error types for every deny path

pub mod auth;
pub mod authz;
pub mod config;
pub mod directory;
pub mod errors;

pub use auth::{KeySetCache, TokenClaims, TokenVerifier, VerifierOptions};
pub use authz::{authorize_bearer, AccessGrant, EdgeDecision, HomeDirectoryAuthorizer};
pub use errors::{AuthzError, DirectoryError, KeySetError, VerifyError};

/// Tracing target prefixes emitted by this crate and its dependencies.
///
/// Spans use module paths (`access_gate::...`); events use the dotted
/// `gate.*` and `common.*` targets. A filter built from this list must
/// name all three or audit events are silently dropped.
pub const LOG_TARGETS: &str = "access_gate,common,gate";
