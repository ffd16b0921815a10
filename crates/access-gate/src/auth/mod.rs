//! Bearer token authentication.
//!
//! Verifies identity-provider tokens against the provider's published keys.
//!
//! # Components
//!
//! - `jwks` - Key set fetching and the stale-serving key set cache
//! - `jwt` - Token verification using cached keys
//! - `claims` - Claims of a verified token

pub mod claims;
pub mod jwks;
pub mod jwt;

pub use claims::TokenClaims;
pub use jwks::{HttpKeySource, KeySetCache, KeySetSnapshot, KeySource, SigningKey};
pub use jwt::{TokenVerifier, VerifierOptions};
