//! # Access Gate Test Utilities
//!
//! Shared test utilities for the access gate.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed RSA keys, seeded Ed25519 keys)
//! - Token signing with matching published JWKs (TestSigner)
//! - Claim builders (TestTokenBuilder)
//! - A controllable in-memory key source (FakeKeySource)
//! - A mock key endpoint (JwksServer)
//! - Custom assertions for access grants (GrantAssertions)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gate_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let signer = TestSigner::rsa_primary("k1");
//!     let source = Arc::new(FakeKeySource::new(vec![signer.jwk()]));
//!
//!     let token = signer.sign(&TestTokenBuilder::new().for_user("alice").build());
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod key_sources;
pub mod server_harness;
pub mod signing;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use key_sources::*;
pub use server_harness::*;
pub use signing::*;
pub use token_builders::*;
