//! Token signing with published key material.
//!
//! A `TestSigner` pairs a private key with the JWK a key endpoint would
//! publish for it, so tests can serve the JWK and mint tokens that verify.

use crate::crypto_fixtures::{
    test_ed25519_key, RSA_E, RSA_PRIMARY_N, RSA_PRIMARY_PEM, RSA_ROGUE_N, RSA_ROGUE_PEM,
};
use access_gate::auth::jwks::Jwk;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

pub struct TestSigner {
    kid: String,
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    jwk: Value,
}

impl TestSigner {
    /// RS256 signer over the primary RSA fixture.
    pub fn rsa_primary(kid: &str) -> Self {
        Self::rsa(kid, RSA_PRIMARY_PEM, RSA_PRIMARY_N)
    }

    /// RS256 signer over the rogue RSA fixture. Its JWK describes the rogue
    /// key; tests that forge signatures publish a different signer's JWK.
    pub fn rsa_rogue(kid: &str) -> Self {
        Self::rsa(kid, RSA_ROGUE_PEM, RSA_ROGUE_N)
    }

    fn rsa(kid: &str, pem: &str, n: &str) -> Self {
        let encoding_key =
            EncodingKey::from_rsa_pem(pem.as_bytes()).expect("Failed to load RSA test key");
        Self {
            kid: kid.to_string(),
            algorithm: Algorithm::RS256,
            encoding_key,
            jwk: json!({
                "kty": "RSA",
                "kid": kid,
                "alg": "RS256",
                "use": "sig",
                "n": n,
                "e": RSA_E,
            }),
        }
    }

    /// EdDSA signer over a seeded Ed25519 keypair.
    pub fn ed25519(seed: u8, kid: &str) -> Self {
        let (public_key, pkcs8) = test_ed25519_key(seed).expect("Failed to create test keypair");
        Self {
            kid: kid.to_string(),
            algorithm: Algorithm::EdDSA,
            encoding_key: EncodingKey::from_ed_der(&pkcs8),
            jwk: json!({
                "kty": "OKP",
                "kid": kid,
                "crv": "Ed25519",
                "x": URL_SAFE_NO_PAD.encode(&public_key),
                "alg": "EdDSA",
                "use": "sig",
            }),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Default header: this signer's algorithm, `typ` JWT, and its `kid`.
    pub fn header(&self) -> Header {
        let mut header = Header::new(self.algorithm);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());
        header
    }

    /// Sign `claims` with the default header.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_header(&self.header(), claims)
    }

    /// Sign `claims` with a caller-supplied header. The signature is always
    /// made with this signer's key, whatever the header declares.
    pub fn sign_with_header(&self, header: &Header, claims: &Value) -> String {
        encode(header, claims, &self.encoding_key).expect("Failed to sign token")
    }

    /// The JWK a key endpoint publishes for this key.
    pub fn jwk_json(&self) -> Value {
        self.jwk.clone()
    }

    pub fn jwk(&self) -> Jwk {
        serde_json::from_value(self.jwk.clone()).expect("Test JWK must deserialize")
    }
}

/// A key set document publishing each signer's JWK.
pub fn jwks_json(signers: &[&TestSigner]) -> Value {
    json!({ "keys": signers.iter().map(|s| s.jwk_json()).collect::<Vec<_>>() })
}
