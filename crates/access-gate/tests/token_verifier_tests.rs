//! Token verification integration tests.
//!
//! Tokens are minted with the fixed RSA and seeded Ed25519 fixtures and
//! verified against an in-memory key source.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]

use access_gate::auth::{KeySetCache, TokenVerifier, VerifierOptions};
use access_gate::authz::{authorize_bearer, EdgeDecision};
use access_gate::errors::{KeySetError, VerifyError};
use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use common::jwt::MAX_JWT_SIZE_BYTES;
use gate_test_utils::{FakeKeySource, TestSigner, TestTokenBuilder, RSA_PRIMARY_N};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use std::sync::Arc;

fn verifier_for(signers: &[&TestSigner], options: VerifierOptions) -> TokenVerifier {
    let source = Arc::new(FakeKeySource::new(signers.iter().map(|s| s.jwk()).collect()));
    let cache = Arc::new(KeySetCache::with_default_ttl(source));
    TokenVerifier::new(cache, options)
}

fn default_verifier(signer: &TestSigner) -> TokenVerifier {
    verifier_for(&[signer], VerifierOptions::default())
}

#[tokio::test]
async fn test_valid_rsa_token_round_trip() -> Result<()> {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);
    let now = Utc::now().timestamp();

    let token = signer.sign(
        &TestTokenBuilder::new()
            .for_user("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee")
            .with_email("alice@example.com")
            .issued_at(now - 10)
            .build(),
    );

    let claims = verifier.verify(&token).await?;

    assert_eq!(
        claims.subject.as_deref(),
        Some("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee")
    );
    assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
    assert_eq!(claims.key_id_used, "k1");
    assert_eq!(claims.issued_at, now - 10);

    Ok(())
}

#[tokio::test]
async fn test_replayed_token_with_past_expiry_is_expired() {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);

    let token = signer.sign(
        &TestTokenBuilder::new()
            .for_user("alice")
            .issued_at(Utc::now().timestamp() - 7200)
            .expired()
            .build(),
    );

    assert_eq!(verifier.verify(&token).await.unwrap_err(), VerifyError::Expired);
}

#[tokio::test]
async fn test_expiry_at_now_is_expired() {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);

    let token = signer.sign(&TestTokenBuilder::new().expires_in(0).build());

    assert_eq!(verifier.verify(&token).await.unwrap_err(), VerifyError::Expired);
}

#[tokio::test]
async fn test_unknown_kid() {
    let published = TestSigner::rsa_primary("k1");
    let unpublished = TestSigner::ed25519(9, "k-unknown");
    let verifier = default_verifier(&published);

    let token = unpublished.sign(&TestTokenBuilder::new().build());

    assert_eq!(
        verifier.verify(&token).await.unwrap_err(),
        VerifyError::UnknownKey
    );
}

#[tokio::test]
async fn test_rogue_key_under_published_kid_is_bad_signature() {
    let published = TestSigner::rsa_primary("k1");
    let rogue = TestSigner::rsa_rogue("k1");
    let verifier = default_verifier(&published);

    let token = rogue.sign(&TestTokenBuilder::new().for_user("mallory").build());

    assert_eq!(
        verifier.verify(&token).await.unwrap_err(),
        VerifyError::BadSignature
    );
}

#[tokio::test]
async fn test_tampered_payload_is_bad_signature() {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);

    let token = signer.sign(&TestTokenBuilder::new().for_user("alice").build());
    let parts: Vec<&str> = token.split('.').collect();
    let forged_claims = TestTokenBuilder::new().for_user("admin").build();
    let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
    let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    assert_eq!(
        verifier.verify(&tampered).await.unwrap_err(),
        VerifyError::BadSignature
    );
}

#[tokio::test]
async fn test_hmac_with_public_modulus_is_bad_signature() {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);

    // Algorithm confusion: HS256 keyed with the published RSA modulus
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("k1".to_string());
    let secret = URL_SAFE_NO_PAD.decode(RSA_PRIMARY_N).unwrap();
    let token = encode(
        &header,
        &TestTokenBuilder::new().build(),
        &EncodingKey::from_secret(&secret),
    )
    .unwrap();

    assert_eq!(
        verifier.verify(&token).await.unwrap_err(),
        VerifyError::BadSignature
    );
}

#[tokio::test]
async fn test_declared_algorithm_must_match_bound_algorithm() {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);

    // Validly signed with the right key, but PS256 rather than the bound RS256
    let mut header = signer.header();
    header.alg = Algorithm::PS256;
    let token = signer.sign_with_header(&header, &TestTokenBuilder::new().build());

    assert_eq!(
        verifier.verify(&token).await.unwrap_err(),
        VerifyError::BadSignature
    );
}

#[tokio::test]
async fn test_missing_required_claims() {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);

    let no_iat = signer.sign(&TestTokenBuilder::new().omit_iat().build());
    assert_eq!(
        verifier.verify(&no_iat).await.unwrap_err(),
        VerifyError::MissingClaim("iat")
    );

    let no_exp = signer.sign(&TestTokenBuilder::new().omit_exp().build());
    assert_eq!(
        verifier.verify(&no_exp).await.unwrap_err(),
        VerifyError::MissingClaim("exp")
    );
}

#[tokio::test]
async fn test_future_iat_beyond_skew_is_not_yet_valid() {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);
    let now = Utc::now().timestamp();

    let token = signer.sign(
        &TestTokenBuilder::new()
            .issued_at(now + 3600)
            .expires_in(7200)
            .build(),
    );
    assert_eq!(
        verifier.verify(&token).await.unwrap_err(),
        VerifyError::NotYetValid
    );

    // Within the five minute default skew
    let token = signer.sign(&TestTokenBuilder::new().issued_at(now + 60).build());
    assert!(verifier.verify(&token).await.is_ok());
}

#[tokio::test]
async fn test_malformed_tokens() {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);

    for token in ["", "not-a-token", "a.b", "a.b.c", "a.b.c.d"] {
        assert_eq!(
            verifier.verify(token).await.unwrap_err(),
            VerifyError::Malformed,
            "{token:?} should be malformed"
        );
    }

    let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
    assert_eq!(
        verifier.verify(&oversized).await.unwrap_err(),
        VerifyError::Malformed
    );
}

#[tokio::test]
async fn test_keys_unavailable_without_any_snapshot() {
    let cache = Arc::new(KeySetCache::with_default_ttl(Arc::new(
        FakeKeySource::failing(),
    )));
    let verifier = TokenVerifier::new(cache, VerifierOptions::default());
    let token = TestSigner::rsa_primary("k1").sign(&TestTokenBuilder::new().build());

    assert!(matches!(
        verifier.verify(&token).await.unwrap_err(),
        VerifyError::KeysUnavailable(KeySetError::Fetch(_))
    ));
}

#[tokio::test]
async fn test_eddsa_token() -> Result<()> {
    let signer = TestSigner::ed25519(1, "ed-1");
    let verifier = default_verifier(&signer);

    let claims = verifier
        .verify(&signer.sign(&TestTokenBuilder::new().for_user("bob").build()))
        .await?;

    assert_eq!(claims.subject.as_deref(), Some("bob"));
    Ok(())
}

#[tokio::test]
async fn test_audience_check_when_configured() -> Result<()> {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = verifier_for(
        &[&signer],
        VerifierOptions {
            audience: Some("client-123".to_string()),
            ..VerifierOptions::default()
        },
    );

    let id_token = signer.sign(
        &TestTokenBuilder::new()
            .with_claim("aud", json!("client-123"))
            .build(),
    );
    verifier.verify(&id_token).await?;

    let access_token = signer.sign(
        &TestTokenBuilder::new()
            .with_claim("client_id", json!("client-123"))
            .build(),
    );
    verifier.verify(&access_token).await?;

    let other = signer.sign(
        &TestTokenBuilder::new()
            .with_claim("aud", json!(["other-client"]))
            .build(),
    );
    assert_eq!(
        verifier.verify(&other).await.unwrap_err(),
        VerifyError::InvalidAudience
    );

    let none = signer.sign(&TestTokenBuilder::new().build());
    assert_eq!(
        verifier.verify(&none).await.unwrap_err(),
        VerifyError::InvalidAudience
    );

    Ok(())
}

#[tokio::test]
async fn test_audience_ignored_by_default() -> Result<()> {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);

    let token = signer.sign(
        &TestTokenBuilder::new()
            .with_claim("aud", json!("anything"))
            .build(),
    );

    verifier.verify(&token).await?;
    Ok(())
}

#[tokio::test]
async fn test_issuer_check_when_configured() -> Result<()> {
    let issuer = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_Example";
    let signer = TestSigner::rsa_primary("k1");
    let verifier = verifier_for(
        &[&signer],
        VerifierOptions {
            issuer: Some(issuer.to_string()),
            ..VerifierOptions::default()
        },
    );

    let good = signer.sign(&TestTokenBuilder::new().with_claim("iss", json!(issuer)).build());
    verifier.verify(&good).await?;

    let bad = signer.sign(
        &TestTokenBuilder::new()
            .with_claim("iss", json!("https://evil.example.com"))
            .build(),
    );
    assert_eq!(
        verifier.verify(&bad).await.unwrap_err(),
        VerifyError::InvalidIssuer
    );

    Ok(())
}

#[tokio::test]
async fn test_authorize_bearer_decisions() {
    let signer = TestSigner::rsa_primary("k1");
    let verifier = default_verifier(&signer);

    let good = signer.sign(&TestTokenBuilder::new().with_email("alice@example.com").build());
    match authorize_bearer(&verifier, &good).await {
        EdgeDecision::Allow(claims) => {
            assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        }
        EdgeDecision::Deny(e) => panic!("Expected allow, got deny: {e:?}"),
    }

    let expired = signer.sign(&TestTokenBuilder::new().expired().build());
    let decision = authorize_bearer(&verifier, &expired).await;
    assert!(!decision.is_allowed());
    assert!(matches!(decision, EdgeDecision::Deny(VerifyError::Expired)));
}
