//! Signing key set cache.
//!
//! Fetches the identity provider's published JSON Web Key Set from
//! `/.well-known/jwks.json` and caches it as an immutable snapshot with a
//! configurable TTL.
//!
//! # Security
//!
//! - Each key's verification algorithm is bound when the key set is fetched,
//!   never taken from a token header
//! - Keys not marked for signatures, or with unusable material, are dropped
//! - A failed refresh never replaces the current snapshot; an expired snapshot
//!   keeps serving until a refresh succeeds because rotation windows overlap
//! - HTTPS should be used in production (the derived URL always is)

use crate::errors::KeySetError;
use common::jwt::decode_jwk_component;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tracing::instrument;

/// Default cache TTL in seconds (1 hour).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Largest key set document accepted from the key endpoint (64KB).
///
/// Published key sets hold a handful of keys, a few KB at most.
pub const MAX_JWKS_BODY_BYTES: usize = 64 * 1024;

/// Ed25519 public keys are exactly 32 bytes.
const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// JSON Web Key as published by the key endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "EC" or "OKP").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Algorithm the key is meant for (e.g. "RS256").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Curve name for EC and OKP keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate or OKP public key (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// A verification key with its algorithm bound at fetch time.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Convert a published JWK into a verification key.
    ///
    /// The algorithm comes from the JWK's `alg` when present, otherwise from
    /// its key type (`RS256` for RSA, `ES256`/`ES384` by curve for EC, `EdDSA`
    /// for OKP). An `alg` that does not belong to the key type is rejected.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError::InvalidDocument` describing why the key is unusable.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, KeySetError> {
        let invalid = |reason: &str| {
            KeySetError::InvalidDocument(format!("key '{}': {}", jwk.kid, reason))
        };

        if jwk.kid.is_empty() {
            return Err(KeySetError::InvalidDocument("key with empty kid".to_string()));
        }

        if let Some(key_use) = &jwk.key_use {
            if key_use != "sig" {
                return Err(invalid("not a signature key"));
            }
        }

        let declared = jwk
            .alg
            .as_deref()
            .map(Algorithm::from_str)
            .transpose()
            .map_err(|_| invalid("unsupported alg"))?;

        let (algorithm, decoding_key) = match jwk.kty.as_str() {
            "RSA" => {
                let algorithm = declared.unwrap_or(Algorithm::RS256);
                if !matches!(
                    algorithm,
                    Algorithm::RS256
                        | Algorithm::RS384
                        | Algorithm::RS512
                        | Algorithm::PS256
                        | Algorithm::PS384
                        | Algorithm::PS512
                ) {
                    return Err(invalid("alg does not match RSA key type"));
                }
                let (Some(n), Some(e)) = (&jwk.n, &jwk.e) else {
                    return Err(invalid("RSA key missing n or e"));
                };
                let key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|_| invalid("invalid RSA components"))?;
                (algorithm, key)
            }
            "EC" => {
                let curve_alg = match jwk.crv.as_deref() {
                    Some("P-256") => Algorithm::ES256,
                    Some("P-384") => Algorithm::ES384,
                    _ => return Err(invalid("unsupported EC curve")),
                };
                let algorithm = declared.unwrap_or(curve_alg);
                if algorithm != curve_alg {
                    return Err(invalid("alg does not match EC curve"));
                }
                let (Some(x), Some(y)) = (&jwk.x, &jwk.y) else {
                    return Err(invalid("EC key missing x or y"));
                };
                let key = DecodingKey::from_ec_components(x, y)
                    .map_err(|_| invalid("invalid EC components"))?;
                (algorithm, key)
            }
            "OKP" => {
                if jwk.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                    return Err(invalid("unsupported OKP curve"));
                }
                let algorithm = declared.unwrap_or(Algorithm::EdDSA);
                if algorithm != Algorithm::EdDSA {
                    return Err(invalid("alg does not match OKP key type"));
                }
                let x = jwk.x.as_ref().ok_or_else(|| invalid("OKP key missing x"))?;
                let public_key = decode_jwk_component(x)
                    .map_err(|_| invalid("invalid OKP public key encoding"))?;
                if public_key.len() != ED25519_PUBLIC_KEY_LEN {
                    return Err(invalid("OKP public key has wrong length"));
                }
                (algorithm, DecodingKey::from_ed_der(&public_key))
            }
            _ => return Err(invalid("unsupported key type")),
        };

        Ok(Self {
            key_id: jwk.kid.clone(),
            algorithm,
            decoding_key,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The only algorithm this key verifies.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// One immutable fetch of the key set.
///
/// Replaced wholesale on refresh, never mutated.
#[derive(Debug)]
pub struct KeySetSnapshot {
    keys: Vec<SigningKey>,
    fetched_at: Instant,
    ttl: Duration,
}

impl KeySetSnapshot {
    /// Build a snapshot from published JWKs.
    ///
    /// Unusable keys are skipped with a warning and duplicate key IDs keep the
    /// first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError::InvalidDocument` if no usable key remains.
    pub fn from_jwks(
        jwks: Vec<Jwk>,
        fetched_at: Instant,
        ttl: Duration,
    ) -> Result<Self, KeySetError> {
        let published = jwks.len();
        let mut keys: Vec<SigningKey> = Vec::with_capacity(published);

        for jwk in &jwks {
            if keys.iter().any(|k| k.key_id == jwk.kid) {
                tracing::warn!(target: "gate.auth.jwks", kid = %jwk.kid, "Duplicate kid in key set, keeping first");
                continue;
            }
            match SigningKey::from_jwk(jwk) {
                Ok(key) => keys.push(key),
                Err(e) => {
                    tracing::warn!(target: "gate.auth.jwks", error = %e, "Skipping unusable key");
                }
            }
        }

        if keys.is_empty() {
            return Err(KeySetError::InvalidDocument(format!(
                "no usable signing keys among {} published",
                published
            )));
        }

        Ok(Self {
            keys,
            fetched_at,
            ttl,
        })
    }

    /// Find a key by ID. Key sets hold a handful of keys, so this scans.
    pub fn find(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|k| k.key_id == kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_ids(&self) -> Vec<&str> {
        self.keys.iter().map(|k| k.key_id.as_str()).collect()
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// True once more than `ttl` has elapsed since the fetch.
    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) > self.ttl
    }
}

/// Where key sets come from.
#[async_trait::async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the currently published keys.
    async fn fetch(&self) -> Result<Vec<Jwk>, KeySetError>;
}

/// Key source backed by an HTTPS endpoint.
pub struct HttpKeySource {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS (carries the fetch timeout).
    http_client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a source for an explicit JWKS URL.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError::Fetch` if the HTTP client cannot be built.
    pub fn new(jwks_url: String, timeout: Duration) -> Result<Self, KeySetError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeySetError::Fetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            jwks_url,
            http_client,
        })
    }

    /// Create a source for a user pool's well-known JWKS location.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError::Fetch` if the HTTP client cannot be built.
    pub fn for_user_pool(
        region: &str,
        user_pool_id: &str,
        timeout: Duration,
    ) -> Result<Self, KeySetError> {
        Self::new(
            crate::config::user_pool_jwks_url(region, user_pool_id),
            timeout,
        )
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

#[async_trait::async_trait]
impl KeySource for HttpKeySource {
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    async fn fetch(&self) -> Result<Vec<Jwk>, KeySetError> {
        tracing::debug!(target: "gate.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to fetch JWKS");
                KeySetError::Fetch(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "gate.auth.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(KeySetError::Fetch(format!(
                "JWKS endpoint returned {}",
                status
            )));
        }

        let body = read_limited_body(response, MAX_JWKS_BODY_BYTES).await?;

        let jwks: JwksResponse = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to parse JWKS response");
            KeySetError::InvalidDocument(e.to_string())
        })?;

        Ok(jwks.keys)
    }
}

/// Read a response body, refusing anything larger than `limit` bytes.
///
/// The declared `Content-Length` is checked first; chunked bodies are
/// counted as they stream in.
async fn read_limited_body(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, KeySetError> {
    let too_large = || {
        tracing::error!(target: "gate.auth.jwks", limit_bytes = limit, "JWKS response too large");
        KeySetError::InvalidDocument(format!("key set document exceeds {limit} bytes"))
    };

    let declared = response.content_length().unwrap_or(0);
    if usize::try_from(declared).map_or(true, |len| len > limit) {
        return Err(too_large());
    }

    let mut body = Vec::with_capacity(usize::try_from(declared).unwrap_or(0));
    while let Some(chunk) = response.chunk().await.map_err(|e| {
        tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to read JWKS response");
        KeySetError::Fetch(e.to_string())
    })? {
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

type RefreshOutcome = Result<Arc<KeySetSnapshot>, KeySetError>;

/// Watch channel carrying the result of the refresh in flight.
type InFlight = watch::Receiver<Option<RefreshOutcome>>;

/// Process-wide signing key cache.
///
/// Construct once and share by `Arc`. Concurrent callers observe either the
/// previous or the new snapshot; the write lock is held only to swap the
/// pointer, never across the fetch.
///
/// At most one fetch runs at a time: callers that need a refresh while one
/// is in flight wait for its result instead of fetching again. A snapshot
/// is never replaced by one whose fetch started earlier.
pub struct KeySetCache {
    source: Arc<dyn KeySource>,
    ttl: Duration,
    snapshot: RwLock<Option<Arc<KeySetSnapshot>>>,
    in_flight: Mutex<Option<InFlight>>,
}

/// Clears the in-flight slot when the leading refresh finishes or is dropped.
struct InFlightGuard<'a> {
    slot: &'a Mutex<Option<InFlight>>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl KeySetCache {
    /// Create an empty cache; the first `get_keys` call fetches.
    pub fn new(source: Arc<dyn KeySource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            snapshot: RwLock::new(None),
            in_flight: Mutex::new(None),
        }
    }

    /// Create an empty cache with the default one hour TTL.
    pub fn with_default_ttl(source: Arc<dyn KeySource>) -> Self {
        Self::new(source, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the current key set, refreshing it if absent or older than the TTL.
    ///
    /// If the refresh fails and any snapshot exists, that snapshot is returned
    /// even though it is past its TTL. The next call retries the fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetch error only when no snapshot has ever been stored.
    #[instrument(skip_all)]
    pub async fn get_keys(&self) -> Result<Arc<KeySetSnapshot>, KeySetError> {
        if let Some(cached) = self.current().await {
            if !cached.is_stale(Instant::now()) {
                tracing::debug!(target: "gate.auth.jwks", key_count = cached.len(), "JWKS cache hit");
                return Ok(cached);
            }
            tracing::debug!(target: "gate.auth.jwks", "JWKS cache expired, refreshing");
        }

        match self.refresh().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => match self.current().await {
                Some(stale) => {
                    tracing::warn!(
                        target: "gate.auth.jwks",
                        error = %e,
                        age_secs = stale.fetched_at().elapsed().as_secs(),
                        "JWKS refresh failed, serving stale key set"
                    );
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    /// Fetch and swap in a new snapshot regardless of age. Joins a refresh
    /// already in flight rather than starting a second one.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the previous snapshot is left in place.
    pub async fn force_refresh(&self) -> Result<Arc<KeySetSnapshot>, KeySetError> {
        self.refresh().await
    }

    /// The stored snapshot, without fetching.
    pub async fn current(&self) -> Option<Arc<KeySetSnapshot>> {
        self.snapshot.read().await.clone()
    }

    async fn refresh(&self) -> RefreshOutcome {
        loop {
            let leader = {
                let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
                // A closed channel means the leader was dropped mid-fetch
                let running = slot
                    .as_ref()
                    .filter(|rx| rx.has_changed().is_ok())
                    .cloned();
                match running {
                    Some(rx) => Err(rx),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        *slot = Some(rx);
                        Ok(tx)
                    }
                }
            };

            let mut rx = match leader {
                Ok(tx) => {
                    let _clear = InFlightGuard {
                        slot: &self.in_flight,
                    };
                    let outcome = self.fetch_and_install().await;
                    tx.send_replace(Some(outcome.clone()));
                    return outcome;
                }
                Err(rx) => rx,
            };

            tracing::debug!(target: "gate.auth.jwks", "Joining in-flight JWKS refresh");
            let shared = match rx.wait_for(Option::is_some).await {
                Ok(done) => (*done).clone(),
                Err(_) => None,
            };
            if let Some(outcome) = shared {
                return outcome;
            }
            tracing::debug!(target: "gate.auth.jwks", "In-flight JWKS refresh abandoned, retrying");
        }
    }

    async fn fetch_and_install(&self) -> RefreshOutcome {
        let started = Instant::now();
        let jwks = self.source.fetch().await?;
        let snapshot = KeySetSnapshot::from_jwks(jwks, started, self.ttl)?;
        Ok(self.install(snapshot).await)
    }

    /// Swap in `snapshot` unless the stored one was fetched later.
    ///
    /// Snapshots are stamped with their fetch start, so a slow fetch that
    /// began before a newer one completed cannot roll the key set back.
    async fn install(&self, snapshot: KeySetSnapshot) -> Arc<KeySetSnapshot> {
        let mut slot = self.snapshot.write().await;

        if let Some(current) = slot.as_ref() {
            if current.fetched_at() > snapshot.fetched_at() {
                tracing::debug!(
                    target: "gate.auth.jwks",
                    kids = ?snapshot.key_ids(),
                    "Discarding key set older than the cached one"
                );
                return Arc::clone(current);
            }
        }

        let snapshot = Arc::new(snapshot);
        *slot = Some(Arc::clone(&snapshot));
        drop(slot);

        tracing::info!(
            target: "gate.auth.jwks",
            key_count = snapshot.len(),
            kids = ?snapshot.key_ids(),
            "JWKS cache refreshed"
        );

        snapshot
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // Modulus and exponent of a real RSA-2048 key; only parsed, never used to verify.
    const TEST_N: &str = "rdMnK5ItebX-YmFSZkXTPM_yEw92Xfw5cnAJMNvpYYkdez00NiQPQyZzFM8DyPhn7rUiRQGU8OFOPEs-tuk0WVBq_z7lp_mm8kulpVgzhQbVgBkNkdzr2EgSSUfmCnLJIqDD4wrV-L4eoFxN_1I3dLlitN5hd7bcmlWXM_GoOAiXk2I-2JMFwiwuIKckBFyPO4lbBvSdm9KweNqmHmwv2eEyku_f_SBjsVgazfOyajPpnQj91j8_gCt9ekBHy5fl7k2CX2R2qSapUqa5ep1nvnNYCQsTkcDKmsAP4saPMN4YRDiAL0qejiCxw16cyWdu_6_9QtE5Lorx1jCwo923Hw";
    const TEST_E: &str = "AQAB";
    const TEST_ED25519_X: &str = "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo";

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: kid.to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            n: Some(TEST_N.to_string()),
            e: Some(TEST_E.to_string()),
            crv: None,
            x: None,
            y: None,
        }
    }

    fn okp_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "OKP".to_string(),
            kid: kid.to_string(),
            alg: None,
            key_use: None,
            n: None,
            e: None,
            crv: Some("Ed25519".to_string()),
            x: Some(TEST_ED25519_X.to_string()),
            y: None,
        }
    }

    #[test]
    fn test_jwk_deserialization_identity_provider_shape() {
        let json = r#"{
            "alg": "RS256",
            "e": "AQAB",
            "kid": "abcd1234",
            "kty": "RSA",
            "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
            "use": "sig"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid, "abcd1234");
        assert_eq!(jwk.alg.as_deref(), Some("RS256"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert_eq!(jwk.e.as_deref(), Some("AQAB"));
        assert!(jwk.x.is_none());
    }

    #[test]
    fn test_jwks_response_deserialization() {
        let json = r#"{
            "keys": [
                {"kty": "RSA", "kid": "key-1", "n": "AQAB", "e": "AQAB"},
                {"kty": "OKP", "kid": "key-2", "crv": "Ed25519", "x": "AA"}
            ]
        }"#;

        let jwks: JwksResponse = serde_json::from_str(json).unwrap();

        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys.first().unwrap().kid, "key-1");
        assert_eq!(jwks.keys.get(1).unwrap().kid, "key-2");
    }

    #[test]
    fn test_signing_key_binds_rsa_algorithm() {
        let key = SigningKey::from_jwk(&rsa_jwk("k1")).unwrap();
        assert_eq!(key.key_id(), "k1");
        assert_eq!(key.algorithm(), Algorithm::RS256);
    }

    #[test]
    fn test_signing_key_defaults_rsa_algorithm_when_absent() {
        let mut jwk = rsa_jwk("k1");
        jwk.alg = None;
        assert_eq!(
            SigningKey::from_jwk(&jwk).unwrap().algorithm(),
            Algorithm::RS256
        );
    }

    #[test]
    fn test_signing_key_defaults_okp_to_eddsa() {
        let key = SigningKey::from_jwk(&okp_jwk("ed-1")).unwrap();
        assert_eq!(key.algorithm(), Algorithm::EdDSA);
    }

    #[test]
    fn test_signing_key_rejects_alg_from_other_family() {
        // An RSA key advertised for HMAC must never become an HMAC secret
        let mut jwk = rsa_jwk("k1");
        jwk.alg = Some("HS256".to_string());
        assert!(matches!(
            SigningKey::from_jwk(&jwk),
            Err(KeySetError::InvalidDocument(msg)) if msg.contains("does not match")
        ));

        let mut jwk = okp_jwk("ed-1");
        jwk.alg = Some("RS256".to_string());
        assert!(SigningKey::from_jwk(&jwk).is_err());
    }

    #[test]
    fn test_signing_key_rejects_unknown_alg_name() {
        let mut jwk = rsa_jwk("k1");
        jwk.alg = Some("none".to_string());
        assert!(SigningKey::from_jwk(&jwk).is_err());
    }

    #[test]
    fn test_signing_key_rejects_encryption_keys() {
        let mut jwk = rsa_jwk("k1");
        jwk.key_use = Some("enc".to_string());
        assert!(SigningKey::from_jwk(&jwk).is_err());
    }

    #[test]
    fn test_signing_key_rejects_missing_material() {
        let mut jwk = rsa_jwk("k1");
        jwk.n = None;
        assert!(SigningKey::from_jwk(&jwk).is_err());

        let mut jwk = okp_jwk("ed-1");
        jwk.x = Some("dGVzdA".to_string()); // 4 bytes
        assert!(SigningKey::from_jwk(&jwk).is_err());
    }

    #[test]
    fn test_signing_key_rejects_unsupported_key_type() {
        let mut jwk = rsa_jwk("k1");
        jwk.kty = "oct".to_string();
        assert!(SigningKey::from_jwk(&jwk).is_err());
    }

    #[test]
    fn test_signing_key_debug_omits_material() {
        let key = SigningKey::from_jwk(&rsa_jwk("k1")).unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("k1"));
        assert!(debug.contains("RS256"));
    }

    #[test]
    fn test_snapshot_skips_bad_keys_and_duplicates() {
        let mut bad = rsa_jwk("bad");
        bad.kty = "oct".to_string();
        let dup = okp_jwk("k1");

        let snapshot = KeySetSnapshot::from_jwks(
            vec![rsa_jwk("k1"), bad, dup, okp_jwk("k2")],
            Instant::now(),
            Duration::from_secs(60),
        )
        .unwrap();

        assert_eq!(snapshot.key_ids(), vec!["k1", "k2"]);
        assert_eq!(
            snapshot.find("k1").unwrap().algorithm(),
            Algorithm::RS256,
            "first occurrence of a duplicate kid wins"
        );
        assert!(snapshot.find("bad").is_none());
    }

    #[test]
    fn test_snapshot_requires_a_usable_key() {
        let mut bad = rsa_jwk("bad");
        bad.e = None;

        let result = KeySetSnapshot::from_jwks(vec![bad], Instant::now(), Duration::from_secs(60));
        assert!(matches!(result, Err(KeySetError::InvalidDocument(_))));

        let result = KeySetSnapshot::from_jwks(vec![], Instant::now(), Duration::from_secs(60));
        assert!(matches!(result, Err(KeySetError::InvalidDocument(_))));
    }

    #[test]
    fn test_snapshot_staleness_boundary() {
        let fetched_at = Instant::now();
        let snapshot =
            KeySetSnapshot::from_jwks(vec![rsa_jwk("k1")], fetched_at, Duration::from_secs(60))
                .unwrap();

        assert!(!snapshot.is_stale(fetched_at));
        assert!(!snapshot.is_stale(fetched_at + Duration::from_secs(60)));
        assert!(snapshot.is_stale(fetched_at + Duration::from_secs(61)));
    }

    #[test]
    fn test_http_source_for_user_pool_url() {
        let source = HttpKeySource::for_user_pool(
            "ap-northeast-1",
            "ap-northeast-1_AbCdEf",
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(
            source.jwks_url(),
            "https://cognito-idp.ap-northeast-1.amazonaws.com/ap-northeast-1_AbCdEf/.well-known/jwks.json"
        );
    }

    struct NoSource;

    #[async_trait::async_trait]
    impl KeySource for NoSource {
        async fn fetch(&self) -> Result<Vec<Jwk>, KeySetError> {
            Err(KeySetError::Fetch("unused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_install_keeps_newer_snapshot() {
        let cache = KeySetCache::with_default_ttl(Arc::new(NoSource));
        let ttl = cache.ttl();
        let earlier = Instant::now();
        let later = earlier + Duration::from_secs(1);

        let newer =
            KeySetSnapshot::from_jwks(vec![rsa_jwk("k1"), okp_jwk("k2")], later, ttl).unwrap();
        cache.install(newer).await;

        // A fetch that started first but finished last
        let older = KeySetSnapshot::from_jwks(vec![rsa_jwk("k1")], earlier, ttl).unwrap();
        let kept = cache.install(older).await;

        assert_eq!(kept.key_ids(), vec!["k1", "k2"]);
        assert_eq!(cache.current().await.unwrap().key_ids(), vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn test_install_replaces_older_snapshot() {
        let cache = KeySetCache::with_default_ttl(Arc::new(NoSource));
        let ttl = cache.ttl();
        let earlier = Instant::now();

        cache
            .install(KeySetSnapshot::from_jwks(vec![rsa_jwk("k1")], earlier, ttl).unwrap())
            .await;
        cache
            .install(
                KeySetSnapshot::from_jwks(
                    vec![okp_jwk("k2")],
                    earlier + Duration::from_secs(1),
                    ttl,
                )
                .unwrap(),
            )
            .await;

        assert_eq!(cache.current().await.unwrap().key_ids(), vec!["k2"]);
    }
}
