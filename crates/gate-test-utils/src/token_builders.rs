//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating identity token claims.

use chrono::{Duration, Utc};
use serde_json::{Map, Value};

/// Builder for creating test JWT claims
///
/// Defaults mirror a freshly issued identity token: `iat` ten seconds ago,
/// `exp` one hour out.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_email("alice@example.com")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: Option<String>,
    email: Option<String>,
    iat: Option<i64>,
    exp: Option<i64>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: Some("test-subject".to_string()),
            email: None,
            iat: Some((now - Duration::seconds(10)).timestamp()),
            exp: Some((now + Duration::seconds(3600)).timestamp()),
            extra: Map::new(),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Already expired one minute ago
    pub fn expired(self) -> Self {
        self.expires_in(-60)
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = Some(timestamp);
        self
    }

    pub fn omit_iat(mut self) -> Self {
        self.iat = None;
        self
    }

    pub fn omit_exp(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Add any other claim (`aud`, `iss`, `client_id`, ...)
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = self.extra;
        if let Some(sub) = self.sub {
            claims.insert("sub".to_string(), Value::from(sub));
        }
        if let Some(email) = self.email {
            claims.insert("email".to_string(), Value::from(email));
        }
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), Value::from(iat));
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), Value::from(exp));
        }
        Value::Object(claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
