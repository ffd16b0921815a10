//! User directory lookup.
//!
//! The directory itself is an external service; this module defines the
//! contract the authorizer consumes and the mapping from the directory's
//! admin user document to an [`IdentityStatus`].

use crate::errors::DirectoryError;
use serde::{Deserialize, Serialize};

/// Attribute flag that disables an otherwise confirmed account.
pub const DISABLED_ATTRIBUTE: &str = "custom:disabled";

/// Account status marking a user who completed sign-up.
pub const CONFIRMED_STATUS: &str = "CONFIRMED";

/// Live status of a directory user. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityStatus {
    pub username: String,
    pub is_confirmed: bool,
    pub is_disabled: bool,
}

/// One name/value attribute on a directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserAttribute {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// The directory's admin user document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DirectoryRecord {
    pub username: String,

    pub user_status: String,

    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    #[serde(default)]
    pub user_attributes: Vec<UserAttribute>,
}

fn enabled_by_default() -> bool {
    true
}

impl DirectoryRecord {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.user_attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn into_status(self) -> IdentityStatus {
        let flagged = self
            .attribute(DISABLED_ATTRIBUTE)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        IdentityStatus {
            is_confirmed: self.user_status == CONFIRMED_STATUS,
            is_disabled: !self.enabled || flagged,
            username: self.username,
        }
    }
}

/// Lookup of a user's live account status.
///
/// Implementations report a missing user as `NotFound` and every other
/// failure (network, throttling) as `Transient`.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup(&self, username: &str) -> Result<IdentityStatus, DirectoryError>;
}

/// In-memory directory for tests and local runs.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    pub struct StaticDirectory {
        records: HashMap<String, DirectoryRecord>,
        /// Number of lookups made.
        call_count: AtomicUsize,
        /// Whether every lookup fails transiently.
        return_error: bool,
        delay: Option<Duration>,
    }

    impl StaticDirectory {
        pub fn new(records: Vec<DirectoryRecord>) -> Self {
            Self {
                records: records
                    .into_iter()
                    .map(|r| (r.username.clone(), r))
                    .collect(),
                call_count: AtomicUsize::new(0),
                return_error: false,
                delay: None,
            }
        }

        /// A directory holding one confirmed, enabled user.
        pub fn with_confirmed(username: &str) -> Self {
            Self::new(vec![record(username, CONFIRMED_STATUS, true, &[])])
        }

        /// A directory whose every lookup fails transiently.
        pub fn failing() -> Self {
            Self {
                return_error: true,
                ..Self::new(Vec::new())
            }
        }

        /// Delay each lookup, for exercising lookup timeouts.
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    /// Build a record with the given status, enabled flag and attributes.
    pub fn record(
        username: &str,
        user_status: &str,
        enabled: bool,
        attributes: &[(&str, &str)],
    ) -> DirectoryRecord {
        DirectoryRecord {
            username: username.to_string(),
            user_status: user_status.to_string(),
            enabled,
            user_attributes: attributes
                .iter()
                .map(|(name, value)| UserAttribute {
                    name: (*name).to_string(),
                    value: (*value).to_string(),
                })
                .collect(),
        }
    }

    #[async_trait::async_trait]
    impl UserDirectory for StaticDirectory {
        async fn lookup(&self, username: &str) -> Result<IdentityStatus, DirectoryError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.return_error {
                return Err(DirectoryError::Transient(
                    "Mock directory error".to_string(),
                ));
            }

            self.records
                .get(username)
                .cloned()
                .map(DirectoryRecord::into_status)
                .ok_or(DirectoryError::NotFound)
        }
    }
}
