//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for access grants.

use access_gate::authz::AccessGrant;

/// Custom assertions for access grants
///
/// # Example
/// ```rust,ignore
/// grant
///     .assert_confined_to("uploads/alice")
///     .assert_never_mentions("uploads/bob")
///     .assert_target("/home-bucket/uploads/alice");
/// ```
pub trait GrantAssertions {
    /// Assert every path in the policy is the partition or beneath it
    fn assert_confined_to(&self, partition: &str) -> &Self;

    /// Assert the serialized grant never contains `needle`
    fn assert_never_mentions(&self, needle: &str) -> &Self;

    /// Assert the virtual root maps to `target`
    fn assert_target(&self, target: &str) -> &Self;
}

impl GrantAssertions for AccessGrant {
    fn assert_confined_to(&self, partition: &str) -> &Self {
        let paths = self.policy.scoped_paths();
        assert!(!paths.is_empty(), "Policy references no paths");

        let beneath = format!("{partition}/");
        for p in paths {
            assert!(
                p == partition || p.starts_with(&beneath),
                "Policy path '{}' escapes partition '{}'",
                p,
                partition
            );
        }
        self
    }

    fn assert_never_mentions(&self, needle: &str) -> &Self {
        let response = self.to_response().expect("Grant must serialize");
        let wire = serde_json::to_string(&response).expect("Response must serialize");
        assert!(
            !wire.contains(needle),
            "Grant unexpectedly mentions '{}': {}",
            needle,
            wire
        );
        self
    }

    fn assert_target(&self, target: &str) -> &Self {
        assert_eq!(
            self.physical_target(),
            Some(target),
            "Unexpected home directory target"
        );
        self
    }
}
