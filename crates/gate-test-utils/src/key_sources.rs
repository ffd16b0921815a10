//! In-memory key source with controllable failures.

use access_gate::auth::jwks::{Jwk, KeySource};
use access_gate::errors::KeySetError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Key source serving a fixed, replaceable key list.
///
/// Counts every fetch so tests can assert how often the cache went remote.
/// An optional delay holds each fetch open to exercise overlapping callers.
pub struct FakeKeySource {
    keys: Mutex<Vec<Jwk>>,
    failing: AtomicBool,
    fetch_count: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeKeySource {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self {
            keys: Mutex::new(keys),
            failing: AtomicBool::new(false),
            fetch_count: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep for `delay` inside every fetch. The key list is captured before
    /// the sleep, like a server answering slowly with what it had published.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// A source whose every fetch fails.
    pub fn failing() -> Self {
        let source = Self::new(Vec::new());
        source.set_failing(true);
        source
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Replace the published keys (simulates rotation).
    pub fn set_keys(&self, keys: Vec<Jwk>) {
        *self.keys.lock().unwrap() = keys;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl KeySource for FakeKeySource {
    async fn fetch(&self) -> Result<Vec<Jwk>, KeySetError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing.load(Ordering::SeqCst);
        let keys = self.keys.lock().unwrap().clone();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if failing {
            return Err(KeySetError::Fetch("fake key source unavailable".to_string()));
        }

        Ok(keys)
    }
}
