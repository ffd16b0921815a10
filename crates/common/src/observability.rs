//! Tracing subscriber setup shared by Access Gate binaries.

use crate::config::ObservabilityConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter directive used when `RUST_LOG` is absent.
///
/// `crate_filter` lists target prefixes (e.g. `"access_gate,common,gate"`);
/// each gets the configured level. Events logged under a custom `target:`
/// are only kept if some prefix matches that target.
#[must_use]
pub fn default_directive(config: &ObservabilityConfig, crate_filter: &str) -> String {
    crate_filter
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| format!("{name}={}", config.log_level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this twice
/// is a no-op for the second call.
pub fn init_tracing(config: &ObservabilityConfig, crate_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(config, crate_filter).into());

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        tracing::debug!(target: "common.observability", error = %e, "Tracing subscriber already installed");
    }
}
