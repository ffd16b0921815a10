//! Access Gate
//!
//! Operator entry point for both decision flows:
//!
//! - `verify [TOKEN]` checks one bearer token against the configured user
//!   pool.
//! - `grant <USERNAME>` issues a home directory grant from a directory
//!   record supplied as JSON.
//!
//! Each prints the decision as JSON and exits non-zero on deny.

use access_gate::auth::{HttpKeySource, KeySetCache, TokenVerifier, VerifierOptions};
use access_gate::authz::{authorize_bearer, EdgeDecision, HomeDirectoryAuthorizer};
use access_gate::config::{Config, HomeDirectoryConfig};
use access_gate::directory::mock::StaticDirectory;
use access_gate::directory::DirectoryRecord;
use access_gate::LOG_TARGETS;
use anyhow::Context;
use clap::{Parser, Subcommand};
use common::config::ObservabilityConfig;
use common::observability::init_tracing;
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "access-gate", version, about = "Token and home directory access decisions")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a bearer token (argument or stdin) against the user pool keys.
    Verify {
        /// Token, optionally prefixed with `Bearer `. Read from stdin if absent.
        token: Option<String>,
    },
    /// Issue a home directory grant for a directory user.
    Grant {
        username: String,
        /// Directory record JSON file. Read from stdin if absent.
        #[arg(long)]
        record: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&ObservabilityConfig::from_env(), LOG_TARGETS);

    let (output, allowed) = match cli.cmd {
        Command::Verify { token } => verify(token).await?,
        Command::Grant { username, record } => grant(&username, record.as_deref()).await?,
    };

    println!("{output}");
    Ok(if allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn verify(token: Option<String>) -> anyhow::Result<(Value, bool)> {
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        user_pool_id = %config.user_pool_id,
        region = %config.region,
        jwks_url = %config.jwks_url,
        jwks_cache_ttl_seconds = config.jwks_cache_ttl.as_secs(),
        "Configuration loaded successfully"
    );

    let raw = match token {
        Some(arg) => arg,
        None => read_stdin().context("reading token from stdin")?,
    };
    let token = bearer_token(&raw)?;

    let source = HttpKeySource::new(config.jwks_url.clone(), config.jwks_fetch_timeout)?;
    let cache = Arc::new(KeySetCache::new(Arc::new(source), config.jwks_cache_ttl));
    let verifier = TokenVerifier::new(cache, VerifierOptions::from_config(&config));

    Ok(match authorize_bearer(&verifier, &token).await {
        EdgeDecision::Allow(claims) => (
            json!({
                "allowed": true,
                "subject": claims.subject,
                "email": claims.email,
            }),
            true,
        ),
        EdgeDecision::Deny(e) => (
            json!({
                "allowed": false,
                "reason": e.reason(),
            }),
            false,
        ),
    })
}

async fn grant(username: &str, record: Option<&Path>) -> anyhow::Result<(Value, bool)> {
    let config = HomeDirectoryConfig::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        home_bucket = %config.home_bucket,
        home_prefix = %config.home_prefix,
        "Configuration loaded successfully"
    );

    let raw = match record {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading directory record from {}", path.display()))?,
        None => read_stdin().context("reading directory record from stdin")?,
    };
    let record: DirectoryRecord =
        serde_json::from_str(&raw).context("parsing directory record")?;

    let directory = Arc::new(StaticDirectory::new(vec![record]));
    let authorizer = HomeDirectoryAuthorizer::new(config, directory);

    Ok(match authorizer.grant_for(username).await {
        Ok(grant) => (serde_json::to_value(grant.to_response()?)?, true),
        Err(e) => (
            json!({
                "allowed": false,
                "reason": e.reason(),
            }),
            false,
        ),
    })
}

fn read_stdin() -> std::io::Result<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// Strip an `Authorization`-style `Bearer ` prefix and surrounding space.
fn bearer_token(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    let token = trimmed.strip_prefix("Bearer ").unwrap_or(trimmed).trim();
    anyhow::ensure!(!token.is_empty(), "no bearer token supplied");
    Ok(token.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_token_argument_is_optional() {
        let cli = Cli::try_parse_from(["access-gate", "verify"]).unwrap();
        assert!(matches!(cli.cmd, Command::Verify { token: None }));

        let cli = Cli::try_parse_from(["access-gate", "verify", "abc.def.ghi"]).unwrap();
        assert!(matches!(cli.cmd, Command::Verify { token: Some(t) } if t == "abc.def.ghi"));
    }

    #[test]
    fn test_grant_takes_username_and_record_path() {
        let cli =
            Cli::try_parse_from(["access-gate", "grant", "alice", "--record", "alice.json"])
                .unwrap();

        match cli.cmd {
            Command::Grant { username, record } => {
                assert_eq!(username, "alice");
                assert_eq!(record.as_deref(), Some(Path::new("alice.json")));
            }
            Command::Verify { .. } => unreachable!("parsed as verify"),
        }
    }

    #[test]
    fn test_grant_requires_username() {
        assert!(Cli::try_parse_from(["access-gate", "grant"]).is_err());
        assert!(Cli::try_parse_from(["access-gate"]).is_err());
    }

    #[test]
    fn test_bearer_token_prefix_and_whitespace() {
        assert_eq!(bearer_token(" Bearer abc.def.ghi\n").unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token("abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(bearer_token("Bearer   ").is_err());
    }
}
