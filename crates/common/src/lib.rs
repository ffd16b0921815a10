//! Common utilities shared across Access Gate crates.

#![warn(clippy::pedantic)]

/// Module for common configuration
pub mod config;

/// Module for JWT utilities (header inspection, size limits, iat validation)
pub mod jwt;

/// Module for tracing subscriber setup
pub mod observability;
