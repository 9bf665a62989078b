//! Common types for the cloudflared ingress operator: errors, telemetry and
//! YAML document helpers

#![deny(missing_docs)]

pub mod error;
pub mod telemetry;
pub mod yaml;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Name reported to tracing backends and used as the field manager
pub const OPERATOR_NAME: &str = "cloudflared-ingress-operator";
