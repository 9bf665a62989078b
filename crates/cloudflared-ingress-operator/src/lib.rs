//! cloudflared ingress operator: derives cloudflared tunnel ingress rules from
//! annotated Services and Ingresses and keeps the cloudflared ConfigMap in sync

#![deny(missing_docs)]

/// Typed access to `cloudflared.io/*` annotations
pub mod annotations;
/// Command-line and environment configuration
pub mod config;
/// Read-modify-write of the cloudflared config document
pub mod document;
/// One full reconciliation pass
pub mod reconciler;
/// Rule derivation and ordering
pub mod rules;
/// Fixed-interval pass loop
pub mod scheduler;
/// Listing of candidate Services and Ingresses
pub mod source;

pub use cloudflared_ingress_common::{Error, Result};
