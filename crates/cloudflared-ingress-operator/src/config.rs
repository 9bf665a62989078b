//! Operator configuration
//!
//! Built once at startup from command-line flags with environment variable
//! fallbacks, then passed by value to the components that need it.

use clap::{ArgAction, Parser};
use tracing::info;

use cloudflared_ingress_common::telemetry::LogFormat;

/// Default name of the cloudflared ConfigMap
pub const DEFAULT_CONFIGMAP_NAME: &str = "cloudflared";

/// Default namespace of the cloudflared ConfigMap
pub const DEFAULT_NAMESPACE: &str = "default";

/// ConfigMap data key holding the serialized cloudflared config
pub const DEFAULT_CONFIG_KEY: &str = "config.yaml";

/// cloudflared ingress operator - keeps the tunnel's ingress rules in sync
/// with annotated Services and Ingresses
#[derive(Parser, Debug, Clone)]
#[command(name = "cloudflared-ingress-operator", version, about, long_about = None)]
pub struct OperatorConfig {
    /// Name of the cloudflared ConfigMap
    #[arg(long, env = "CONFIGMAP_NAME", default_value = DEFAULT_CONFIGMAP_NAME)]
    pub configmap_name: String,

    /// Namespace of the cloudflared ConfigMap, and the watched namespace when
    /// no explicit list is given
    #[arg(long, env = "CLOUDFLARED_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Scan Services and Ingresses in every namespace
    #[arg(
        long,
        env = "WATCH_ALL_NAMESPACES",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = parse_flag
    )]
    pub watch_all_namespaces: bool,

    /// Comma-separated namespaces to scan when not watching all namespaces
    #[arg(long, env = "WATCH_NAMESPACES")]
    pub watch_namespaces: Option<String>,

    /// ConfigMap data key holding the cloudflared config document
    #[arg(long, env = "CONFIGMAP_KEY", default_value = DEFAULT_CONFIG_KEY)]
    pub config_key: String,

    /// Log output format (text or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Run a single reconciliation pass and exit
    #[arg(long)]
    pub once: bool,
}

/// Which namespaces are scanned for candidate resources
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchScope {
    /// List across all namespaces in one call per kind
    AllNamespaces,
    /// List each namespace separately
    Namespaces(Vec<String>),
}

impl OperatorConfig {
    /// Namespaces named in `WATCH_NAMESPACES`, trimmed, without empty entries
    pub fn namespace_list(&self) -> Vec<String> {
        self.watch_namespaces
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Resolve the scan scope. An empty namespace list falls back to the
    /// ConfigMap's own namespace.
    pub fn scope(&self) -> WatchScope {
        if self.watch_all_namespaces {
            return WatchScope::AllNamespaces;
        }

        let namespaces = self.namespace_list();
        if namespaces.is_empty() {
            WatchScope::Namespaces(vec![self.namespace.clone()])
        } else {
            WatchScope::Namespaces(namespaces)
        }
    }

    /// Log the effective configuration
    pub fn log_summary(&self) {
        info!("cloudflared ingress operator starting...");
        info!(
            namespace = %self.namespace,
            name = %self.configmap_name,
            key = %self.config_key,
            "target ConfigMap"
        );
        info!(watch_all_namespaces = self.watch_all_namespaces, "scan scope");
        if let WatchScope::Namespaces(namespaces) = self.scope() {
            info!(namespaces = ?namespaces, "watching namespaces");
        }
    }
}

/// `true` only when the value is `true`, ignoring case
fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}
