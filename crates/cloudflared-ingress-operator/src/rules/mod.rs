//! Routing rule derivation and aggregation
//!
//! Each annotated Service yields at most one rule, each annotated Ingress
//! yields one rule per service-backed path. All rules of a pass are merged
//! and stably sorted by hostname before they reach the config document.

mod ingress;
mod service;

pub use ingress::rules_from_ingress;
pub use service::rule_from_service;

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;

/// Service of the trailing catch-all entry
pub const CATCH_ALL_SERVICE: &str = "http_status:404";

/// Path that matches everything; never written to a rule
pub const DEFAULT_PATH: &str = "/";

/// One cloudflared ingress rule
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    /// Public hostname routed through the tunnel
    pub hostname: String,
    /// Origin URL requests are forwarded to
    pub service: String,
    /// Path regex restricting the rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Opaque per-rule origin settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_request: Option<serde_yaml::Value>,
}

impl RoutingRule {
    /// Create a rule without path or origin settings
    pub fn new(hostname: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            service: service.into(),
            path: None,
            origin_request: None,
        }
    }

    /// Restrict the rule to a path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach origin request settings
    pub fn with_origin_request(mut self, origin_request: serde_yaml::Value) -> Self {
        self.origin_request = Some(origin_request);
        self
    }
}

/// An entry of the `ingress` list as written to the config document
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IngressEntry<'a> {
    /// A derived rule
    Rule(&'a RoutingRule),
    /// The terminal entry answering everything else
    CatchAll {
        /// Always [`CATCH_ALL_SERVICE`]
        service: &'static str,
    },
}

/// The full `ingress` list: the rules in order, then the catch-all
pub fn ingress_entries(rules: &[RoutingRule]) -> Vec<IngressEntry<'_>> {
    rules
        .iter()
        .map(IngressEntry::Rule)
        .chain(std::iter::once(IngressEntry::CatchAll {
            service: CATCH_ALL_SERVICE,
        }))
        .collect()
}

/// In-cluster URL of a Service port
pub fn cluster_service_url(name: &str, namespace: &str, port: impl std::fmt::Display) -> String {
    format!("http://{name}.{namespace}.svc.cluster.local:{port}")
}

// =============================================================================
// Aggregation
// =============================================================================

/// Derive the rules of every candidate and order them by hostname.
///
/// Services come before Ingresses in the working set, so equal hostnames keep
/// that relative order. Nothing is deduplicated.
pub fn collect_rules(services: &[Service], ingresses: &[Ingress]) -> Vec<RoutingRule> {
    let mut rules: Vec<RoutingRule> = services.iter().filter_map(rule_from_service).collect();
    rules.extend(ingresses.iter().flat_map(rules_from_ingress));
    sort_rules(&mut rules);
    rules
}

/// Stable sort by raw hostname
pub fn sort_rules(rules: &mut [RoutingRule]) {
    rules.sort_by(|a, b| a.hostname.cmp(&b.hostname));
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::annotations::ANNOTATION_HOSTNAME;

    #[test]
    fn test_cluster_service_url_format() {
        assert_eq!(
            cluster_service_url("api", "prod", 8080),
            "http://api.prod.svc.cluster.local:8080"
        );
        assert_eq!(
            cluster_service_url("web", "default", "http"),
            "http://web.default.svc.cluster.local:http"
        );
    }

    #[test]
    fn test_rule_serializes_in_document_order_without_absent_fields() {
        let rule = RoutingRule::new("a.example.com", "http://a:80");
        let yaml = serde_yaml::to_string(&rule).unwrap();
        assert_eq!(yaml, "hostname: a.example.com\nservice: http://a:80\n");

        let origin = serde_yaml::from_str("connectTimeout: 30s").unwrap();
        let rule = rule.with_path("/api").with_origin_request(origin);
        let yaml = serde_yaml::to_string(&rule).unwrap();
        assert_eq!(
            yaml,
            "hostname: a.example.com\nservice: http://a:80\npath: /api\noriginRequest:\n  connectTimeout: 30s\n"
        );
    }

    #[test]
    fn test_ingress_entries_append_catch_all_last() {
        let rules = vec![
            RoutingRule::new("a.example.com", "http://a:80"),
            RoutingRule::new("b.example.com", "http://b:80"),
        ];
        let entries = ingress_entries(&rules);
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries.last(),
            Some(&IngressEntry::CatchAll {
                service: CATCH_ALL_SERVICE
            })
        );

        let yaml = serde_yaml::to_string(&entries).unwrap();
        assert!(yaml.ends_with("- service: http_status:404\n"));
    }

    #[test]
    fn test_ingress_entries_for_no_rules_is_only_catch_all() {
        let entries = ingress_entries(&[]);
        assert_eq!(
            entries,
            vec![IngressEntry::CatchAll {
                service: CATCH_ALL_SERVICE
            }]
        );
    }

    /// Story: the written list is ordered by hostname regardless of source
    #[test]
    fn story_rules_are_sorted_by_hostname_across_kinds() {
        let services = vec![
            service("prod", "zeta", &[80], &[(ANNOTATION_HOSTNAME, "z.example.com")]),
            service("prod", "beta", &[80], &[(ANNOTATION_HOSTNAME, "b.example.com")]),
        ];
        let ingresses = vec![ingress(
            "prod",
            "web",
            vec![rule(
                Some("a.example.com"),
                vec![path(None, "web", port_number(80))],
            )],
            &[("cloudflared.io/enabled", "true")],
        )];

        let rules = collect_rules(&services, &ingresses);
        let hosts: Vec<_> = rules.iter().map(|r| r.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["a.example.com", "b.example.com", "z.example.com"]);
    }

    /// Story: two resources claiming the same hostname both stay, in input order
    #[test]
    fn story_duplicate_hostnames_are_kept_in_stable_order() {
        let services = vec![
            service("prod", "first", &[80], &[(ANNOTATION_HOSTNAME, "dup.example.com")]),
            service("prod", "second", &[81], &[(ANNOTATION_HOSTNAME, "dup.example.com")]),
        ];
        let ingresses = vec![ingress(
            "prod",
            "third",
            vec![rule(
                Some("dup.example.com"),
                vec![path(None, "third", port_number(82))],
            )],
            &[("cloudflared.io/enabled", "true")],
        )];

        let rules = collect_rules(&services, &ingresses);
        let services: Vec<_> = rules.iter().map(|r| r.service.as_str()).collect();
        assert_eq!(
            services,
            vec![
                "http://first.prod.svc.cluster.local:80",
                "http://second.prod.svc.cluster.local:81",
                "http://third.prod.svc.cluster.local:82",
            ]
        );
    }

    #[test]
    fn test_sort_is_bytewise_on_raw_hostname() {
        let mut rules = vec![
            RoutingRule::new("b.example.com", "x"),
            RoutingRule::new("B.example.com", "x"),
            RoutingRule::new("a.example.com", "x"),
        ];
        sort_rules(&mut rules);
        let hosts: Vec<_> = rules.iter().map(|r| r.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["B.example.com", "a.example.com", "b.example.com"]);
    }

    #[test]
    fn test_collect_rules_from_nothing() {
        assert!(collect_rules(&[], &[]).is_empty());
    }
}
