//! Rules from annotated Ingresses
//!
//! The annotations only gate participation and override hostname and
//! target; hosts, paths and backends come from the Ingress spec.

use k8s_openapi::api::networking::v1::{HTTPIngressPath, Ingress, IngressServiceBackend};
use kube::ResourceExt;
use tracing::{debug, info, warn};

use super::{cluster_service_url, RoutingRule, DEFAULT_PATH};
use crate::annotations::TunnelAnnotations;

/// Derive one rule per service-backed path of an opted-in Ingress.
///
/// The `cloudflared.io/path` and `cloudflared.io/origin-request` annotations
/// are not applied here.
pub fn rules_from_ingress(ing: &Ingress) -> Vec<RoutingRule> {
    let Some(annotations) = TunnelAnnotations::from_metadata(&ing.metadata) else {
        return Vec::new();
    };
    let namespace = ing.namespace().unwrap_or_default();
    let name = ing.name_any();

    let Some(ingress_rules) = ing.spec.as_ref().and_then(|spec| spec.rules.as_ref()) else {
        return Vec::new();
    };

    let mut rules = Vec::new();
    for ingress_rule in ingress_rules {
        let hostname = match annotations.hostname_override() {
            Some(hostname) => hostname,
            None => ingress_rule.host.as_deref().unwrap_or_default(),
        };
        if hostname.is_empty() {
            continue;
        }

        let Some(http) = ingress_rule.http.as_ref() else {
            continue;
        };

        for path in &http.paths {
            let Some(backend) = path.backend.service.as_ref() else {
                debug!(
                    namespace = %namespace,
                    name = %name,
                    "skipping Ingress path without a service backend"
                );
                continue;
            };

            let service_url = match annotations.service() {
                Some(url) => url.to_string(),
                None => match backend_port(backend) {
                    Some(port) => cluster_service_url(&backend.name, &namespace, port),
                    None => {
                        warn!(
                            namespace = %namespace,
                            name = %name,
                            backend = %backend.name,
                            "Ingress backend has neither a port number nor a port name"
                        );
                        continue;
                    }
                },
            };

            let mut rule = RoutingRule::new(hostname, service_url);
            if let Some(path) = routed_path(path) {
                rule = rule.with_path(path);
            }

            info!(
                namespace = %namespace,
                name = %name,
                "added ingress rule from Ingress: {} -> {}",
                rule.hostname,
                rule.service
            );
            rules.push(rule);
        }
    }
    rules
}

/// Port number if set, else the port name
fn backend_port(backend: &IngressServiceBackend) -> Option<String> {
    let port = backend.port.as_ref()?;
    port.number
        .map(|number| number.to_string())
        .or_else(|| port.name.clone())
}

fn routed_path(path: &HTTPIngressPath) -> Option<&str> {
    path.path
        .as_deref()
        .filter(|p| !p.is_empty() && *p != DEFAULT_PATH)
}
