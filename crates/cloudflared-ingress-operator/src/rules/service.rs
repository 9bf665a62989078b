//! Rules from annotated Services

use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use serde_yaml::Value;
use tracing::{error, info, warn};

use cloudflared_ingress_common::yaml::parse_value;

use super::{cluster_service_url, RoutingRule};
use crate::annotations::{TunnelAnnotations, ANNOTATION_HOSTNAME, ANNOTATION_ORIGIN_REQUEST};

/// Derive the rule of one Service, if it opted in and is routable.
///
/// A Service with `cloudflared.io/*` annotations but no hostname, or with
/// neither a service override nor any port, is skipped with a warning. An
/// unparsable origin-request annotation only drops that field.
pub fn rule_from_service(svc: &Service) -> Option<RoutingRule> {
    let annotations = TunnelAnnotations::from_metadata(&svc.metadata)?;
    let namespace = svc.namespace().unwrap_or_default();
    let name = svc.name_any();

    let Some(hostname) = annotations.hostname() else {
        warn!(
            namespace = %namespace,
            name = %name,
            "Service has cloudflared.io/* annotations but is missing {}",
            ANNOTATION_HOSTNAME
        );
        return None;
    };

    let service_url = match annotations.service() {
        Some(url) => url.to_string(),
        None => match first_port(svc) {
            Some(port) => cluster_service_url(&name, &namespace, port),
            None => {
                warn!(namespace = %namespace, name = %name, "Service has no ports");
                return None;
            }
        },
    };

    let mut rule = RoutingRule::new(hostname, service_url);

    if let Some(path) = annotations.path() {
        rule = rule.with_path(path);
    }

    if let Some(raw) = annotations.origin_request() {
        match parse_value(raw) {
            Ok(Value::Null) => {}
            Ok(origin_request) => rule = rule.with_origin_request(origin_request),
            Err(e) => error!(
                namespace = %namespace,
                name = %name,
                error = %e,
                "invalid YAML in {}",
                ANNOTATION_ORIGIN_REQUEST
            ),
        }
    }

    info!(
        namespace = %namespace,
        name = %name,
        "added ingress rule from Service: {} -> {}",
        rule.hostname,
        rule.service
    );
    Some(rule)
}

fn first_port(svc: &Service) -> Option<i32> {
    svc.spec
        .as_ref()?
        .ports
        .as_ref()?
        .first()
        .map(|port| port.port)
}
