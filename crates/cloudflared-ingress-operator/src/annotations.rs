//! Typed view over the `cloudflared.io/*` annotations
//!
//! Only the four recognized keys are surfaced. Any other key under the prefix
//! still opts the resource in, but is otherwise ignored.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Prefix shared by every annotation this operator reads
pub const ANNOTATION_PREFIX: &str = "cloudflared.io/";

/// Hostname to route (required)
pub const ANNOTATION_HOSTNAME: &str = "cloudflared.io/hostname";

/// Overrides the synthesized `http://<svc>.<ns>.svc.cluster.local:<port>` target
pub const ANNOTATION_SERVICE: &str = "cloudflared.io/service";

/// Path-based routing for Service-derived rules
pub const ANNOTATION_PATH: &str = "cloudflared.io/path";

/// Per-rule origin request settings, as a YAML string
pub const ANNOTATION_ORIGIN_REQUEST: &str = "cloudflared.io/origin-request";

/// The recognized `cloudflared.io/*` annotations of one resource
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TunnelAnnotations {
    hostname: Option<String>,
    service: Option<String>,
    path: Option<String>,
    origin_request: Option<String>,
}

impl TunnelAnnotations {
    /// Read the recognized keys from an annotation map.
    ///
    /// Returns `None` when no key carries the `cloudflared.io/` prefix, i.e.
    /// the resource has not opted in.
    pub fn from_annotations(annotations: &BTreeMap<String, String>) -> Option<Self> {
        if !annotations
            .keys()
            .any(|key| key.starts_with(ANNOTATION_PREFIX))
        {
            return None;
        }

        Some(Self {
            hostname: annotations.get(ANNOTATION_HOSTNAME).cloned(),
            service: annotations.get(ANNOTATION_SERVICE).cloned(),
            path: annotations.get(ANNOTATION_PATH).cloned(),
            origin_request: annotations.get(ANNOTATION_ORIGIN_REQUEST).cloned(),
        })
    }

    /// Read the recognized keys from object metadata
    pub fn from_metadata(metadata: &ObjectMeta) -> Option<Self> {
        metadata.annotations.as_ref().and_then(Self::from_annotations)
    }

    /// Hostname annotation, if set to a non-empty value
    pub fn hostname(&self) -> Option<&str> {
        non_empty(&self.hostname)
    }

    /// Hostname annotation exactly as written, including an empty value.
    ///
    /// Ingress rules prefer the annotation over `spec.rules[].host` whenever
    /// the key exists.
    pub fn hostname_override(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Service target override, if set to a non-empty value
    pub fn service(&self) -> Option<&str> {
        non_empty(&self.service)
    }

    /// Path annotation, if set to a non-empty value
    pub fn path(&self) -> Option<&str> {
        non_empty(&self.path)
    }

    /// Raw origin-request YAML, if set to a non-empty value
    pub fn origin_request(&self) -> Option<&str> {
        non_empty(&self.origin_request)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
