//! End-to-end reconciliation passes against in-memory cluster state

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_yaml::Value;

use cloudflared_ingress_operator::document::{
    ConfigDocumentStore, DocumentReconciler, DocumentUpdate,
};
use cloudflared_ingress_operator::reconciler::Reconciler;
use cloudflared_ingress_operator::source::ResourceSource;
use cloudflared_ingress_operator::Error;

const INITIAL_CONFIG: &str = "tunnel: homelab\ncredentials-file: /etc/cloudflared/creds/credentials.json\ningress:\n- service: http_status:404\nwarp-routing:\n  enabled: true\n";

struct StaticSource {
    services: Vec<Service>,
    ingresses: Vec<Ingress>,
}

#[async_trait]
impl ResourceSource for StaticSource {
    async fn list_services(&self) -> Result<Vec<Service>, Error> {
        Ok(self.services.clone())
    }

    async fn list_ingresses(&self) -> Result<Vec<Ingress>, Error> {
        Ok(self.ingresses.clone())
    }
}

/// Keeps one ConfigMap and counts writes
#[derive(Default)]
struct MemoryStore {
    config_map: Mutex<Option<ConfigMap>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    fn with_config(config: &str) -> Self {
        let config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some("cloudflared".to_string()),
                namespace: Some("cloudflare".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "config.yaml".to_string(),
                config.to_string(),
            )])),
            ..Default::default()
        };
        Self {
            config_map: Mutex::new(Some(config_map)),
            writes: Mutex::new(0),
        }
    }

    fn document(&self) -> String {
        self.config_map
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|cm| cm.data.as_ref())
            .and_then(|data| data.get("config.yaml").cloned())
            .unwrap()
    }

    fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl ConfigDocumentStore for MemoryStore {
    async fn read(&self) -> Result<ConfigMap, Error> {
        self.config_map
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::document("cloudflare", "cloudflared", "not found"))
    }

    async fn write(&self, config_map: &ConfigMap) -> Result<(), Error> {
        *self.config_map.lock().unwrap() = Some(config_map.clone());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

fn metadata(namespace: &str, name: &str, annotations: &[(&str, &str)]) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        annotations: Some(
            annotations
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ),
        ..Default::default()
    }
}

fn service(namespace: &str, name: &str, port: i32, annotations: &[(&str, &str)]) -> Service {
    Service {
        metadata: metadata(namespace, name, annotations),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

fn ingress(namespace: &str, name: &str, host: &str, backend: &str, port: i32) -> Ingress {
    Ingress {
        metadata: metadata(namespace, name, &[("cloudflared.io/tunnel", "homelab")]),
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: backend.to_string(),
                                port: Some(ServiceBackendPort {
                                    number: Some(port),
                                    name: None,
                                }),
                            }),
                            resource: None,
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

fn reconciler(source: StaticSource, store: Arc<MemoryStore>) -> Reconciler {
    let document = DocumentReconciler::new(store, "cloudflare", "cloudflared", "config.yaml");
    Reconciler::new(Arc::new(source), document)
}

fn ingress_list(document: &str) -> Vec<Value> {
    let parsed: Value = serde_yaml::from_str(document).unwrap();
    parsed["ingress"].as_sequence().unwrap().clone()
}

fn sample_source() -> StaticSource {
    StaticSource {
        services: vec![
            service(
                "media",
                "jellyfin",
                8096,
                &[("cloudflared.io/hostname", "b.example.com")],
            ),
            // Opted in but unroutable: skipped, pass continues
            service("media", "broken", 80, &[("cloudflared.io/path", "/x")]),
            service("media", "plain", 80, &[]),
        ],
        ingresses: vec![ingress("web", "blog", "a.example.com", "ghost", 2368)],
    }
}

#[tokio::test]
async fn service_and_ingress_are_written_sorted_with_catch_all_last() {
    let store = Arc::new(MemoryStore::with_config(INITIAL_CONFIG));
    let reconciler = reconciler(sample_source(), store.clone());

    let outcome = reconciler.reconcile().await.unwrap();
    assert_eq!(outcome, DocumentUpdate::Updated { rules: 2 });

    let expected: Vec<Value> = serde_yaml::from_str(
        r#"
- hostname: a.example.com
  service: http://ghost.web.svc.cluster.local:2368
- hostname: b.example.com
  service: http://jellyfin.media.svc.cluster.local:8096
- service: http_status:404
"#,
    )
    .unwrap();
    assert_eq!(ingress_list(&store.document()), expected);
}

#[tokio::test]
async fn unrelated_keys_survive_reconciliation() {
    let store = Arc::new(MemoryStore::with_config(INITIAL_CONFIG));
    reconciler(sample_source(), store.clone())
        .reconcile()
        .await
        .unwrap();

    let document: Value = serde_yaml::from_str(&store.document()).unwrap();
    assert_eq!(document["tunnel"], Value::from("homelab"));
    assert_eq!(
        document["credentials-file"],
        Value::from("/etc/cloudflared/creds/credentials.json")
    );
    assert_eq!(document["warp-routing"]["enabled"], Value::from(true));

    let keys: Vec<_> = document
        .as_mapping()
        .unwrap()
        .keys()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(keys, vec!["tunnel", "credentials-file", "ingress", "warp-routing"]);
}

#[tokio::test]
async fn repeated_passes_over_unchanged_state_are_identical() {
    let store = Arc::new(MemoryStore::with_config(INITIAL_CONFIG));
    let reconciler = reconciler(sample_source(), store.clone());

    reconciler.reconcile().await.unwrap();
    let first = store.document();
    reconciler.reconcile().await.unwrap();
    let second = store.document();

    assert_eq!(first, second);
    // Full replace: the document is rewritten every pass, even when unchanged
    assert_eq!(store.writes(), 2);
}

#[tokio::test]
async fn no_candidates_leaves_only_catch_all() {
    let store = Arc::new(MemoryStore::with_config(INITIAL_CONFIG));
    let source = StaticSource {
        services: vec![],
        ingresses: vec![],
    };
    reconciler(source, store.clone()).reconcile().await.unwrap();

    let expected: Vec<Value> = serde_yaml::from_str("- service: http_status:404").unwrap();
    assert_eq!(ingress_list(&store.document()), expected);
}

#[tokio::test]
async fn missing_configmap_abandons_pass() {
    let store = Arc::new(MemoryStore::default());
    let outcome = reconciler(sample_source(), store.clone())
        .reconcile()
        .await
        .unwrap();

    assert_eq!(outcome, DocumentUpdate::Abandoned);
    assert_eq!(store.writes(), 0);
}
