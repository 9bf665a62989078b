//! cloudflared config document reconciliation
//!
//! The document lives under one data key of a ConfigMap. Every pass reads it,
//! replaces the whole `ingress` list and writes the ConfigMap back. All other
//! keys of the document are carried over untouched and in their original
//! order.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::{error, info};

#[cfg(test)]
use mockall::automock;

use cloudflared_ingress_common::yaml::{parse_mapping, set_key, to_value, to_yaml_string, YamlError};
use cloudflared_ingress_common::OPERATOR_NAME;

use crate::config::OperatorConfig;
use crate::rules::{ingress_entries, RoutingRule};
use crate::Error;

/// Document key replaced on every pass
pub const INGRESS_KEY: &str = "ingress";

/// Storage of the ConfigMap holding the cloudflared config
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigDocumentStore: Send + Sync {
    /// Read the current ConfigMap
    async fn read(&self) -> Result<ConfigMap, Error>;

    /// Replace the ConfigMap. The `resourceVersion` read earlier is sent along.
    async fn write(&self, config_map: &ConfigMap) -> Result<(), Error>;
}

/// ConfigMap storage backed by the Kubernetes API
pub struct ConfigMapStore {
    api: Api<ConfigMap>,
    name: String,
}

impl ConfigMapStore {
    /// Create a store for the named ConfigMap
    pub fn new(client: Client, namespace: &str, name: impl Into<String>) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            name: name.into(),
        }
    }
}

#[async_trait]
impl ConfigDocumentStore for ConfigMapStore {
    async fn read(&self) -> Result<ConfigMap, Error> {
        Ok(self.api.get(&self.name).await?)
    }

    async fn write(&self, config_map: &ConfigMap) -> Result<(), Error> {
        let params = PostParams {
            field_manager: Some(OPERATOR_NAME.to_string()),
            ..Default::default()
        };
        self.api.replace(&self.name, &params, config_map).await?;
        Ok(())
    }
}

/// What a document update did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentUpdate {
    /// The ConfigMap was rewritten with this many derived rules
    Updated {
        /// Number of rules, not counting the catch-all
        rules: usize,
    },
    /// Nothing was written: the ConfigMap could not be read or its document
    /// could not be used
    Abandoned,
    /// The new document was built but the write was rejected
    WriteFailed,
}

/// Writes derived rules into the cloudflared ConfigMap
pub struct DocumentReconciler {
    store: Arc<dyn ConfigDocumentStore>,
    namespace: String,
    name: String,
    key: String,
}

impl DocumentReconciler {
    /// Create a reconciler over the given store
    pub fn new(
        store: Arc<dyn ConfigDocumentStore>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            name: name.into(),
            key: key.into(),
        }
    }

    /// Create a reconciler for the ConfigMap named in the configuration
    pub fn from_config(client: Client, config: &OperatorConfig) -> Self {
        let store = ConfigMapStore::new(client, &config.namespace, config.configmap_name.clone());
        Self::new(
            Arc::new(store),
            config.namespace.clone(),
            config.configmap_name.clone(),
            config.config_key.clone(),
        )
    }

    /// Replace the document's `ingress` list with `rules` plus the catch-all.
    ///
    /// Failures are logged here and reported through the returned outcome;
    /// none of them is partial.
    pub async fn apply(&self, rules: &[RoutingRule]) -> DocumentUpdate {
        let (namespace, name, key) = (&self.namespace, &self.name, &self.key);

        let mut config_map = match self.store.read().await {
            Ok(cm) => cm,
            Err(e) => {
                error!(
                    namespace = %namespace,
                    name = %name,
                    error = %e,
                    "failed to read ConfigMap"
                );
                return DocumentUpdate::Abandoned;
            }
        };

        let Some(raw) = config_map.data.as_ref().and_then(|data| data.get(key)) else {
            error!(namespace = %namespace, name = %name, "ConfigMap missing '{}' key", key);
            return DocumentUpdate::Abandoned;
        };

        let rendered = match render_config(raw, rules) {
            Ok(rendered) => rendered,
            Err(e) => {
                error!(namespace = %namespace, name = %name, error = %e, "failed to parse {}", key);
                return DocumentUpdate::Abandoned;
            }
        };

        config_map
            .data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.clone(), rendered);

        match self.store.write(&config_map).await {
            Ok(()) => {
                info!(
                    namespace = %namespace,
                    name = %name,
                    "successfully updated ConfigMap with {} ingress rules",
                    rules.len()
                );
                DocumentUpdate::Updated { rules: rules.len() }
            }
            Err(e) => {
                error!(
                    namespace = %namespace,
                    name = %name,
                    error = %e,
                    "failed to update ConfigMap"
                );
                DocumentUpdate::WriteFailed
            }
        }
    }
}

/// Rewrite a serialized cloudflared config with a new `ingress` list.
///
/// The top level must be a mapping. Other keys keep their values and order.
pub fn render_config(raw: &str, rules: &[RoutingRule]) -> Result<String, YamlError> {
    let mut document = parse_mapping(raw)?;
    set_key(&mut document, INGRESS_KEY, to_value(&ingress_entries(rules))?);
    to_yaml_string(&document)
}
