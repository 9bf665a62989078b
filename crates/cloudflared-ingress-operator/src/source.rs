//! Candidate resource listing
//!
//! One [`ResourceSource`] implementation per watch scope. Both return plain
//! vectors so derivation never cares how the listing was done.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

#[cfg(test)]
use mockall::automock;

use crate::config::WatchScope;
use crate::Error;

/// Supplies the Services and Ingresses inspected by a reconciliation pass
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// List candidate Services
    async fn list_services(&self) -> Result<Vec<Service>, Error>;

    /// List candidate Ingresses
    async fn list_ingresses(&self) -> Result<Vec<Ingress>, Error>;
}

/// Build the source matching the configured scope
pub fn source_for_scope(client: Client, scope: &WatchScope) -> Arc<dyn ResourceSource> {
    match scope {
        WatchScope::AllNamespaces => Arc::new(ClusterSource::new(client)),
        WatchScope::Namespaces(namespaces) => {
            Arc::new(NamespacedSource::new(client, namespaces.clone()))
        }
    }
}

/// Lists across all namespaces with one call per kind.
///
/// A listing failure fails the whole pass.
pub struct ClusterSource {
    client: Client,
}

impl ClusterSource {
    /// Create a new ClusterSource wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceSource for ClusterSource {
    async fn list_services(&self) -> Result<Vec<Service>, Error> {
        let api: Api<Service> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn list_ingresses(&self) -> Result<Vec<Ingress>, Error> {
        let api: Api<Ingress> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }
}

/// Lists each configured namespace separately.
///
/// A namespace that cannot be listed is logged and contributes nothing; the
/// other namespaces are still returned.
pub struct NamespacedSource {
    client: Client,
    namespaces: Vec<String>,
}

impl NamespacedSource {
    /// Create a new NamespacedSource over the given namespaces
    pub fn new(client: Client, namespaces: Vec<String>) -> Self {
        Self { client, namespaces }
    }

    async fn list_each<K>(&self) -> Vec<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let kind = K::kind(&<K::DynamicType as Default>::default()).to_string();
        let mut items = Vec::new();

        for namespace in &self.namespaces {
            let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
            match api.list(&ListParams::default()).await {
                Ok(list) => {
                    debug!(
                        namespace = %namespace,
                        kind = %kind,
                        count = list.items.len(),
                        "listed"
                    );
                    items.extend(list.items);
                }
                Err(e) => {
                    error!(
                        namespace = %namespace,
                        kind = %kind,
                        error = %e,
                        "error listing resources"
                    );
                }
            }
        }
        items
    }
}

#[async_trait]
impl ResourceSource for NamespacedSource {
    async fn list_services(&self) -> Result<Vec<Service>, Error> {
        Ok(self.list_each::<Service>().await)
    }

    async fn list_ingresses(&self) -> Result<Vec<Ingress>, Error> {
        Ok(self.list_each::<Ingress>().await)
    }
}
