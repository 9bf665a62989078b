//! One reconciliation pass: list, derive, aggregate, write

use std::sync::Arc;

use kube::Client;
use tracing::{info, instrument};

use crate::config::OperatorConfig;
use crate::document::{DocumentReconciler, DocumentUpdate};
use crate::rules::{collect_rules, RoutingRule};
use crate::source::{source_for_scope, ResourceSource};
use crate::Error;

/// Everything a pass needs, built once at startup
pub struct Reconciler {
    source: Arc<dyn ResourceSource>,
    document: DocumentReconciler,
}

impl Reconciler {
    /// Create a reconciler from its parts
    pub fn new(source: Arc<dyn ResourceSource>, document: DocumentReconciler) -> Self {
        Self { source, document }
    }

    /// Create a reconciler talking to the cluster
    pub fn from_client(client: Client, config: &OperatorConfig) -> Self {
        Self {
            source: source_for_scope(client.clone(), &config.scope()),
            document: DocumentReconciler::from_config(client, config),
        }
    }

    /// Derive the ordered rules from the current cluster state
    pub async fn derive_rules(&self) -> Result<Vec<RoutingRule>, Error> {
        let services = self.source.list_services().await?;
        let ingresses = self.source.list_ingresses().await?;
        Ok(collect_rules(&services, &ingresses))
    }

    /// Run one full pass.
    ///
    /// Document problems are handled inside the pass and show up in the
    /// outcome; an error here means the pass could not derive its rules.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<DocumentUpdate, Error> {
        info!("starting reconciliation...");
        let rules = self.derive_rules().await?;
        let outcome = self.document.apply(&rules).await;
        info!(outcome = ?outcome, "reconciliation complete");
        Ok(outcome)
    }
}
