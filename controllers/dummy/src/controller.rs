//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the watch streams
//! for Dummy objects and their owned Pods into the reconciler.

use crate::error::ControllerError;
use crate::reconciler::{error_policy, reconcile, Reconciler};
use crate::store::KubeStore;
use crds::Dummy;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use kube_runtime::controller::Controller as RuntimeController;
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dummy controller runtime.
///
/// Changes to Dummy objects and to the Pods they own both queue the owning
/// Dummy for a reconcile pass.
pub struct Controller {
    client: Client,
    namespace: Option<String>,
    pod_image: String,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(
        namespace: Option<String>,
        pod_image: String,
    ) -> Result<Self, ControllerError> {
        info!("Initializing Dummy Controller");

        let client = Client::try_default().await?;

        Ok(Self {
            client,
            namespace,
            pod_image,
        })
    }

    /// Runs the controller until shutdown.
    ///
    /// The runtime deduplicates queued keys, so each Dummy has at most one
    /// pass in flight at a time.
    pub async fn run(self) -> Result<(), ControllerError> {
        let dummies: Api<Dummy> = match self.namespace.as_deref() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let pods: Api<Pod> = match self.namespace.as_deref() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };

        let store = Arc::new(KubeStore::new(self.client.clone()));
        let reconciler = Arc::new(Reconciler::new(store, self.pod_image));

        info!("Dummy Controller running");

        RuntimeController::new(dummies, WatcherConfig::default())
            .owns(pods, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile, error_policy, reconciler)
            .for_each(|result| async move {
                match result {
                    Ok((object, _action)) => {
                        debug!(
                            "Reconciled Dummy {}/{}",
                            object.namespace.as_deref().unwrap_or_default(),
                            object.name
                        );
                    }
                    Err(e) => {
                        warn!("Reconciliation error: {}", e);
                    }
                }
            })
            .await;

        info!("Dummy Controller stopped");
        Ok(())
    }
}
