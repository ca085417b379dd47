//! Cluster access for the reconciler.
//!
//! The reconciler talks to Kubernetes through the [`ClusterStore`] trait so
//! unit tests can substitute an in-memory fake for the live API.

use async_trait::async_trait;
use crds::Dummy;
use k8s_openapi::api::core::v1::Pod;
use kube::api::PostParams;
use kube::{Api, Client};

use crate::error::ControllerError;

/// The cluster operations a reconcile pass performs.
///
/// Deliberately narrow: read a Dummy, write its status, read a Pod, create a
/// Pod. Pod deletion is left to garbage collection via owner references.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch a Dummy, `None` when it no longer exists
    async fn get_dummy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Dummy>, ControllerError>;

    /// Replace the status subresource of a Dummy and return the stored object.
    ///
    /// The write carries the `resourceVersion` of `dummy`, so a concurrent
    /// writer surfaces as a conflict error instead of being overwritten.
    async fn update_dummy_status(
        &self,
        namespace: &str,
        dummy: &Dummy,
    ) -> Result<Dummy, ControllerError>;

    /// Fetch a Pod, `None` when absent
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ControllerError>;

    /// Create a Pod
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, ControllerError>;
}

/// [`ClusterStore`] backed by the live Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dummies(&self, namespace: &str) -> Api<Dummy> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_dummy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Dummy>, ControllerError> {
        Ok(self.dummies(namespace).get_opt(name).await?)
    }

    async fn update_dummy_status(
        &self,
        namespace: &str,
        dummy: &Dummy,
    ) -> Result<Dummy, ControllerError> {
        let name = dummy
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::MissingMetadata("Dummy missing name".to_string()))?;
        let data = serde_json::to_vec(dummy)?;
        Ok(self
            .dummies(namespace)
            .replace_status(name, &PostParams::default(), data)
            .await?)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ControllerError> {
        Ok(self.pods(namespace).get_opt(name).await?)
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, ControllerError> {
        Ok(self.pods(namespace).create(&PostParams::default(), pod).await?)
    }
}
