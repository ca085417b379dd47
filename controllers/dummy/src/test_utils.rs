//! Test utilities for unit testing the reconciler.
//!
//! Provides fixture constructors and an in-memory [`ClusterStore`] that
//! mimics the API server closely enough for reconcile passes: objects get a
//! fresh `resourceVersion` on every write, and a status update carrying a
//! stale `resourceVersion` fails with a 409.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use crds::{Dummy, DummySpec};
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::error::ControllerError;
use crate::store::ClusterStore;

/// Helper to create a test Dummy with metadata the API server would fill in
pub fn create_test_dummy(name: &str, namespace: &str, message: &str) -> Dummy {
    Dummy {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{}", name)),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: DummySpec {
            message: message.to_string(),
        },
        status: None,
    }
}

/// Helper to create a test Pod reporting the given phase
pub fn create_test_pod(name: &str, namespace: &str, phase: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build a Kubernetes API error the way the server would report it.
fn api_error(kind: &str, name: &str, reason: &str, code: u16) -> ControllerError {
    ControllerError::Kube(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} \"{}\": {}", kind, name, reason),
        reason: reason.to_string(),
        code,
    }))
}

fn object_key(metadata: &ObjectMeta) -> (String, String) {
    (
        metadata.namespace.clone().unwrap_or_default(),
        metadata.name.clone().unwrap_or_default(),
    )
}

/// In-memory [`ClusterStore`] with mutation counters and conflict injection.
pub struct FakeStore {
    dummies: Mutex<HashMap<(String, String), Dummy>>,
    pods: Mutex<HashMap<(String, String), Pod>>,
    version_counter: Mutex<u64>,
    created_pods: Mutex<usize>,
    updated_statuses: Mutex<usize>,
    conflict_armed: Mutex<bool>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            dummies: Mutex::new(HashMap::new()),
            pods: Mutex::new(HashMap::new()),
            version_counter: Mutex::new(1),
            created_pods: Mutex::new(0),
            updated_statuses: Mutex::new(0),
            conflict_armed: Mutex::new(false),
        }
    }

    /// Seed a Dummy, assigning it a fresh resourceVersion
    pub fn add_dummy(&self, mut dummy: Dummy) {
        dummy.metadata.resource_version = Some(self.next_version());
        let key = object_key(&dummy.metadata);
        self.dummies.lock().unwrap().insert(key, dummy);
    }

    /// Seed a Pod, assigning it a fresh resourceVersion
    pub fn add_pod(&self, mut pod: Pod) {
        pod.metadata.resource_version = Some(self.next_version());
        let key = object_key(&pod.metadata);
        self.pods.lock().unwrap().insert(key, pod);
    }

    /// Overwrite the phase of a stored Pod
    pub fn set_pod_phase(&self, namespace: &str, name: &str, phase: &str) {
        let mut pods = self.pods.lock().unwrap();
        let pod = pods
            .get_mut(&(namespace.to_string(), name.to_string()))
            .expect("no such Pod in FakeStore");
        pod.status = Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        });
    }

    /// Remove a Dummy, as if it was deleted out from under the controller
    pub fn remove_dummy(&self, namespace: &str, name: &str) {
        self.dummies
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn get_stored_dummy(&self, namespace: &str, name: &str) -> Option<Dummy> {
        self.dummies
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn get_stored_pod(&self, namespace: &str, name: &str) -> Option<Pod> {
        self.pods
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of Pods created through the store
    pub fn pods_created(&self) -> usize {
        *self.created_pods.lock().unwrap()
    }

    /// Number of status updates the store accepted
    pub fn status_updates(&self) -> usize {
        *self.updated_statuses.lock().unwrap()
    }

    /// Make the next status update fail with a version conflict.
    ///
    /// The stored object's resourceVersion is bumped as if another writer got
    /// there first, so a later pass working from fresh state succeeds.
    pub fn fail_next_status_update(&self) {
        *self.conflict_armed.lock().unwrap() = true;
    }

    fn next_version(&self) -> String {
        let mut counter = self.version_counter.lock().unwrap();
        *counter += 1;
        counter.to_string()
    }
}

#[async_trait]
impl ClusterStore for FakeStore {
    async fn get_dummy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Dummy>, ControllerError> {
        Ok(self
            .dummies
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn update_dummy_status(
        &self,
        namespace: &str,
        dummy: &Dummy,
    ) -> Result<Dummy, ControllerError> {
        let name = dummy.metadata.name.clone().unwrap_or_default();
        let key = (namespace.to_string(), name.clone());
        let mut dummies = self.dummies.lock().unwrap();
        let Some(stored) = dummies.get_mut(&key) else {
            return Err(api_error("dummies", &name, "NotFound", 404));
        };

        if std::mem::take(&mut *self.conflict_armed.lock().unwrap()) {
            stored.metadata.resource_version = Some(self.next_version());
            return Err(api_error("dummies", &name, "Conflict", 409));
        }

        if stored.metadata.resource_version != dummy.metadata.resource_version {
            return Err(api_error("dummies", &name, "Conflict", 409));
        }

        stored.status = dummy.status.clone();
        stored.metadata.resource_version = Some(self.next_version());
        *self.updated_statuses.lock().unwrap() += 1;
        Ok(stored.clone())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ControllerError> {
        Ok(self
            .pods
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, ControllerError> {
        let name = pod.metadata.name.clone().unwrap_or_default();
        let key = (namespace.to_string(), name.clone());
        let mut pods = self.pods.lock().unwrap();
        if pods.contains_key(&key) {
            return Err(api_error("pods", &name, "AlreadyExists", 409));
        }

        let mut stored = pod.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        stored.metadata.uid = Some(format!("pod-uid-{}", name));
        stored.metadata.resource_version = Some(self.next_version());
        pods.insert(key, stored.clone());
        *self.created_pods.lock().unwrap() += 1;
        Ok(stored)
    }
}
