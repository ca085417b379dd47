//! Pod construction for Dummy resources.
//!
//! Builds the single Pod each Dummy owns and attaches the owner reference
//! that lets Kubernetes garbage collection delete the Pod with its Dummy.

use std::collections::BTreeMap;

use crds::Dummy;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use crate::error::ControllerError;

/// Image used for the owned Pod unless `DUMMY_POD_IMAGE` overrides it
pub const DEFAULT_POD_IMAGE: &str = "nginx:latest";

/// Container name inside the owned Pod
pub const CONTAINER_NAME: &str = "nginx";

/// Label key linking a Pod back to the Dummy it belongs to
pub const DUMMY_LABEL: &str = "dummy";

/// Build the Pod a Dummy should own.
///
/// The Pod reuses the Dummy's name and namespace and runs a single container
/// with the given image. Fields the cluster fills in later (node assignment,
/// IPs, phase) stay unset.
pub fn build_pod(name: &str, namespace: &str, image: &str) -> Pod {
    let labels = BTreeMap::from([(DUMMY_LABEL.to_string(), name.to_string())]);

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: CONTAINER_NAME.to_string(),
                image: Some(image.to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Mark `dummy` as the controlling owner of `pod`.
///
/// Fails when the Dummy has no name or UID yet, since an owner reference
/// without them is rejected by the API server.
pub fn bind_owner(dummy: &Dummy, pod: &mut Pod) -> Result<(), ControllerError> {
    let name = dummy
        .metadata
        .name
        .clone()
        .ok_or_else(|| ControllerError::MissingMetadata("Dummy missing name".to_string()))?;
    let uid = dummy.uid().ok_or_else(|| {
        ControllerError::MissingMetadata(format!("Dummy {} missing UID", name))
    })?;

    pod.metadata.owner_references = Some(vec![OwnerReference {
        api_version: Dummy::api_version(&()).to_string(),
        kind: Dummy::kind(&()).to_string(),
        name,
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
        ..Default::default()
    }]);

    Ok(())
}
