//! Dummy CRD
//!
//! Declares a desired message and owns a single Pod. The controller echoes
//! the message into the status and mirrors the Pod's phase back.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "interview.com",
    version = "v1alpha1",
    kind = "Dummy",
    namespaced,
    status = "DummyStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DummySpec {
    /// Desired message, echoed into `status.specEcho` on every reconcile
    pub message: String,
}

/// Observed state, written only by the controller.
///
/// Status equality is decided by the controller's explicit field comparison,
/// so this type intentionally does not derive `PartialEq`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct DummyStatus {
    /// Last value of `spec.message` the controller reconciled
    #[serde(default)]
    pub spec_echo: String,

    /// Phase of the owned Pod (`Pending`, `Running`, `Succeeded`, `Failed`,
    /// `Unknown`), or empty while the Pod has not been observed
    #[serde(default)]
    pub pod_status: String,
}
