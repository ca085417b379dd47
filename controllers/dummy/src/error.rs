//! Controller-specific error types.
//!
//! This module defines error types specific to the Dummy Controller
//! that are not covered by upstream library errors.

use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Dummy Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Object is missing a metadata field the controller relies on
    #[error("Missing object metadata: {0}")]
    MissingMetadata(String),
}
