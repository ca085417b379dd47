//! Dummy Controller
//!
//! Reconciles `Dummy` resources: echoes `spec.message` into `status.specEcho`,
//! ensures each Dummy owns a single Pod, and mirrors that Pod's phase into
//! `status.podStatus`.
//!
//! Pods are created once and never modified; their deletion is handled by
//! Kubernetes garbage collection through owner references.

mod backoff;
mod controller;
mod error;
mod pod;
mod reconciler;
mod store;

#[cfg(test)]
mod test_utils;

use crate::error::ControllerError;
use controller::Controller;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting Dummy Controller");

    // Load configuration from environment variables
    let namespace = env::var("WATCH_NAMESPACE").ok();
    let pod_image =
        env::var("DUMMY_POD_IMAGE").unwrap_or_else(|_| pod::DEFAULT_POD_IMAGE.to_string());

    info!("Configuration:");
    info!("  Pod image: {}", pod_image);
    info!(
        "  Namespace: {}",
        namespace.as_deref().unwrap_or("all namespaces")
    );

    // Initialize and run controller
    let controller = Controller::new(namespace, pod_image).await?;
    controller.run().await?;

    Ok(())
}
