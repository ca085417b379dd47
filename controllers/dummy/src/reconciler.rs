//! Reconciliation logic for Dummy resources.
//!
//! Each pass is level triggered: it re-reads the Dummy, ensures the owned
//! Pod exists, folds the observed Pod phase and `spec.message` into a status
//! candidate, and persists the status only when a field actually changed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crds::{Dummy, DummyStatus};
use kube_runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, error, info};

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::pod::{bind_owner, build_pod};
use crate::store::ClusterStore;

/// Minimum error backoff in seconds
const BACKOFF_MIN_SECONDS: u64 = 5;
/// Maximum error backoff in seconds
const BACKOFF_MAX_SECONDS: u64 = 60;

/// Reconcile one Dummy.
///
/// Entry point driven by the controller runtime. Only the identity of the
/// watched object is used; the pass re-reads everything else from the
/// cluster. A clean pass resets the error backoff for this object.
pub async fn reconcile(
    dummy: Arc<Dummy>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ControllerError> {
    let name = dummy
        .metadata
        .name
        .clone()
        .ok_or_else(|| ControllerError::MissingMetadata("Dummy missing name".to_string()))?;
    let namespace = dummy.metadata.namespace.clone().ok_or_else(|| {
        ControllerError::MissingMetadata(format!("Dummy {} missing namespace", name))
    })?;

    let action = ctx.reconcile_dummy(&namespace, &name).await?;
    ctx.clear_backoff(&namespace, &name);
    Ok(action)
}

/// Decide how to retry after a failed pass.
///
/// Each consecutive failure advances a per-object Fibonacci backoff. The
/// backoff resets once a pass for the same object succeeds.
pub fn error_policy(dummy: Arc<Dummy>, error: &ControllerError, ctx: Arc<Reconciler>) -> Action {
    let namespace = dummy.namespace().unwrap_or_default();
    let name = dummy.name_any();

    let delay_seconds = ctx.advance_backoff(&namespace, &name);
    error!(
        "Reconciliation of Dummy {}/{} failed, retrying in {}s: {}",
        namespace, name, delay_seconds, error
    );
    Action::requeue(Duration::from_secs(delay_seconds))
}

/// Compare the persisted status against a candidate field by field.
///
/// A missing status always needs a write so the object gains one on its
/// first pass.
pub fn status_needs_update(current: Option<&DummyStatus>, desired: &DummyStatus) -> bool {
    match current {
        None => true,
        Some(status) => {
            status.spec_echo != desired.spec_echo || status.pod_status != desired.pod_status
        }
    }
}

/// Reconciles Dummy resources against the cluster.
pub struct Reconciler {
    store: Arc<dyn ClusterStore>,
    pod_image: String,
    /// Per-object error backoff state, keyed by `namespace/name`
    backoffs: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(store: Arc<dyn ClusterStore>, pod_image: String) -> Self {
        Self {
            store,
            pod_image,
            backoffs: Mutex::new(HashMap::new()),
        }
    }

    /// Run one full pass for the Dummy identified by `namespace`/`name`.
    ///
    /// This method:
    /// 1. Re-reads the Dummy; a missing object ends the pass cleanly
    /// 2. Ensures the owned Pod exists, creating it when absent
    /// 3. Folds `spec.message` and the observed Pod phase into a status candidate
    /// 4. Persists the status once, and only when a field changed
    ///
    /// Returns `Action::requeue(Duration::ZERO)` after creating the Pod so the
    /// next pass observes its phase promptly; otherwise waits for a change.
    pub async fn reconcile_dummy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Action, ControllerError> {
        let Some(dummy) = self.store.get_dummy(namespace, name).await? else {
            debug!("Dummy {}/{} is gone, nothing to reconcile", namespace, name);
            return Ok(Action::await_change());
        };

        info!(
            "Reconciling Dummy {}/{}, message: {}",
            namespace, name, dummy.spec.message
        );

        let mut candidate = dummy.status.clone().unwrap_or_default();
        candidate.spec_echo = dummy.spec.message.clone();

        let created_pod = self
            .reconcile_pod(&dummy, namespace, name, &mut candidate)
            .await?;

        if self.sync_status(namespace, name, &candidate).await?.is_none() {
            debug!("Dummy {}/{} deleted during reconciliation", namespace, name);
            return Ok(Action::await_change());
        }

        if created_pod {
            // Run again right away to pick up the new Pod's phase.
            return Ok(Action::requeue(Duration::ZERO));
        }
        Ok(Action::await_change())
    }

    /// Ensure the Pod owned by `dummy` exists and record its observed phase.
    ///
    /// Returns `true` when the Pod was created this pass. An existing Pod is
    /// never mutated, even if its spec no longer matches what would be built
    /// today; `candidate` keeps its previous phase until a Pod is observed.
    async fn reconcile_pod(
        &self,
        dummy: &Dummy,
        namespace: &str,
        name: &str,
        candidate: &mut DummyStatus,
    ) -> Result<bool, ControllerError> {
        if let Some(pod) = self.store.get_pod(namespace, name).await? {
            let phase = pod
                .status
                .as_ref()
                .and_then(|status| status.phase.clone())
                .unwrap_or_default();
            debug!("Pod {}/{} is in phase {:?}", namespace, name, phase);
            candidate.pod_status = phase;
            return Ok(false);
        }

        info!("Creating Pod {}/{} for Dummy", namespace, name);
        let mut pod = build_pod(name, namespace, &self.pod_image);
        bind_owner(dummy, &mut pod)?;
        self.store.create_pod(namespace, &pod).await?;
        Ok(true)
    }

    /// Persist `candidate` as the Dummy's status when it differs from what
    /// the cluster currently holds.
    ///
    /// Re-reads the object first so the write carries a fresh
    /// `resourceVersion`; a concurrent writer still surfaces as a conflict
    /// error and the next pass retries from fresh state. On success returns
    /// the freshly stored object, or `None` when the Dummy disappeared.
    pub async fn sync_status(
        &self,
        namespace: &str,
        name: &str,
        candidate: &DummyStatus,
    ) -> Result<Option<Dummy>, ControllerError> {
        let Some(mut dummy) = self.store.get_dummy(namespace, name).await? else {
            return Ok(None);
        };

        if !status_needs_update(dummy.status.as_ref(), candidate) {
            debug!("Status of Dummy {}/{} already up to date", namespace, name);
            return Ok(Some(dummy));
        }

        dummy.status = Some(candidate.clone());
        self.store.update_dummy_status(namespace, &dummy).await?;
        info!(
            "Updated status of Dummy {}/{}: specEcho={:?}, podStatus={:?}",
            namespace, name, candidate.spec_echo, candidate.pod_status
        );

        self.store.get_dummy(namespace, name).await
    }

    /// Advance the error backoff for one object, returning the delay in seconds.
    fn advance_backoff(&self, namespace: &str, name: &str) -> u64 {
        let key = format!("{}/{}", namespace, name);
        let mut backoffs = match self.backoffs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        backoffs
            .entry(key)
            .or_insert_with(|| FibonacciBackoff::new(BACKOFF_MIN_SECONDS, BACKOFF_MAX_SECONDS))
            .next_backoff_seconds()
    }

    /// Drop the backoff state for one object after a clean pass.
    fn clear_backoff(&self, namespace: &str, name: &str) {
        let key = format!("{}/{}", namespace, name);
        let mut backoffs = match self.backoffs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        backoffs.remove(&key);
    }
}
