use super::{drift, ReconcileOutcome, ResourceId};
use crate::crd::AppWithDb;
use crate::derive::derive;
use crate::error::{Error, Result};
use crate::ownership::{controller_owner, ensure_controller};
use crate::store::ObjectStore;
use crate::types::{ChildObject, ChildSpec};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// What the reconciler does with a child that already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConvergenceMode {
    /// Existing children are left untouched; only missing ones are created.
    #[default]
    CreateOnly,
    /// Existing children whose managed fields differ from the derived spec
    /// are replaced.
    UpdateOnDrift,
}

impl FromStr for ConvergenceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create-only" => Ok(ConvergenceMode::CreateOnly),
            "update-on-drift" => Ok(ConvergenceMode::UpdateOnDrift),
            other => Err(Error::InvalidConfig(format!(
                "unknown convergence mode {other:?}, expected create-only or update-on-drift"
            ))),
        }
    }
}

/// Converges an `AppWithDb` to its three derived children.
///
/// Each invocation creates at most one missing child, in derivation order,
/// and then asks to be run again. Existence is always checked first, so an
/// interrupted or repeated invocation never duplicates work.
pub struct AppReconciler {
    store: Arc<dyn ObjectStore>,
    mode: ConvergenceMode,
}

enum Created {
    Yes,
    AlreadyPresent,
}

impl AppReconciler {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            mode: ConvergenceMode::default(),
        }
    }

    pub fn mode(mut self, mode: ConvergenceMode) -> Self {
        self.mode = mode;
        self
    }

    pub async fn reconcile(&self, id: &ResourceId) -> ReconcileOutcome {
        let span = info_span!("reconcile", kind = "AppWithDb", id = %id);
        self.converge(id).instrument(span).await
    }

    async fn converge(&self, id: &ResourceId) -> ReconcileOutcome {
        let Some(namespace) = id.namespace.as_deref() else {
            return ReconcileOutcome::Error(Error::Invalid(format!(
                "AppWithDb {id} has no namespace"
            )));
        };

        let app = match self.store.get_app(namespace, &id.name).await {
            Ok(Some(app)) => app,
            Ok(None) => {
                debug!("AppWithDb {} is gone, nothing to converge", id);
                return ReconcileOutcome::Done;
            }
            Err(e) => {
                error!("Failed to fetch AppWithDb {}: {}", id, e);
                return ReconcileOutcome::Error(e);
            }
        };

        for child in derive(&app) {
            let kind = child.kind();
            let name = child.name().to_string();

            match self.store.get_child(namespace, kind, &name).await {
                Ok(Some(existing)) => {
                    if self.mode == ConvergenceMode::UpdateOnDrift {
                        if let Some(outcome) =
                            self.correct_drift(&app, namespace, child, existing).await
                        {
                            return outcome;
                        }
                    }
                }
                Ok(None) => match self.create(&app, namespace, child).await {
                    Ok(Created::Yes) => return ReconcileOutcome::RequeueImmediate,
                    Ok(Created::AlreadyPresent) => continue,
                    Err(e) => return ReconcileOutcome::Error(e),
                },
                Err(e) => {
                    error!("Failed to fetch {} {}/{}: {}", kind, namespace, name, e);
                    return ReconcileOutcome::Error(e);
                }
            }
        }

        debug!("AppWithDb {} has all children", id);
        ReconcileOutcome::Done
    }

    async fn create(&self, app: &AppWithDb, namespace: &str, child: ChildSpec) -> Result<Created> {
        let kind = child.kind();
        let name = child.name().to_string();
        let owner = controller_owner(app).inspect_err(|e| {
            error!("Cannot link {} {}/{} to its owner: {}", kind, namespace, name, e);
        })?;

        match self
            .store
            .create_child(namespace, child.into_object(namespace, owner))
            .await
        {
            Ok(_) => {
                info!("Created {} {}/{}", kind, namespace, name);
                Ok(Created::Yes)
            }
            Err(e) if e.is_already_exists() => {
                debug!("{} {}/{} was created concurrently", kind, namespace, name);
                Ok(Created::AlreadyPresent)
            }
            Err(e) => {
                error!("Failed to create {} {}/{}: {}", kind, namespace, name, e);
                Err(e)
            }
        }
    }

    /// `None` when the existing child already matches.
    async fn correct_drift(
        &self,
        app: &AppWithDb,
        namespace: &str,
        child: ChildSpec,
        existing: ChildObject,
    ) -> Option<ReconcileOutcome> {
        let kind = child.kind();
        let name = child.name().to_string();
        let owner = match controller_owner(app) {
            Ok(owner) => owner,
            Err(e) => return Some(ReconcileOutcome::Error(e)),
        };

        let desired = child.into_object(namespace, owner.clone());
        if !drift::has_drifted(&desired, &existing) {
            return None;
        }

        let mut replacement = drift::converge(desired, &existing);
        if let Err(e) = ensure_controller(replacement.metadata_mut(), owner) {
            warn!("Not correcting {} {}/{}: {}", kind, namespace, name, e);
            return Some(ReconcileOutcome::Error(e));
        }

        match self.store.replace_child(namespace, replacement).await {
            Ok(_) => {
                info!("Corrected drift on {} {}/{}", kind, namespace, name);
                Some(ReconcileOutcome::RequeueImmediate)
            }
            Err(e) if e.is_conflict() => {
                debug!("{} {}/{} changed underneath us, retrying", kind, namespace, name);
                Some(ReconcileOutcome::RequeueImmediate)
            }
            Err(e) => {
                error!("Failed to update {} {}/{}: {}", kind, namespace, name, e);
                Some(ReconcileOutcome::Error(e))
            }
        }
    }
}
