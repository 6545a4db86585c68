use super::{ReconcileOutcome, ResourceId};
use crate::store::ObjectStore;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, trace, Instrument};

/// Which namespaces get which label.
///
/// A name matches when it starts with `prefix` or ends with `suffix`; an
/// empty prefix or suffix never matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelPolicy {
    pub prefix: String,
    pub suffix: String,
    pub key: String,
    pub value: String,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            prefix: "dev-".to_string(),
            suffix: "-dev".to_string(),
            key: "env".to_string(),
            value: "dev".to_string(),
        }
    }
}

impl LabelPolicy {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn matches(&self, name: &str) -> bool {
        (!self.prefix.is_empty() && name.starts_with(&self.prefix))
            || (!self.suffix.is_empty() && name.ends_with(&self.suffix))
    }

    pub fn is_satisfied(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.key) == Some(&self.value)
    }
}

/// Forces the policy label onto matching namespaces.
pub struct LabelReconciler {
    store: Arc<dyn ObjectStore>,
    policy: LabelPolicy,
}

impl LabelReconciler {
    pub fn new(store: Arc<dyn ObjectStore>, policy: LabelPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn reconcile(&self, id: &ResourceId) -> ReconcileOutcome {
        if !self.policy.matches(&id.name) {
            trace!("Namespace {} is outside the label policy", id);
            return ReconcileOutcome::Done;
        }

        let span = info_span!("reconcile", kind = "Namespace", id = %id);
        self.converge(id).instrument(span).await
    }

    async fn converge(&self, id: &ResourceId) -> ReconcileOutcome {
        let mut namespace = match self.store.get_namespace(&id.name).await {
            Ok(Some(ns)) => ns,
            Ok(None) => {
                debug!("Namespace {} is gone", id);
                return ReconcileOutcome::Done;
            }
            Err(e) => {
                error!("Couldn't fetch namespace {}: {}", id, e);
                return ReconcileOutcome::Error(e);
            }
        };

        // Re-delivery of an already labelled namespace must not write.
        if self.policy.is_satisfied(namespace.labels()) {
            return ReconcileOutcome::Done;
        }

        namespace
            .labels_mut()
            .insert(self.policy.key.clone(), self.policy.value.clone());

        match self.store.replace_namespace(namespace).await {
            Ok(_) => {
                info!(
                    "Labelled namespace {} with {}={}",
                    id, self.policy.key, self.policy.value
                );
                ReconcileOutcome::Done
            }
            Err(e) => {
                error!("Couldn't update namespace {}: {}", id, e);
                ReconcileOutcome::Error(e)
            }
        }
    }
}
