//! Convergence loops.
//!
//! Both reconcilers assume at most one concurrent invocation per
//! [`ResourceId`]. `kube::runtime::Controller` deduplicates work items by
//! key and guarantees this; callers driving the reconcilers by other means
//! must serialize per identity themselves.

pub mod app;
pub mod drift;
pub mod labels;

pub use app::AppReconciler;
pub use labels::{LabelPolicy, LabelReconciler};

use crate::error::{Error, Result};
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use std::fmt;
use std::time::Duration;

/// Result of one reconcile invocation, consumed by the dispatcher.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Converged; wait for the next watch event.
    Done,
    /// Progress was made; run again right away to continue.
    RequeueImmediate,
    /// Retry after the given delay.
    RequeueAfter(Duration),
    /// Hand the failure to the dispatcher's error policy.
    Error(Error),
}

impl ReconcileOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, ReconcileOutcome::Done)
    }

    pub fn is_requeue(&self) -> bool {
        matches!(
            self,
            ReconcileOutcome::RequeueImmediate | ReconcileOutcome::RequeueAfter(_)
        )
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            ReconcileOutcome::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_action(self) -> Result<Action> {
        match self {
            ReconcileOutcome::Done => Ok(Action::await_change()),
            ReconcileOutcome::RequeueImmediate => Ok(Action::requeue(Duration::ZERO)),
            ReconcileOutcome::RequeueAfter(delay) => Ok(Action::requeue(delay)),
            ReconcileOutcome::Error(e) => Err(e),
        }
    }
}

/// Identity of a work item. Cluster-scoped objects have no namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceId {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn of<K: Resource>(resource: &K) -> Self {
        Self {
            namespace: resource.namespace(),
            name: resource.name_any(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}
