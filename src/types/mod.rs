pub mod metadata;
pub mod quantity;
pub mod service;
pub mod workload;

pub use metadata::*;
pub use service::*;
pub use workload::*;

use k8s_openapi::api::apps::v1 as apps;
use k8s_openapi::api::core::v1 as core;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::fmt;

/// A derived child that can be rendered into its Kubernetes object.
///
/// The owner reference is mandatory: a child is never submitted without the
/// link back to the parent that controls it.
pub trait ChildResource: Send + Sync {
    type K8sType: kube::Resource<DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>;

    fn name(&self) -> &str;
    fn into_k8s(self, namespace: &str, owner_ref: OwnerReference) -> Self::K8sType;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChildKind {
    Deployment,
    Service,
}

impl ChildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildKind::Deployment => "Deployment",
            ChildKind::Service => "Service",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChildSpec {
    Workload(WorkloadSpec),
    Service(ServiceSpec),
}

impl ChildSpec {
    pub fn name(&self) -> &str {
        match self {
            ChildSpec::Workload(w) => w.name(),
            ChildSpec::Service(s) => s.name(),
        }
    }

    pub fn kind(&self) -> ChildKind {
        match self {
            ChildSpec::Workload(_) => ChildKind::Deployment,
            ChildSpec::Service(_) => ChildKind::Service,
        }
    }

    pub fn as_workload(&self) -> Option<&WorkloadSpec> {
        match self {
            ChildSpec::Workload(w) => Some(w),
            ChildSpec::Service(_) => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceSpec> {
        match self {
            ChildSpec::Service(s) => Some(s),
            ChildSpec::Workload(_) => None,
        }
    }

    pub fn into_object(self, namespace: &str, owner_ref: OwnerReference) -> ChildObject {
        match self {
            ChildSpec::Workload(w) => ChildObject::Deployment(w.into_k8s(namespace, owner_ref)),
            ChildSpec::Service(s) => ChildObject::Service(s.into_k8s(namespace, owner_ref)),
        }
    }
}

/// A child as stored in (or submitted to) the cluster.
#[derive(Clone, Debug, PartialEq)]
pub enum ChildObject {
    Deployment(apps::Deployment),
    Service(core::Service),
}

impl ChildObject {
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildObject::Deployment(_) => ChildKind::Deployment,
            ChildObject::Service(_) => ChildKind::Service,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ChildObject::Deployment(d) => &d.metadata,
            ChildObject::Service(s) => &s.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ChildObject::Deployment(d) => &mut d.metadata,
            ChildObject::Service(s) => &mut s.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn owner_references(&self) -> &[OwnerReference] {
        self.metadata()
            .owner_references
            .as_deref()
            .unwrap_or_default()
    }
}
