//! Drift detection for the opt-in `UpdateOnDrift` convergence mode.
//!
//! Only the fields the deriver sets are compared. Everything the API server
//! defaults (termination paths, target ports, cluster IPs) is ignored, and
//! resource quantities are compared by value because the server rewrites
//! them into canonical form.

use crate::types::quantity::same_quantity;
use crate::types::ChildObject;
use k8s_openapi::api::apps::v1 as apps;
use k8s_openapi::api::core::v1 as core;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

const DEFAULT_PROTOCOL: &str = "TCP";

/// True when `existing` no longer matches what `desired` asks for.
/// Objects of different kinds are always considered drifted.
pub fn has_drifted(desired: &ChildObject, existing: &ChildObject) -> bool {
    match (desired, existing) {
        (ChildObject::Deployment(d), ChildObject::Deployment(e)) => deployment_drifted(d, e),
        (ChildObject::Service(d), ChildObject::Service(e)) => service_drifted(d, e),
        _ => true,
    }
}

/// Builds the replacement for `existing`: its metadata and server-owned
/// fields are kept, the managed fields are taken from `desired`. An existing
/// object without a spec takes the desired spec whole.
pub fn converge(desired: ChildObject, existing: &ChildObject) -> ChildObject {
    match (desired, existing) {
        (ChildObject::Deployment(d), ChildObject::Deployment(e)) => {
            let mut merged = e.clone();
            if merged.spec.is_none() {
                merged.spec = d.spec;
                return ChildObject::Deployment(merged);
            }
            let desired_template = d.spec.map(|s| s.template);
            if let (Some(spec), Some(template)) = (merged.spec.as_mut(), desired_template) {
                let labels = template.metadata.and_then(|m| m.labels);
                spec.template
                    .metadata
                    .get_or_insert_with(Default::default)
                    .labels = labels;
                let containers = template.spec.map(|s| s.containers).unwrap_or_default();
                spec.template
                    .spec
                    .get_or_insert_with(Default::default)
                    .containers = containers;
            }
            ChildObject::Deployment(merged)
        }
        (ChildObject::Service(d), ChildObject::Service(e)) => {
            let mut merged = e.clone();
            if let Some(desired_spec) = d.spec {
                let spec = merged.spec.get_or_insert_with(Default::default);
                spec.selector = desired_spec.selector;
                spec.ports = desired_spec.ports;
            }
            ChildObject::Service(merged)
        }
        (desired, _) => desired,
    }
}

fn deployment_drifted(desired: &apps::Deployment, existing: &apps::Deployment) -> bool {
    let (Some(want), Some(have)) = (desired.spec.as_ref(), existing.spec.as_ref()) else {
        return desired.spec.is_some();
    };

    let want_labels = want.template.metadata.as_ref().and_then(|m| m.labels.as_ref());
    let have_labels = have.template.metadata.as_ref().and_then(|m| m.labels.as_ref());
    if want_labels != have_labels {
        return true;
    }

    let want_containers = want.template.spec.as_ref().map(|s| s.containers.as_slice());
    let have_containers = have.template.spec.as_ref().map(|s| s.containers.as_slice());
    match (want_containers, have_containers) {
        (Some(want), Some(have)) => {
            want.len() != have.len()
                || want.iter().zip(have).any(|(w, h)| container_drifted(w, h))
        }
        (None, _) => false,
        (Some(_), None) => true,
    }
}

fn container_drifted(want: &core::Container, have: &core::Container) -> bool {
    if want.name != have.name || want.image != have.image {
        return true;
    }
    if want.image_pull_policy.is_some() && want.image_pull_policy != have.image_pull_policy {
        return true;
    }
    if env_pairs(want) != env_pairs(have) {
        return true;
    }
    if container_ports(want) != container_ports(have) {
        return true;
    }

    let want_res = want.resources.as_ref();
    let have_res = have.resources.as_ref();
    quantities_drifted(
        want_res.and_then(|r| r.requests.as_ref()),
        have_res.and_then(|r| r.requests.as_ref()),
    ) || quantities_drifted(
        want_res.and_then(|r| r.limits.as_ref()),
        have_res.and_then(|r| r.limits.as_ref()),
    )
}

fn env_pairs(container: &core::Container) -> Vec<(&str, Option<&str>)> {
    container
        .env
        .iter()
        .flatten()
        .map(|e| (e.name.as_str(), e.value.as_deref()))
        .collect()
}

fn container_ports(container: &core::Container) -> Vec<(i32, &str)> {
    container
        .ports
        .iter()
        .flatten()
        .map(|p| {
            (
                p.container_port,
                p.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL),
            )
        })
        .collect()
}

fn quantities_drifted(
    want: Option<&BTreeMap<String, Quantity>>,
    have: Option<&BTreeMap<String, Quantity>>,
) -> bool {
    let empty = BTreeMap::new();
    let want = want.unwrap_or(&empty);
    let have = have.unwrap_or(&empty);
    want.len() != have.len()
        || want.iter().any(|(key, q)| match have.get(key) {
            Some(existing) => !same_quantity(q, existing),
            None => true,
        })
}

fn service_drifted(desired: &core::Service, existing: &core::Service) -> bool {
    let (Some(want), Some(have)) = (desired.spec.as_ref(), existing.spec.as_ref()) else {
        return desired.spec.is_some();
    };
    if want.selector != have.selector {
        return true;
    }
    service_ports(want) != service_ports(have)
}

fn service_ports(spec: &core::ServiceSpec) -> Vec<(i32, &str)> {
    spec.ports
        .iter()
        .flatten()
        .map(|p| (p.port, p.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL)))
        .collect()
}
