use super::AuditLog;
use crate::types::quantity::is_non_zero;
use crate::types::{CPU, MEMORY};
use k8s_openapi::api::core::v1::{Pod, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;

/// One violated rule, addressed by its field path inside the object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: Invalid value: {:?}: {}", self.path, self.value, self.reason)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationVerdict {
    Accept,
    Reject(Vec<FieldError>),
}

impl ValidationVerdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, ValidationVerdict::Accept)
    }

    pub fn errors(&self) -> &[FieldError] {
        match self {
            ValidationVerdict::Accept => &[],
            ValidationVerdict::Reject(errors) => errors,
        }
    }
}

#[derive(Clone, Copy)]
enum Section {
    Requests,
    Limits,
}

impl Section {
    fn field(self) -> &'static str {
        match self {
            Section::Requests => "requests",
            Section::Limits => "limits",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Section::Requests => "request",
            Section::Limits => "limit",
        }
    }

    fn pick(self, resources: &ResourceRequirements) -> Option<&BTreeMap<String, Quantity>> {
        match self {
            Section::Requests => resources.requests.as_ref(),
            Section::Limits => resources.limits.as_ref(),
        }
    }
}

const REQUIRED: [(Section, &str); 4] = [
    (Section::Requests, CPU),
    (Section::Requests, MEMORY),
    (Section::Limits, CPU),
    (Section::Limits, MEMORY),
];

/// Every container must declare non-zero CPU and memory requests and limits.
///
/// Violations accumulate over all containers and all four fields. The
/// stored object passed on update is not consulted; the same rules apply. The
/// object and each violation are written to `audit` whatever the verdict.
pub fn validate_pod(pod: &Pod, _prior: Option<&Pod>, audit: &dyn AuditLog) -> ValidationVerdict {
    let name = pod.name_any();

    if let Ok(body) = serde_json::to_string(pod) {
        audit.object_evaluated(&name, &body);
    }

    let containers = pod
        .spec
        .as_ref()
        .map(|spec| spec.containers.as_slice())
        .unwrap_or_default();

    let mut errors = Vec::new();
    for (index, container) in containers.iter().enumerate() {
        for (section, resource) in REQUIRED {
            let quantity = container
                .resources
                .as_ref()
                .and_then(|r| section.pick(r))
                .and_then(|m| m.get(resource));

            if is_non_zero(quantity) {
                continue;
            }

            let error = FieldError {
                path: format!(
                    "spec.containers[{index}].resources.{}.{resource}",
                    section.field()
                ),
                value: quantity.map_or_else(|| "0".to_string(), |q| q.0.clone()),
                reason: format!("{resource} {} must be specified", section.noun()),
            };
            audit.violation_found(&name, &error);
            errors.push(error);
        }
    }

    if errors.is_empty() {
        ValidationVerdict::Accept
    } else {
        ValidationVerdict::Reject(errors)
    }
}

/// Message returned to the writer of a rejected pod.
pub fn rejection_message(name: &str, errors: &[FieldError]) -> String {
    let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("Pod {:?} is invalid: [{}]", name, details.join(", "))
}
