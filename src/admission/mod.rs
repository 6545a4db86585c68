//! Synchronous admission gate for pod writes.

pub mod server;
pub mod validator;

pub use validator::{rejection_message, validate_pod, FieldError, ValidationVerdict};

use crate::error::Result;
use k8s_openapi::api::core::v1::Pod;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, Operation};
use kube::core::{DynamicObject, GroupVersionKind};
use std::sync::Arc;
use tracing::info;

/// Audit sink handed to the validator.
///
/// Every evaluated object and every violation goes through here, also for
/// objects that end up admitted.
pub trait AuditLog: Send + Sync {
    fn request_received(&self, operation: &Operation, kind: &str, name: &str);
    fn object_evaluated(&self, name: &str, body: &str);
    fn violation_found(&self, name: &str, error: &FieldError);
}

/// [`AuditLog`] writing `tracing` events under a fixed component name.
#[derive(Clone, Debug)]
pub struct TracingAuditLog {
    component: String,
}

impl TracingAuditLog {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl Default for TracingAuditLog {
    fn default() -> Self {
        Self::new("pod-resource")
    }
}

impl AuditLog for TracingAuditLog {
    fn request_received(&self, operation: &Operation, kind: &str, name: &str) {
        info!(component = %self.component, "Validation for {} {} upon {:?}", kind, name, operation);
    }

    fn object_evaluated(&self, name: &str, body: &str) {
        info!(component = %self.component, pod = %name, "{}", body);
    }

    fn violation_found(&self, name: &str, error: &FieldError) {
        info!(component = %self.component, pod = %name, "{} is missing", error.path);
    }
}

/// Admitted objects narrowed to the kinds the gate understands.
#[derive(Clone, Debug)]
pub enum AdmissionObject {
    Pod(Box<Pod>),
    Unsupported { kind: String },
}

impl AdmissionObject {
    pub fn from_dynamic(gvk: &GroupVersionKind, object: &DynamicObject) -> Result<Self> {
        if gvk.group.is_empty() && gvk.version == "v1" && gvk.kind == "Pod" {
            let pod: Pod = serde_json::from_value(serde_json::to_value(object)?)?;
            Ok(AdmissionObject::Pod(Box::new(pod)))
        } else {
            Ok(AdmissionObject::Unsupported {
                kind: gvk.kind.clone(),
            })
        }
    }

    pub fn into_pod(self) -> Option<Pod> {
        match self {
            AdmissionObject::Pod(pod) => Some(*pod),
            AdmissionObject::Unsupported { .. } => None,
        }
    }
}

/// Validates pods arriving through the admission webhook.
#[derive(Clone)]
pub struct PodValidator {
    audit: Arc<dyn AuditLog>,
}

impl PodValidator {
    pub fn new(audit: Arc<dyn AuditLog>) -> Self {
        Self { audit }
    }

    pub fn validate(&self, pod: &Pod, prior: Option<&Pod>) -> ValidationVerdict {
        validate_pod(pod, prior, self.audit.as_ref())
    }

    /// Answers one admission request. Deletes and connects are always
    /// allowed; creates and updates must carry a pod that passes
    /// [`validate_pod`].
    pub fn review(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        let response = AdmissionResponse::from(request);

        match request.operation {
            Operation::Delete | Operation::Connect => return response,
            Operation::Create | Operation::Update => {}
        }

        let Some(object) = request.object.as_ref() else {
            return response.deny("admission request carries no object");
        };

        let pod = match AdmissionObject::from_dynamic(&request.kind, object) {
            Ok(AdmissionObject::Pod(pod)) => pod,
            Ok(AdmissionObject::Unsupported { kind }) => {
                return response.deny(format!("expected a Pod object but got {kind}"));
            }
            Err(e) => return response.deny(format!("malformed Pod object: {e}")),
        };

        let prior = request
            .old_object
            .as_ref()
            .and_then(|old| AdmissionObject::from_dynamic(&request.kind, old).ok())
            .and_then(AdmissionObject::into_pod);

        self.audit
            .request_received(&request.operation, &request.kind.kind, &request.name);

        match self.validate(&pod, prior.as_ref()) {
            ValidationVerdict::Accept => response,
            ValidationVerdict::Reject(errors) => {
                let name = if request.name.is_empty() {
                    kube::ResourceExt::name_any(pod.as_ref())
                } else {
                    request.name.clone()
                };
                response.deny(rejection_message(&name, &errors))
            }
        }
    }
}
