use super::{ChildResource, Labels};
use k8s_openapi::api::core::v1 as core;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

/// A ClusterIP service fronting the pods matched by `selector_labels`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub selector_labels: Labels,
    pub ports: Vec<i32>,
    pub protocol: String,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, selector_labels: Labels) -> Self {
        Self {
            name: name.into(),
            selector_labels,
            ports: Vec::new(),
            protocol: "TCP".to_string(),
        }
    }

    pub fn port(mut self, port: i32) -> Self {
        self.ports.push(port);
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn service_ports(&self) -> Vec<core::ServicePort> {
        self.ports
            .iter()
            .map(|&port| core::ServicePort {
                port,
                protocol: Some(self.protocol.clone()),
                ..Default::default()
            })
            .collect()
    }
}

impl ChildResource for ServiceSpec {
    type K8sType = core::Service;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str, owner_ref: OwnerReference) -> Self::K8sType {
        let ports = self.service_ports();
        let selector = self.selector_labels.into_inner();
        core::Service {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(namespace.to_string()),
                labels: Some(selector.clone()),
                owner_references: Some(vec![owner_ref]),
                ..Default::default()
            },
            spec: Some(core::ServiceSpec {
                selector: Some(selector),
                ports: Some(ports),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
