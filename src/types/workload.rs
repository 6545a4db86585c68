use super::{ChildResource, Labels};
use k8s_openapi::api::apps::v1 as apps;
use k8s_openapi::api::core::v1 as core;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use std::collections::BTreeMap;

pub const CPU: &str = "cpu";
pub const MEMORY: &str = "memory";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceQuantities {
    pub cpu: String,
    pub memory: String,
}

impl ResourceQuantities {
    pub fn new(cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            cpu: cpu.into(),
            memory: memory.into(),
        }
    }

    pub fn into_k8s(self) -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            (CPU.to_string(), Quantity(self.cpu)),
            (MEMORY.to_string(), Quantity(self.memory)),
        ])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// A single-container deployment derived from a parent resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub name: String,
    pub selector_labels: Labels,
    pub container_name: String,
    pub container_image: String,
    pub image_pull_policy: Option<String>,
    pub ports: Vec<i32>,
    pub env_vars: Vec<EnvVar>,
    pub resource_requests: ResourceQuantities,
    pub resource_limits: ResourceQuantities,
}

impl WorkloadSpec {
    pub fn new(
        name: impl Into<String>,
        container_name: impl Into<String>,
        container_image: impl Into<String>,
        requests: ResourceQuantities,
        limits: ResourceQuantities,
    ) -> Self {
        let name = name.into();
        Self {
            selector_labels: Labels::new().insert(super::APP_LABEL, &name),
            name,
            container_name: container_name.into(),
            container_image: container_image.into(),
            image_pull_policy: None,
            ports: Vec::new(),
            env_vars: Vec::new(),
            resource_requests: requests,
            resource_limits: limits,
        }
    }

    pub fn selector_labels(mut self, labels: Labels) -> Self {
        self.selector_labels = labels;
        self
    }

    pub fn image_pull_policy(mut self, policy: impl Into<String>) -> Self {
        self.image_pull_policy = Some(policy.into());
        self
    }

    pub fn port(mut self, port: i32) -> Self {
        self.ports.push(port);
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push(EnvVar {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env_vars
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    /// The pod container as it is submitted to the API server. Port protocols
    /// are spelled out so a read-back object compares equal.
    pub fn container(&self) -> core::Container {
        core::Container {
            name: self.container_name.clone(),
            image: Some(self.container_image.clone()),
            image_pull_policy: self.image_pull_policy.clone(),
            ports: if self.ports.is_empty() {
                None
            } else {
                Some(
                    self.ports
                        .iter()
                        .map(|&port| core::ContainerPort {
                            container_port: port,
                            protocol: Some("TCP".to_string()),
                            ..Default::default()
                        })
                        .collect(),
                )
            },
            env: if self.env_vars.is_empty() {
                None
            } else {
                Some(
                    self.env_vars
                        .iter()
                        .map(|e| core::EnvVar {
                            name: e.name.clone(),
                            value: Some(e.value.clone()),
                            value_from: None,
                        })
                        .collect(),
                )
            },
            resources: Some(core::ResourceRequirements {
                requests: Some(self.resource_requests.clone().into_k8s()),
                limits: Some(self.resource_limits.clone().into_k8s()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

impl ChildResource for WorkloadSpec {
    type K8sType = apps::Deployment;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str, owner_ref: OwnerReference) -> Self::K8sType {
        let container = self.container();
        let labels = self.selector_labels.into_inner();
        apps::Deployment {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(namespace.to_string()),
                labels: Some(labels.clone()),
                owner_references: Some(vec![owner_ref]),
                ..Default::default()
            },
            spec: Some(apps::DeploymentSpec {
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    match_expressions: None,
                },
                template: core::PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(core::PodSpec {
                        containers: vec![container],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
