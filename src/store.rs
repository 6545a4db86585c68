use crate::crd::AppWithDb;
use crate::error::{Error, Result};
use crate::types::{ChildKind, ChildObject};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Service};
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// The calls the reconcilers make against the cluster.
///
/// Lookups answer `Ok(None)` for a missing object. `create_child` reports a
/// lost create race as [`Error::AlreadyExists`]; the replace calls report a
/// stale resource version as [`Error::Conflict`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_app(&self, namespace: &str, name: &str) -> Result<Option<AppWithDb>>;

    async fn get_child(
        &self,
        namespace: &str,
        kind: ChildKind,
        name: &str,
    ) -> Result<Option<ChildObject>>;

    async fn create_child(&self, namespace: &str, child: ChildObject) -> Result<ChildObject>;

    async fn replace_child(&self, namespace: &str, child: ChildObject) -> Result<ChildObject>;

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>>;

    async fn replace_namespace(&self, namespace: Namespace) -> Result<Namespace>;
}

/// [`ObjectStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl KubeStore {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        }
    }
}

async fn get_opt<K>(api: &Api<K>, name: &str, target: String) -> Result<Option<K>>
where
    K: Clone + Debug + DeserializeOwned,
{
    match api.get(name).await {
        Ok(resource) => Ok(Some(resource)),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
        Err(e) => Err(Error::from_kube(e, target)),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_app(&self, namespace: &str, name: &str) -> Result<Option<AppWithDb>> {
        let api: Api<AppWithDb> = Api::namespaced(self.client.clone(), namespace);
        get_opt(&api, name, format!("AppWithDb {namespace}/{name}")).await
    }

    async fn get_child(
        &self,
        namespace: &str,
        kind: ChildKind,
        name: &str,
    ) -> Result<Option<ChildObject>> {
        let target = format!("{kind} {namespace}/{name}");
        match kind {
            ChildKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                Ok(get_opt(&api, name, target).await?.map(ChildObject::Deployment))
            }
            ChildKind::Service => {
                let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
                Ok(get_opt(&api, name, target).await?.map(ChildObject::Service))
            }
        }
    }

    async fn create_child(&self, namespace: &str, child: ChildObject) -> Result<ChildObject> {
        let target = format!("{} {namespace}/{}", child.kind(), child.name());
        let pp = self.post_params();
        match child {
            ChildObject::Deployment(d) => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.create(&pp, &d)
                    .await
                    .map(ChildObject::Deployment)
                    .map_err(|e| Error::from_kube(e, target))
            }
            ChildObject::Service(s) => {
                let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
                api.create(&pp, &s)
                    .await
                    .map(ChildObject::Service)
                    .map_err(|e| Error::from_kube(e, target))
            }
        }
    }

    async fn replace_child(&self, namespace: &str, child: ChildObject) -> Result<ChildObject> {
        let name = child.name().to_string();
        let target = format!("{} {namespace}/{name}", child.kind());
        let pp = self.post_params();
        match child {
            ChildObject::Deployment(d) => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.replace(&name, &pp, &d)
                    .await
                    .map(ChildObject::Deployment)
                    .map_err(|e| Error::from_kube(e, target))
            }
            ChildObject::Service(s) => {
                let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
                api.replace(&name, &pp, &s)
                    .await
                    .map(ChildObject::Service)
                    .map_err(|e| Error::from_kube(e, target))
            }
        }
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        get_opt(&api, name, format!("Namespace {name}")).await
    }

    async fn replace_namespace(&self, namespace: Namespace) -> Result<Namespace> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let name = namespace.name_any();
        api.replace(&name, &self.post_params(), &namespace)
            .await
            .map_err(|e| Error::from_kube(e, format!("Namespace {name}")))
    }
}
