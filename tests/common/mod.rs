#![allow(dead_code)]

use appdb_operator::crd::{AppWithDb, AppWithDbSpec};
use appdb_operator::error::{Error, Result};
use appdb_operator::store::ObjectStore;
use appdb_operator::types::{ChildKind, ChildObject};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Calls {
    pub gets: usize,
    pub creates: usize,
    pub replaces: usize,
}

impl Calls {
    pub fn mutations(&self) -> usize {
        self.creates + self.replaces
    }
}

#[derive(Default)]
struct State {
    apps: BTreeMap<(String, String), AppWithDb>,
    children: BTreeMap<(String, ChildKind, String), ChildObject>,
    namespaces: BTreeMap<String, Namespace>,
    calls: Calls,
    next_version: u64,
    fail_gets: bool,
    fail_mutations: bool,
    lose_next_create_race: bool,
    conflict_next_replace: bool,
}

/// In-memory stand-in for the API server that counts every call.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_app(&self, app: AppWithDb) {
        let key = (app.namespace().unwrap_or_default(), app.name_any());
        self.state.lock().apps.insert(key, app);
    }

    pub fn remove_app(&self, namespace: &str, name: &str) {
        self.state
            .lock()
            .apps
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn insert_child(&self, namespace: &str, child: ChildObject) {
        let key = (namespace.to_string(), child.kind(), child.name().to_string());
        self.state.lock().children.insert(key, child);
    }

    pub fn child(&self, namespace: &str, kind: ChildKind, name: &str) -> Option<ChildObject> {
        self.state
            .lock()
            .children
            .get(&(namespace.to_string(), kind, name.to_string()))
            .cloned()
    }

    pub fn children(&self) -> Vec<ChildObject> {
        self.state.lock().children.values().cloned().collect()
    }

    pub fn insert_namespace(&self, namespace: Namespace) {
        self.state
            .lock()
            .namespaces
            .insert(namespace.name_any(), namespace);
    }

    pub fn namespace(&self, name: &str) -> Option<Namespace> {
        self.state.lock().namespaces.get(name).cloned()
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().calls
    }

    pub fn reset_calls(&self) {
        self.state.lock().calls = Calls::default();
    }

    pub fn fail_gets(&self, fail: bool) {
        self.state.lock().fail_gets = fail;
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.state.lock().fail_mutations = fail;
    }

    /// The next create stores the object as if another worker had won the
    /// race, and answers AlreadyExists.
    pub fn lose_next_create_race(&self) {
        self.state.lock().lose_next_create_race = true;
    }

    pub fn conflict_next_replace(&self) {
        self.state.lock().conflict_next_replace = true;
    }
}

fn stamp(meta: &mut ObjectMeta, state: &mut State) {
    state.next_version += 1;
    meta.resource_version = Some(state.next_version.to_string());
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get_app(&self, namespace: &str, name: &str) -> Result<Option<AppWithDb>> {
        let mut state = self.state.lock();
        state.calls.gets += 1;
        if state.fail_gets {
            return Err(Error::Transient("store unavailable".to_string()));
        }
        Ok(state
            .apps
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn get_child(
        &self,
        namespace: &str,
        kind: ChildKind,
        name: &str,
    ) -> Result<Option<ChildObject>> {
        let mut state = self.state.lock();
        state.calls.gets += 1;
        if state.fail_gets {
            return Err(Error::Transient("store unavailable".to_string()));
        }
        Ok(state
            .children
            .get(&(namespace.to_string(), kind, name.to_string()))
            .cloned())
    }

    async fn create_child(&self, namespace: &str, mut child: ChildObject) -> Result<ChildObject> {
        let mut state = self.state.lock();
        state.calls.creates += 1;
        if state.fail_mutations {
            return Err(Error::Transient("store unavailable".to_string()));
        }
        let key = (namespace.to_string(), child.kind(), child.name().to_string());
        if state.lose_next_create_race {
            state.lose_next_create_race = false;
            stamp(child.metadata_mut(), &mut state);
            state.children.insert(key.clone(), child);
            return Err(Error::AlreadyExists(key.2));
        }
        if state.children.contains_key(&key) {
            return Err(Error::AlreadyExists(key.2));
        }
        stamp(child.metadata_mut(), &mut state);
        state.children.insert(key, child.clone());
        Ok(child)
    }

    async fn replace_child(&self, namespace: &str, mut child: ChildObject) -> Result<ChildObject> {
        let mut state = self.state.lock();
        state.calls.replaces += 1;
        if state.fail_mutations {
            return Err(Error::Transient("store unavailable".to_string()));
        }
        let key = (namespace.to_string(), child.kind(), child.name().to_string());
        if state.conflict_next_replace {
            state.conflict_next_replace = false;
            return Err(Error::Conflict(key.2));
        }
        let current = state
            .children
            .get(&key)
            .ok_or_else(|| Error::NotFound(key.2.clone()))?;
        if current.metadata().resource_version != child.metadata().resource_version {
            return Err(Error::Conflict(key.2));
        }
        stamp(child.metadata_mut(), &mut state);
        state.children.insert(key, child.clone());
        Ok(child)
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>> {
        let mut state = self.state.lock();
        state.calls.gets += 1;
        if state.fail_gets {
            return Err(Error::Transient("store unavailable".to_string()));
        }
        Ok(state.namespaces.get(name).cloned())
    }

    async fn replace_namespace(&self, mut namespace: Namespace) -> Result<Namespace> {
        let mut state = self.state.lock();
        state.calls.replaces += 1;
        if state.fail_mutations {
            return Err(Error::Transient("store unavailable".to_string()));
        }
        let name = namespace.name_any();
        if !state.namespaces.contains_key(&name) {
            return Err(Error::NotFound(name));
        }
        stamp(&mut namespace.metadata, &mut state);
        state.namespaces.insert(name, namespace.clone());
        Ok(namespace)
    }
}

pub fn app(namespace: &str, name: &str, image: &str) -> AppWithDb {
    let mut app = AppWithDb::new(
        name,
        AppWithDbSpec {
            image: image.to_string(),
        },
    );
    app.metadata.namespace = Some(namespace.to_string());
    app.metadata.uid = Some(format!("uid-{name}"));
    app
}

pub fn namespace(name: &str, labels: &[(&str, &str)]) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: if labels.is_empty() {
                None
            } else {
                Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                )
            },
            ..Default::default()
        },
        ..Default::default()
    }
}
