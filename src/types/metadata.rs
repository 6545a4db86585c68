use std::collections::BTreeMap;

pub const APP_LABEL: &str = "app";
pub const COMPONENT_LABEL: &str = "component";

/// Ordered label set; used both as object labels and as match selectors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Labels(pub BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// `app=<app>, component=<component>`, the selector shared by a child
    /// workload and the pods it manages.
    pub fn component(app: impl Into<String>, component: impl Into<String>) -> Self {
        Self::new()
            .insert(APP_LABEL, app)
            .insert(COMPONENT_LABEL, component)
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(key)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}
