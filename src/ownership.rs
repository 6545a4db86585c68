//! Controller ownership of derived children.
//!
//! Cascading deletion is left to the cluster's garbage collector, which
//! follows the controller owner reference written here. The engine never
//! deletes children itself.

use crate::error::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

/// Owner reference marking `parent` as the sole controller of a child.
///
/// Fails when the parent has not been persisted yet (no uid), in which case
/// no child may be created for it.
pub fn controller_owner<K>(parent: &K) -> Result<OwnerReference>
where
    K: Resource<DynamicType = ()>,
{
    let uid = parent.uid().ok_or(Error::MissingField("metadata.uid"))?;
    Ok(OwnerReference {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        name: parent.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

pub fn controller_of(meta: &ObjectMeta) -> Option<&OwnerReference> {
    meta.owner_references
        .as_ref()?
        .iter()
        .find(|r| r.controller == Some(true))
}

pub fn is_controlled_by(meta: &ObjectMeta, owner: &OwnerReference) -> bool {
    controller_of(meta).is_some_and(|r| r.uid == owner.uid)
}

/// Adopts an object: installs `owner` as its controller, leaving other
/// (non-controller) references untouched.
///
/// Errors when a different controller already owns the object.
pub fn ensure_controller(meta: &mut ObjectMeta, owner: OwnerReference) -> Result<()> {
    if let Some(existing) = controller_of(meta) {
        if existing.uid == owner.uid {
            return Ok(());
        }
        return Err(Error::Invalid(format!(
            "{} is already controlled by {} {}",
            meta.name.as_deref().unwrap_or_default(),
            existing.kind,
            existing.name
        )));
    }
    meta.owner_references.get_or_insert_with(Vec::new).push(owner);
    Ok(())
}
