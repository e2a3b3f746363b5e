//! Registry of the resource kinds the manager knows how to watch.

use std::collections::BTreeMap;

use kube::{
    Resource,
    core::{ApiResource, GroupVersionKind},
};

type Key = (String, String, String);

fn key(gvk: &GroupVersionKind) -> Key {
    (gvk.group.clone(), gvk.version.clone(), gvk.kind.clone())
}

/// Kind mappings shared read-only by the manager and every reconciler.
#[derive(Clone, Debug, Default)]
pub struct Scheme {
    kinds: BTreeMap<Key, ApiResource>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_known_type<K>(&mut self) -> &mut Self
    where
        K: Resource<DynamicType = ()>,
    {
        let ar = ApiResource::erase::<K>(&());
        let gvk = GroupVersionKind::gvk(&ar.group, &ar.version, &ar.kind);
        self.kinds.insert(key(&gvk), ar);
        self
    }

    pub fn is_registered<K>(&self) -> bool
    where
        K: Resource<DynamicType = ()>,
    {
        self.recognizes(&GroupVersionKind::gvk(&K::group(&()), &K::version(&()), &K::kind(&())))
    }

    pub fn recognizes(&self, gvk: &GroupVersionKind) -> bool {
        self.kinds.contains_key(&key(gvk))
    }

    pub fn api_resource(&self, gvk: &GroupVersionKind) -> Option<&ApiResource> {
        self.kinds.get(&key(gvk))
    }

    pub fn kinds(&self) -> impl Iterator<Item = GroupVersionKind> + '_ {
        self.kinds
            .values()
            .map(|ar| GroupVersionKind::gvk(&ar.group, &ar.version, &ar.kind))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
