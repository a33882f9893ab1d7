//! Table of built-in kinds served by the strongly-shaped fetch path.

use std::collections::HashMap;

use kubeguide_types::ResourceId;

use crate::cluster::{TypedResource, resource_id_of};

/// A kind registered for typed fetches
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedKind {
    pub kind: String,
    /// Rust type the kind decodes into
    pub type_name: &'static str,
}

/// Identity triple to decoding type, filled once at start-up.
///
/// Adding a kind is a `register::<K>()` call, not a new match arm.
#[derive(Clone, Debug, Default)]
pub struct TypedKinds {
    kinds: HashMap<ResourceId, TypedKind>,
}

impl TypedKinds {
    /// A table with nothing registered
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pods, services and deployments
    pub fn builtin() -> Self {
        use k8s_openapi::api::apps::v1::Deployment;
        use k8s_openapi::api::core::v1::{Pod, Service};

        let mut kinds = Self::empty();
        kinds
            .register::<Pod>()
            .register::<Service>()
            .register::<Deployment>();
        kinds
    }

    pub fn register<K: TypedResource>(&mut self) -> &mut Self {
        self.kinds.insert(
            resource_id_of::<K>(),
            TypedKind {
                kind: K::kind(&()).into_owned(),
                type_name: std::any::type_name::<K>(),
            },
        );
        self
    }

    pub fn get(&self, id: &ResourceId) -> Option<&TypedKind> {
        self.kinds.get(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.kinds.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
