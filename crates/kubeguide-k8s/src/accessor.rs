//! Unified access to built-in and custom resources.
//!
//! Callers name a kind by its identity triple and pick an output shape by
//! method: `*_dynamic` returns open key-value trees, `*_typed::<K>` returns
//! `K`. The accessor decides which fetch strategy serves the request.

use std::future::Future;
use std::sync::Arc;

use kube::api::DynamicObject;
use serde::Deserialize;
use tracing::debug;

use kubeguide_types::{ResourceDescriptor, ResourceId};

use crate::cluster::{ClusterApi, TypedResource, api_resource, resource_id_of};
use crate::convert::{fill_type_meta, from_dynamic, from_dynamic_list};
use crate::error::{AccessError, AccessResult, ConversionError, ScopeError};
use crate::guard::RequestGuard;
use crate::registry::ResourceRegistry;
use crate::typed::TypedKinds;

/// What a typed request does with a built-in kind missing from [`TypedKinds`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedPolicy {
    /// Fail with [`AccessError::UnsupportedKind`]
    #[default]
    Reject,
    /// Fetch generically and convert
    Generic,
}

/// How a typed request will be served
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
    Typed,
    GenericConverted,
}

/// Whether a request targets one object or a collection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Object,
    Collection,
}

pub struct ResourceAccessor<C> {
    cluster: Arc<C>,
    registry: Arc<ResourceRegistry<C>>,
    typed: TypedKinds,
    unmapped: UnmappedPolicy,
    guard: RequestGuard,
}

impl<C: ClusterApi> ResourceAccessor<C> {
    pub fn new(registry: Arc<ResourceRegistry<C>>) -> Self {
        Self {
            cluster: Arc::clone(registry.cluster()),
            registry,
            typed: TypedKinds::builtin(),
            unmapped: UnmappedPolicy::default(),
            guard: RequestGuard::default(),
        }
    }

    pub fn with_typed_kinds(mut self, typed: TypedKinds) -> Self {
        self.typed = typed;
        self
    }

    pub fn with_unmapped_policy(mut self, policy: UnmappedPolicy) -> Self {
        self.unmapped = policy;
        self
    }

    pub fn with_guard(mut self, guard: RequestGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry<C>> {
        &self.registry
    }

    /// Look up `id` and check `namespace` against its scope.
    ///
    /// An empty namespace counts as none. Returns the descriptor and the
    /// namespace to send.
    async fn resolve<'a>(
        &self,
        id: &ResourceId,
        namespace: Option<&'a str>,
        target: Target,
    ) -> AccessResult<(ResourceDescriptor, Option<&'a str>)> {
        let descriptor = self.registry.get(id).await?;
        let namespace = namespace.filter(|ns| !ns.is_empty());

        match (descriptor.namespaced, namespace, target) {
            (false, Some(_), _) => Err(ScopeError::ClusterScoped(id.clone()).into()),
            (true, None, Target::Object) => Err(ScopeError::NamespaceRequired(id.clone()).into()),
            _ => Ok((descriptor, namespace)),
        }
    }

    fn strategy_for<K: TypedResource>(
        &self,
        descriptor: &ResourceDescriptor,
    ) -> AccessResult<Strategy> {
        let actual = resource_id_of::<K>();
        if actual != descriptor.id {
            return Err(ConversionError::TypeMismatch {
                id: descriptor.id.clone(),
                actual,
                requested: std::any::type_name::<K>(),
            }
            .into());
        }

        if descriptor.custom {
            return Ok(Strategy::GenericConverted);
        }
        if let Some(entry) = self.typed.get(&descriptor.id) {
            debug!(id = %descriptor.id, decoder = entry.type_name, "typed decoder registered");
            return Ok(Strategy::Typed);
        }
        match self.unmapped {
            UnmappedPolicy::Reject => Err(AccessError::UnsupportedKind(descriptor.id.clone())),
            UnmappedPolicy::Generic => Ok(Strategy::GenericConverted),
        }
    }

    async fn guarded<T, F>(&self, id: &ResourceId, request: F) -> AccessResult<T>
    where
        F: Future<Output = kube::Result<T>>,
    {
        match self.guard.run(request).await {
            Ok(result) => result.map_err(|source| AccessError::Api {
                id: id.clone(),
                source,
            }),
            Err(reason) => Err(AccessError::Interrupted {
                id: id.clone(),
                reason,
            }),
        }
    }

    /// Fetch one object as an open key-value tree
    pub async fn get_dynamic(
        &self,
        id: &ResourceId,
        namespace: Option<&str>,
        name: &str,
    ) -> AccessResult<DynamicObject> {
        let (descriptor, namespace) = self.resolve(id, namespace, Target::Object).await?;
        debug!(%id, ?namespace, name, "generic get");
        let resource = api_resource(&descriptor);
        let mut object = self
            .guarded(id, self.cluster.get_dynamic(&resource, namespace, name))
            .await?;
        fill_type_meta(&mut object, &descriptor.kind);
        Ok(object)
    }

    /// List objects as open key-value trees; no namespace means all namespaces
    pub async fn list_dynamic(
        &self,
        id: &ResourceId,
        namespace: Option<&str>,
    ) -> AccessResult<Vec<DynamicObject>> {
        let (descriptor, namespace) = self.resolve(id, namespace, Target::Collection).await?;
        debug!(%id, ?namespace, "generic list");
        let resource = api_resource(&descriptor);
        let mut objects = self
            .guarded(id, self.cluster.list_dynamic(&resource, namespace))
            .await?;
        // List items of built-in kinds arrive without apiVersion and kind
        for object in &mut objects {
            fill_type_meta(object, &descriptor.kind);
        }
        debug!(%id, count = objects.len(), "listed objects");
        Ok(objects)
    }

    /// Fetch one object as `K`.
    ///
    /// `K` must describe the kind `id` names.
    pub async fn get_typed<K: TypedResource>(
        &self,
        id: &ResourceId,
        namespace: Option<&str>,
        name: &str,
    ) -> AccessResult<K> {
        let (descriptor, namespace) = self.resolve(id, namespace, Target::Object).await?;
        let strategy = self.strategy_for::<K>(&descriptor)?;
        debug!(%id, ?namespace, name, ?strategy, "typed get");

        match strategy {
            Strategy::Typed => {
                self.guarded(id, self.cluster.get_typed::<K>(namespace, name))
                    .await
            }
            Strategy::GenericConverted => {
                let resource = api_resource(&descriptor);
                let object = self
                    .guarded(id, self.cluster.get_dynamic(&resource, namespace, name))
                    .await?;
                Ok(from_dynamic(object)?)
            }
        }
    }

    /// List objects as `K`; no namespace means all namespaces
    pub async fn list_typed<K: TypedResource>(
        &self,
        id: &ResourceId,
        namespace: Option<&str>,
    ) -> AccessResult<Vec<K>> {
        let (descriptor, namespace) = self.resolve(id, namespace, Target::Collection).await?;
        let strategy = self.strategy_for::<K>(&descriptor)?;
        debug!(%id, ?namespace, ?strategy, "typed list");

        match strategy {
            Strategy::Typed => {
                self.guarded(id, self.cluster.list_typed::<K>(namespace))
                    .await
            }
            Strategy::GenericConverted => {
                let resource = api_resource(&descriptor);
                let objects = self
                    .guarded(id, self.cluster.list_dynamic(&resource, namespace))
                    .await?;
                Ok(from_dynamic_list(objects)?)
            }
        }
    }
}
