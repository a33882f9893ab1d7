//! In-memory cluster for tests and offline development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceDefinition, CustomResourceDefinitionNames, CustomResourceDefinitionSpec,
    CustomResourceDefinitionVersion,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ApiResource, DynamicObject};
use kube::core::ErrorResponse;
use parking_lot::{Mutex, RwLock};

use kubeguide_types::ResourceId;

use crate::cluster::{ClusterApi, TypedResource, resource_id_of};
use crate::error::ConversionError;

/// Build a CustomResourceDefinition fixture.
///
/// `versions` lists `(name, served)` pairs.
pub fn definition(
    group: &str,
    plural: &str,
    kind: &str,
    namespaced: bool,
    versions: &[(&str, bool)],
) -> CustomResourceDefinition {
    CustomResourceDefinition {
        metadata: ObjectMeta {
            name: Some(format!("{}.{}", plural, group)),
            ..Default::default()
        },
        spec: CustomResourceDefinitionSpec {
            group: group.to_string(),
            names: CustomResourceDefinitionNames {
                plural: plural.to_string(),
                kind: kind.to_string(),
                ..Default::default()
            },
            scope: if namespaced { "Namespaced" } else { "Cluster" }.to_string(),
            versions: versions
                .iter()
                .enumerate()
                .map(|(i, (name, served))| CustomResourceDefinitionVersion {
                    name: name.to_string(),
                    served: *served,
                    storage: i == 0,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        },
        status: None,
    }
}

/// A [`ClusterApi`] holding definitions and objects in memory.
///
/// Counts calls per strategy so tests can tell which path served a request.
#[derive(Debug, Default)]
pub struct MockCluster {
    definitions: RwLock<Vec<CustomResourceDefinition>>,
    objects: RwLock<HashMap<ResourceId, Vec<DynamicObject>>>,
    fail_discovery: AtomicBool,
    discovery_delay: Mutex<Option<Duration>>,
    discovery_calls: AtomicUsize,
    dynamic_calls: AtomicUsize,
    typed_calls: AtomicUsize,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(self, crd: CustomResourceDefinition) -> Self {
        self.add_definition(crd);
        self
    }

    pub fn add_definition(&self, crd: CustomResourceDefinition) {
        self.definitions.write().push(crd);
    }

    /// Remove every definition whose metadata name is `name`
    pub fn remove_definition(&self, name: &str) {
        self.definitions
            .write()
            .retain(|crd| crd.metadata.name.as_deref() != Some(name));
    }

    /// Store an object under the given identity
    pub fn insert(&self, id: ResourceId, object: DynamicObject) {
        self.objects.write().entry(id).or_default().push(object);
    }

    /// Store a compile-time object under its own identity
    pub fn insert_typed<K: TypedResource>(&self, object: &K) -> Result<(), ConversionError> {
        let dynamic = crate::convert::to_dynamic(object)?;
        self.insert(resource_id_of::<K>(), dynamic);
        Ok(())
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.fail_discovery.store(fail, Ordering::SeqCst);
    }

    /// Hold each definition listing for `delay` before answering
    pub fn set_discovery_delay(&self, delay: Option<Duration>) {
        *self.discovery_delay.lock() = delay;
    }

    pub fn discovery_calls(&self) -> usize {
        self.discovery_calls.load(Ordering::SeqCst)
    }

    pub fn dynamic_calls(&self) -> usize {
        self.dynamic_calls.load(Ordering::SeqCst)
    }

    pub fn typed_calls(&self) -> usize {
        self.typed_calls.load(Ordering::SeqCst)
    }

    fn matching(&self, id: &ResourceId, namespace: Option<&str>) -> Vec<DynamicObject> {
        self.objects
            .read()
            .get(id)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|o| namespace.is_none() || o.metadata.namespace.as_deref() == namespace)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn find(&self, id: &ResourceId, namespace: Option<&str>, name: &str) -> kube::Result<DynamicObject> {
        self.matching(id, namespace)
            .into_iter()
            .find(|o| o.metadata.name.as_deref() == Some(name))
            .ok_or_else(|| {
                kube::Error::Api(ErrorResponse {
                    status: "Failure".to_string(),
                    message: format!("{} \"{}\" not found", id.plural, name),
                    reason: "NotFound".to_string(),
                    code: 404,
                })
            })
    }
}

fn decode<K: TypedResource>(object: DynamicObject) -> kube::Result<K> {
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(kube::Error::SerdeError)
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn list_definitions(&self) -> kube::Result<Vec<CustomResourceDefinition>> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.discovery_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: "the server is currently unable to handle the request".to_string(),
                reason: "ServiceUnavailable".to_string(),
                code: 503,
            }));
        }
        Ok(self.definitions.read().clone())
    }

    async fn get_dynamic(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<DynamicObject> {
        self.dynamic_calls.fetch_add(1, Ordering::SeqCst);
        let id = ResourceId::new(&resource.group, &resource.version, &resource.plural);
        self.find(&id, namespace, name)
    }

    async fn list_dynamic(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
    ) -> kube::Result<Vec<DynamicObject>> {
        self.dynamic_calls.fetch_add(1, Ordering::SeqCst);
        let id = ResourceId::new(&resource.group, &resource.version, &resource.plural);
        Ok(self.matching(&id, namespace))
    }

    async fn get_typed<K: TypedResource>(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<K> {
        self.typed_calls.fetch_add(1, Ordering::SeqCst);
        let object = self.find(&resource_id_of::<K>(), namespace, name)?;
        decode(object)
    }

    async fn list_typed<K: TypedResource>(&self, namespace: Option<&str>) -> kube::Result<Vec<K>> {
        self.typed_calls.fetch_add(1, Ordering::SeqCst);
        self.matching(&resource_id_of::<K>(), namespace)
            .into_iter()
            .map(decode::<K>)
            .collect()
    }
}
