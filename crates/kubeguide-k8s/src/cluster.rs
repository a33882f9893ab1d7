//! The seam between kubeguide and a cluster's object-management API.

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{ApiResource, DynamicObject, GetParams, GroupVersionKind, ListParams, ObjectList};
use kube::core::Request;
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;

use kubeguide_types::{ResourceDescriptor, ResourceId};

/// A kind whose shape is known at compile time.
///
/// Covered by every `k8s-openapi` type and every `#[derive(CustomResource)]` type.
pub trait TypedResource:
    Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Serialize + Send + Sync + 'static
{
}

impl<K> TypedResource for K where
    K: Resource<DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static
{
}

/// Identity triple of a compile-time kind
pub fn resource_id_of<K: TypedResource>() -> ResourceId {
    ResourceId::new(K::group(&()), K::version(&()), K::plural(&()))
}

/// Dynamic API resource for a descriptor
pub fn api_resource(descriptor: &ResourceDescriptor) -> ApiResource {
    let gvk = GroupVersionKind::gvk(
        &descriptor.kind.group,
        &descriptor.kind.version,
        &descriptor.kind.kind,
    );
    ApiResource::from_gvk_with_plural(&gvk, &descriptor.id.plural)
}

/// Requests the core issues against a cluster.
///
/// `namespace = None` addresses cluster-scoped kinds, or every namespace when
/// listing a namespaced kind.
#[async_trait]
pub trait ClusterApi: Send + Sync + 'static {
    /// List every installed CustomResourceDefinition
    async fn list_definitions(&self) -> kube::Result<Vec<CustomResourceDefinition>>;

    /// Fetch one object as an open key-value tree
    async fn get_dynamic(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<DynamicObject>;

    /// List objects as open key-value trees
    async fn list_dynamic(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
    ) -> kube::Result<Vec<DynamicObject>>;

    /// Fetch one object decoded straight into `K`
    async fn get_typed<K: TypedResource>(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<K>;

    /// List objects decoded straight into `K`
    async fn list_typed<K: TypedResource>(&self, namespace: Option<&str>) -> kube::Result<Vec<K>>;
}

/// [`ClusterApi`] backed by a live `kube::Client`
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn dynamic_api(&self, resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_definitions(&self) -> kube::Result<Vec<CustomResourceDefinition>> {
        let definitions: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        Ok(definitions.list(&ListParams::default()).await?.items)
    }

    async fn get_dynamic(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<DynamicObject> {
        self.dynamic_api(resource, namespace).get(name).await
    }

    async fn list_dynamic(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
    ) -> kube::Result<Vec<DynamicObject>> {
        let list = self
            .dynamic_api(resource, namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn get_typed<K: TypedResource>(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<K> {
        // Api::namespaced needs a static scope bound, so build the request from the url path
        let request = Request::new(K::url_path(&(), namespace))
            .get(name, &GetParams::default())
            .map_err(kube::Error::BuildRequest)?;
        self.client.request::<K>(request).await
    }

    async fn list_typed<K: TypedResource>(&self, namespace: Option<&str>) -> kube::Result<Vec<K>> {
        let request = Request::new(K::url_path(&(), namespace))
            .list(&ListParams::default())
            .map_err(kube::Error::BuildRequest)?;
        let list = self.client.request::<ObjectList<K>>(request).await?;
        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{Namespace, Pod};

    #[test]
    fn test_resource_id_of_openapi_types() {
        assert_eq!(resource_id_of::<Pod>(), ResourceId::core("v1", "pods"));
        assert_eq!(
            resource_id_of::<Deployment>(),
            ResourceId::new("apps", "v1", "deployments")
        );
        assert_eq!(resource_id_of::<Namespace>(), ResourceId::core("v1", "namespaces"));
    }

    #[test]
    fn test_api_resource_for_custom_descriptor() {
        let widgets = ResourceDescriptor::custom(
            ResourceId::new("example.io", "v1", "widgets"),
            "Widget",
            true,
        );
        let ar = api_resource(&widgets);
        assert_eq!(ar.group, "example.io");
        assert_eq!(ar.version, "v1");
        assert_eq!(ar.api_version, "example.io/v1");
        assert_eq!(ar.kind, "Widget");
        assert_eq!(ar.plural, "widgets");
    }

    #[test]
    fn test_api_resource_for_core_descriptor() {
        let pods = ResourceDescriptor::builtin(ResourceId::core("v1", "pods"), "Pod", true);
        let ar = api_resource(&pods);
        assert_eq!(ar.api_version, "v1");
        assert_eq!(ar.plural, "pods");
    }
}
