//! Resource discovery for Kubernetes clusters.
//!
//! Built-in kinds come from a fixed list of `k8s-openapi` types. Custom kinds
//! come from the cluster's CustomResourceDefinitions, one descriptor per
//! served version.

use std::collections::HashMap;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::Resource;
use tracing::{debug, info};

use kubeguide_types::{ResourceDescriptor, ResourceId};

use crate::cluster::ClusterApi;
use crate::error::DiscoveryError;
use crate::guard::RequestGuard;

/// Descriptors from one completed discovery pass, keyed by identity
pub type DescriptorMap = HashMap<ResourceId, ResourceDescriptor>;

/// Built-in kinds known without asking the cluster
pub fn builtin_descriptors() -> Vec<ResourceDescriptor> {
    use k8s_openapi::api::{
        apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
        core::v1::{ConfigMap, Namespace, Pod, Secret, Service},
    };

    let mut descriptors = Vec::new();

    // Identity and Kind come from the compile-time type; scope is stated here
    macro_rules! builtin {
        (@inner $type:ty, $namespaced:expr) => {{
            let id = ResourceId::new(
                <$type>::group(&()),
                <$type>::version(&()),
                <$type>::plural(&()),
            );
            descriptors.push(ResourceDescriptor::builtin(
                id,
                <$type>::kind(&()),
                $namespaced,
            ));
        }};
        ($type:ty, namespaced) => {
            builtin!(@inner $type, true)
        };
        ($type:ty, cluster) => {
            builtin!(@inner $type, false)
        };
    }

    // Core API (v1)
    builtin!(Pod, namespaced);
    builtin!(Service, namespaced);
    builtin!(ConfigMap, namespaced);
    builtin!(Secret, namespaced);
    builtin!(Namespace, cluster);

    // Apps API (apps/v1)
    builtin!(Deployment, namespaced);
    builtin!(ReplicaSet, namespaced);
    builtin!(DaemonSet, namespaced);
    builtin!(StatefulSet, namespaced);

    descriptors
}

/// One descriptor per served version of a definition
pub fn definition_descriptors(crd: &CustomResourceDefinition) -> Vec<ResourceDescriptor> {
    let spec = &crd.spec;
    let namespaced = spec.scope == "Namespaced";

    spec.versions
        .iter()
        .filter(|version| version.served)
        .map(|version| {
            ResourceDescriptor::custom(
                ResourceId::new(&spec.group, &version.name, &spec.names.plural),
                &spec.names.kind,
                namespaced,
            )
        })
        .collect()
}

/// Run one full discovery pass.
///
/// A failure listing definitions fails the whole pass. A custom kind whose
/// identity collides with a built-in replaces the built-in entry.
pub async fn discover<C>(cluster: &C, guard: &RequestGuard) -> Result<DescriptorMap, DiscoveryError>
where
    C: ClusterApi + ?Sized,
{
    let mut descriptors: DescriptorMap = builtin_descriptors()
        .into_iter()
        .map(|d| (d.id.clone(), d))
        .collect();
    let builtin_count = descriptors.len();

    let definitions = guard
        .run(cluster.list_definitions())
        .await?
        .map_err(DiscoveryError::ListDefinitions)?;

    let mut custom_count = 0;
    for crd in &definitions {
        for descriptor in definition_descriptors(crd) {
            custom_count += 1;
            if let Some(replaced) = descriptors.insert(descriptor.id.clone(), descriptor) {
                debug!(id = %replaced.id, "custom resource definition shadows a built-in kind");
            }
        }
    }

    info!(
        builtin = builtin_count,
        custom = custom_count,
        definitions = definitions.len(),
        total = descriptors.len(),
        "resource discovery completed"
    );

    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCluster, definition};

    #[test]
    fn test_builtin_list() {
        let builtins = builtin_descriptors();
        assert_eq!(builtins.len(), 9);
        assert!(builtins.iter().all(|d| !d.custom));

        let namespaces = builtins
            .iter()
            .find(|d| d.id == ResourceId::core("v1", "namespaces"))
            .unwrap();
        assert!(!namespaces.namespaced);
        assert_eq!(namespaces.kind.kind, "Namespace");

        let statefulsets = builtins
            .iter()
            .find(|d| d.id == ResourceId::new("apps", "v1", "statefulsets"))
            .unwrap();
        assert!(statefulsets.namespaced);
        assert_eq!(statefulsets.kind.kind, "StatefulSet");
    }

    #[test]
    fn test_unserved_versions_are_skipped() {
        let crd = definition(
            "example.io",
            "widgets",
            "Widget",
            true,
            &[("v1alpha1", false), ("v1beta1", true), ("v1", true)],
        );
        let descriptors = definition_descriptors(&crd);
        let versions: Vec<_> = descriptors.iter().map(|d| d.id.version.as_str()).collect();
        assert_eq!(versions, vec!["v1beta1", "v1"]);
        assert!(descriptors.iter().all(|d| d.custom && d.namespaced));
        assert!(descriptors.iter().all(|d| d.id.plural == "widgets"));
    }

    #[test]
    fn test_cluster_scoped_definition() {
        let crd = definition("example.io", "clusterwidgets", "ClusterWidget", false, &[("v1", true)]);
        let descriptors = definition_descriptors(&crd);
        assert_eq!(descriptors.len(), 1);
        assert!(!descriptors[0].namespaced);
        assert_eq!(descriptors[0].kind.kind, "ClusterWidget");
    }

    #[tokio::test]
    async fn test_discover_merges_builtin_and_custom() {
        let cluster = MockCluster::new().with_definition(definition(
            "example.io",
            "widgets",
            "Widget",
            true,
            &[("v1", true), ("v2", true)],
        ));

        let descriptors = discover(&cluster, &RequestGuard::default()).await.unwrap();
        assert_eq!(descriptors.len(), 11);
        assert!(descriptors[&ResourceId::new("example.io", "v2", "widgets")].custom);
        assert!(!descriptors[&ResourceId::core("v1", "pods")].custom);
    }

    #[tokio::test]
    async fn test_custom_kind_overwrites_builtin() {
        let cluster = MockCluster::new().with_definition(definition(
            "apps",
            "deployments",
            "Deployment",
            false,
            &[("v1", true)],
        ));

        let descriptors = discover(&cluster, &RequestGuard::default()).await.unwrap();
        let deployments = &descriptors[&ResourceId::new("apps", "v1", "deployments")];
        assert!(deployments.custom);
        assert!(!deployments.namespaced);
        assert_eq!(descriptors.len(), 9);
    }

    #[tokio::test]
    async fn test_definition_failure_aborts_pass() {
        let cluster = MockCluster::new();
        cluster.fail_discovery(true);

        let err = discover(&cluster, &RequestGuard::default()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::ListDefinitions(_)));
    }
}
