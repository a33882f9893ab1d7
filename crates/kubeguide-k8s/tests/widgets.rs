use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use kube::api::DynamicObject;
use serde_json::json;

use kubeguide_k8s::mock::{MockCluster, definition};
use kubeguide_k8s::{
    AccessError, ResourceAccessor, ResourceId, ResourceRegistry, ScopeError, from_dynamic,
};

fn widget(namespace: &str, name: &str, size: u32) -> DynamicObject {
    serde_json::from_value(json!({
        "apiVersion": "example.io/v1",
        "kind": "Widget",
        "metadata": {"name": name, "namespace": namespace},
        "spec": {"size": size}
    }))
    .unwrap()
}

fn widgets_cluster() -> Arc<MockCluster> {
    let cluster = MockCluster::new().with_definition(definition(
        "example.io",
        "widgets",
        "Widget",
        true,
        &[("v1alpha1", false), ("v1", true)],
    ));
    let widgets = ResourceId::new("example.io", "v1", "widgets");
    cluster.insert(widgets.clone(), widget("team-a", "w1", 3));
    cluster.insert(widgets, widget("team-b", "w2", 5));
    Arc::new(cluster)
}

#[tokio::test]
async fn test_custom_widgets_end_to_end() {
    let cluster = widgets_cluster();
    let registry = Arc::new(ResourceRegistry::new(Arc::clone(&cluster)));
    let accessor = ResourceAccessor::new(Arc::clone(&registry));
    let widgets = ResourceId::new("example.io", "v1", "widgets");

    // Only the served version is registered
    let custom = registry.list_custom().await.unwrap();
    assert_eq!(custom.len(), 1);
    assert_eq!(custom[0].id, widgets);
    assert_eq!(custom[0].kind.kind, "Widget");
    assert!(custom[0].namespaced);
    assert!(
        !registry
            .exists(&ResourceId::new("example.io", "v1alpha1", "widgets"))
            .await
    );

    let w1 = accessor
        .get_dynamic(&widgets, Some("team-a"), "w1")
        .await
        .unwrap();
    assert_eq!(w1.data["spec"]["size"], 3);

    let err = accessor.get_dynamic(&widgets, None, "w1").await.unwrap_err();
    assert!(matches!(
        err,
        AccessError::Scope(ScopeError::NamespaceRequired(ref id)) if *id == widgets
    ));

    let all = accessor.list_dynamic(&widgets, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(cluster.discovery_calls(), 1);
}

#[tokio::test]
async fn test_builtin_pods_alongside_custom_kinds() {
    let cluster = widgets_cluster();
    let pods = ResourceId::core("v1", "pods");
    cluster.insert(
        pods.clone(),
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web-0", "namespace": "team-a"},
            "spec": {"containers": [{"name": "web", "image": "nginx:1.27"}]}
        }))
        .unwrap(),
    );
    let accessor = ResourceAccessor::new(Arc::new(ResourceRegistry::new(Arc::clone(&cluster))));

    let generic = accessor.get_dynamic(&pods, Some("team-a"), "web-0").await.unwrap();
    let typed: Pod = accessor.get_typed(&pods, Some("team-a"), "web-0").await.unwrap();
    assert_eq!(from_dynamic::<Pod>(generic).unwrap(), typed);
}
