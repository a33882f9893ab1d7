//! Conversion between schema-less objects and strongly-shaped types.
//!
//! Kept apart from the fetch strategies so both directions can be exercised
//! with literal fixtures.

use kube::api::DynamicObject;
use kube::core::TypeMeta;
use serde::Serialize;
use serde::de::DeserializeOwned;

use kubeguide_types::KindId;

use crate::error::ConversionError;

/// Decode a dynamic object into `T`
pub fn from_dynamic<T: DeserializeOwned>(object: DynamicObject) -> Result<T, ConversionError> {
    let kind = object
        .types
        .as_ref()
        .map(|t| t.kind.clone())
        .unwrap_or_else(|| "object".to_string());

    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|source| ConversionError::Decode {
            kind,
            target: std::any::type_name::<T>(),
            source,
        })
}

/// Decode every item of a list, failing on the first item that does not fit
pub fn from_dynamic_list<T: DeserializeOwned>(
    objects: Vec<DynamicObject>,
) -> Result<Vec<T>, ConversionError> {
    objects.into_iter().map(from_dynamic).collect()
}

/// Encode a strongly-shaped object as a dynamic object
pub fn to_dynamic<T: Serialize>(object: &T) -> Result<DynamicObject, ConversionError> {
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|source| ConversionError::Encode {
            source_type: std::any::type_name::<T>(),
            source,
        })
}

/// Set `apiVersion` and `kind` from `kind` when the object carries none
pub fn fill_type_meta(object: &mut DynamicObject, kind: &KindId) {
    if object.types.is_none() {
        object.types = Some(TypeMeta {
            api_version: kind.api_version(),
            kind: kind.kind.clone(),
        });
    }
}

/// Drop server-side bookkeeping that only clutters a details view
pub fn strip_managed_fields(object: &mut DynamicObject) {
    object.metadata.managed_fields = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Pod;
    use serde::Deserialize;
    use serde_json::json;

    fn pod_fixture() -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "web-0",
                "namespace": "team-a",
                "managedFields": [{"manager": "kubectl", "operation": "Apply"}]
            },
            "spec": {"containers": [{"name": "web", "image": "nginx:1.27"}]},
            "status": {"phase": "Running"}
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_pod_from_open_map() {
        let pod: Pod = from_dynamic(pod_fixture()).unwrap();
        assert_eq!(pod.metadata.name.as_deref(), Some("web-0"));
        assert_eq!(pod.spec.unwrap().containers[0].image.as_deref(), Some("nginx:1.27"));
        assert_eq!(pod.status.unwrap().phase.as_deref(), Some("Running"));
    }

    #[test]
    fn test_encode_keeps_type_and_body() {
        let pod: Pod = from_dynamic(pod_fixture()).unwrap();
        let object = to_dynamic(&pod).unwrap();
        let types = object.types.as_ref().unwrap();
        assert_eq!(types.api_version, "v1");
        assert_eq!(types.kind, "Pod");
        assert_eq!(object.data["status"]["phase"], "Running");
    }

    #[test]
    fn test_shape_mismatch_is_a_conversion_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            spec: StrictSpec,
        }
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct StrictSpec {
            replicas: i32,
        }

        let err = from_dynamic::<Strict>(pod_fixture()).unwrap_err();
        match err {
            ConversionError::Decode { kind, .. } => assert_eq!(kind, "Pod"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fill_type_meta_only_when_missing() {
        let mut bare: DynamicObject = serde_json::from_value(json!({
            "metadata": {"name": "api"},
            "status": {"replicas": 2}
        }))
        .unwrap();
        assert!(bare.types.is_none());
        fill_type_meta(&mut bare, &KindId::new("apps", "v1", "Deployment"));
        let types = bare.types.as_ref().unwrap();
        assert_eq!(types.api_version, "apps/v1");
        assert_eq!(types.kind, "Deployment");

        let mut pod = pod_fixture();
        fill_type_meta(&mut pod, &KindId::new("example.io", "v1", "Widget"));
        assert_eq!(pod.types.unwrap().kind, "Pod");
    }

    #[test]
    fn test_strip_managed_fields() {
        let mut object = pod_fixture();
        assert!(object.metadata.managed_fields.is_some());
        strip_managed_fields(&mut object);
        assert!(object.metadata.managed_fields.is_none());
        assert_eq!(object.metadata.name.as_deref(), Some("web-0"));
    }
}
