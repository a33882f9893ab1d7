//! One-line summaries of objects for list views.

use kube::api::DynamicObject;
use serde::Serialize;

pub const UNKNOWN_STATUS: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub status: String,
}

pub fn summarize(object: &DynamicObject) -> ObjectSummary {
    let kind = object
        .types
        .as_ref()
        .map(|t| t.kind.clone())
        .unwrap_or_default();
    let status = status_of(&kind, &object.data).unwrap_or_else(|| UNKNOWN_STATUS.to_string());

    ObjectSummary {
        name: object.metadata.name.clone().unwrap_or_default(),
        namespace: object.metadata.namespace.clone(),
        kind,
        status,
    }
}

fn status_of(kind: &str, data: &serde_json::Value) -> Option<String> {
    match kind {
        "Pod" => data.pointer("/status/phase")?.as_str().map(str::to_string),
        "Service" => data.pointer("/spec/type")?.as_str().map(str::to_string),
        "Deployment" => {
            let replicas = data.pointer("/status/replicas")?.as_i64()?;
            let ready = data
                .pointer("/status/readyReplicas")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            Some(format!("{}/{}", ready, replicas))
        }
        _ => None,
    }
}
