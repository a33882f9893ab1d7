//! Error types for discovery and resource access.

use std::time::Duration;

use kubeguide_types::ResourceId;
use thiserror::Error;

/// A cluster call that did not run to completion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Interrupted {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,
}

/// Enumerating the cluster's resource kinds failed.
///
/// The registry keeps whatever it held before the failed pass.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("failed to list custom resource definitions: {0}")]
    ListDefinitions(#[source] kube::Error),

    #[error("resource discovery interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

/// Namespace use that does not match a kind's scope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("resource {0} is cluster-scoped, cannot specify namespace")]
    ClusterScoped(ResourceId),

    #[error("resource {0} is namespaced, a namespace is required")]
    NamespaceRequired(ResourceId),
}

/// A schema-less object could not be turned into the requested shape, or back.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("cannot decode {kind} into {target}: {source}")]
    Decode {
        kind: String,
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode {source_type} as a dynamic object: {source}")]
    Encode {
        source_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{requested} describes {actual}, not the requested {id}")]
    TypeMismatch {
        id: ResourceId,
        actual: ResourceId,
        requested: &'static str,
    },
}

/// Errors returned by the registry and the unified accessor.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("resource {0} not found in cluster")]
    NotFound(ResourceId),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error("unsupported core resource: {0}")]
    UnsupportedKind(ResourceId),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("request for {id} failed: {source}")]
    Api {
        id: ResourceId,
        #[source]
        source: kube::Error,
    },

    #[error("request for {id} interrupted: {reason}")]
    Interrupted { id: ResourceId, reason: Interrupted },
}

impl AccessError {
    /// Whether retrying after a registry refresh could change the outcome
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Discovery(_) | Self::NotFound(_) | Self::Interrupted { .. }
        )
    }
}

pub type AccessResult<T> = Result<T, AccessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = ResourceId::core("v1", "namespaces");
        let err = AccessError::from(ScopeError::ClusterScoped(id.clone()));
        assert_eq!(
            err.to_string(),
            "resource v1/namespaces is cluster-scoped, cannot specify namespace"
        );

        let err = AccessError::NotFound(ResourceId::new("example.io", "v1", "widgets"));
        assert!(err.to_string().contains("example.io/v1/widgets"));

        let err = AccessError::UnsupportedKind(ResourceId::core("v1", "configmaps"));
        assert!(err.to_string().contains("v1/configmaps"));
    }

    #[test]
    fn test_retryable() {
        let id = ResourceId::core("v1", "pods");
        assert!(AccessError::NotFound(id.clone()).is_retryable());
        assert!(!AccessError::UnsupportedKind(id.clone()).is_retryable());
        assert!(!AccessError::from(ScopeError::NamespaceRequired(id)).is_retryable());
    }
}
