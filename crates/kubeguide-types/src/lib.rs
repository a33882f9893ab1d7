//! Shared types for kubeguide
//!
//! This crate contains the identity and descriptor types used across the
//! kubeguide crates. It has no dependency on a cluster client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Resource Identity
// ============================================================================

/// Identity triple naming a kind of cluster object for API purposes.
///
/// Equality is exact on all three fields. The core group is the empty string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub group: String,
    pub version: String,
    pub plural: String,
}

impl ResourceId {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            plural: plural.into(),
        }
    }

    /// Identity in the core (legacy) API group
    pub fn core(version: impl Into<String>, plural: impl Into<String>) -> Self {
        Self::new("", version, plural)
    }

    /// `version` for the core group, `group/version` otherwise
    pub fn api_version(&self) -> String {
        api_version(&self.group, &self.version)
    }

    pub fn is_core_group(&self) -> bool {
        self.group.is_empty()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.plural)
    }
}

/// Error returned when a resource identity cannot be parsed
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid resource identity '{0}': expected 'version/plural' or 'group/version/plural'")]
pub struct ParseResourceIdError(pub String);

impl FromStr for ResourceId {
    type Err = ParseResourceIdError;

    /// Parses `v1/pods` or `apps/v1/deployments`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ParseResourceIdError(s.to_string()));
        }
        match parts.as_slice() {
            [version, plural] => Ok(Self::core(*version, *plural)),
            [group, version, plural] => Ok(Self::new(*group, *version, *plural)),
            _ => Err(ParseResourceIdError(s.to_string())),
        }
    }
}

/// Kind identity used for decoding objects
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KindId {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl KindId {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    pub fn api_version(&self) -> String {
        api_version(&self.group, &self.version)
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

fn api_version(group: &str, version: &str) -> String {
    if group.is_empty() {
        version.to_string()
    } else {
        format!("{}/{}", group, version)
    }
}

// ============================================================================
// Resource Descriptor
// ============================================================================

/// One kind of cluster object, as found by a discovery pass
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    pub kind: KindId,
    pub namespaced: bool,
    /// Installed through a CustomResourceDefinition rather than built in
    pub custom: bool,
}

impl ResourceDescriptor {
    /// Descriptor for a built-in kind; group and version are shared by id and kind
    pub fn builtin(id: ResourceId, kind: impl Into<String>, namespaced: bool) -> Self {
        let kind = KindId::new(id.group.clone(), id.version.clone(), kind);
        Self {
            id,
            kind,
            namespaced,
            custom: false,
        }
    }

    /// Descriptor for a kind served from a custom resource definition
    pub fn custom(id: ResourceId, kind: impl Into<String>, namespaced: bool) -> Self {
        let kind = KindId::new(id.group.clone(), id.version.clone(), kind);
        Self {
            id,
            kind,
            namespaced,
            custom: true,
        }
    }

    pub fn scope_label(&self) -> &'static str {
        if self.namespaced {
            "Namespaced"
        } else {
            "Cluster"
        }
    }

    pub fn origin_label(&self) -> &'static str {
        if self.custom { "Custom" } else { "Core" }
    }

    /// Whether a short, user-typed name refers to this kind.
    ///
    /// Accepts the plural, the lowercase Kind, or `plural.group`.
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        if name == self.id.plural || name == self.kind.kind.to_lowercase() {
            return true;
        }
        !self.id.group.is_empty() && name == format!("{}.{}", self.id.plural, self.id.group)
    }
}

// ============================================================================
// Kubeconfig Types
// ============================================================================

/// Kubernetes context information
#[derive(Clone, Debug)]
pub struct ContextInfo {
    pub name: String,
    pub cluster: String,
    pub user: String,
    pub namespace: Option<String>,
    pub is_current: bool,
}

impl ContextInfo {
    pub fn new(
        name: String,
        cluster: String,
        user: String,
        namespace: Option<String>,
        is_current: bool,
    ) -> Self {
        Self {
            name,
            cluster,
            user,
            namespace,
            is_current,
        }
    }
}
