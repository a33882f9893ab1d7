//! Kubernetes resource access for kubeguide
//!
//! Discovers the kinds a cluster serves, caches them in a registry, and reads
//! objects of any discovered kind through one accessor, either as open
//! key-value trees or as compile-time types.

mod accessor;
mod clock;
mod cluster;
mod convert;
mod discovery;
mod error;
mod guard;
pub mod mock;
mod registry;
mod summary;
mod typed;

pub use accessor::{ResourceAccessor, UnmappedPolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cluster::{ClusterApi, KubeCluster, TypedResource, api_resource, resource_id_of};
pub use convert::{
    fill_type_meta, from_dynamic, from_dynamic_list, strip_managed_fields, to_dynamic,
};
pub use discovery::{DescriptorMap, builtin_descriptors, definition_descriptors, discover};
pub use error::{
    AccessError, AccessResult, ConversionError, DiscoveryError, Interrupted, ScopeError,
};
pub use guard::{DEFAULT_REQUEST_TIMEOUT, RequestGuard};
pub use registry::{CacheState, DEFAULT_CACHE_TTL, ResourceRegistry};
pub use summary::{ObjectSummary, UNKNOWN_STATUS, summarize};
pub use typed::{TypedKind, TypedKinds};

// Re-export types that are used in our public API
pub use kubeguide_types::{ContextInfo, KindId, ResourceDescriptor, ResourceId};
