//! Registry cache of the resource kinds a cluster currently serves.
//!
//! The registry holds the result of exactly one completed discovery pass. A new
//! pass builds its map off-lock and swaps it in whole, so readers see either the
//! old set or the new one. Passes run when the set is older than the TTL or on
//! an explicit [`ResourceRegistry::refresh`]; concurrent refreshers share a
//! single pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};

use kubeguide_types::{KindId, ResourceDescriptor, ResourceId};

use crate::clock::{Clock, SystemClock};
use crate::cluster::ClusterApi;
use crate::discovery::{DescriptorMap, discover};
use crate::error::{AccessError, AccessResult, DiscoveryError};
use crate::guard::RequestGuard;

/// Default time-to-live of a discovery pass (5 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Freshness of the registry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    /// No discovery pass has completed yet
    Unbuilt,
    Fresh,
    /// Older than the TTL; still served until the next lookup rebuilds it
    Stale,
}

struct Snapshot {
    descriptors: Arc<DescriptorMap>,
    built_at: Option<DateTime<Utc>>,
    generation: u64,
}

/// Descriptor registry for one cluster connection
pub struct ResourceRegistry<C> {
    cluster: Arc<C>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    guard: RequestGuard,
    snapshot: RwLock<Snapshot>,
    /// Serialises refreshers only; readers never wait on it
    rebuild: tokio::sync::Mutex<()>,
}

impl<C: ClusterApi> ResourceRegistry<C> {
    pub fn new(cluster: Arc<C>) -> Self {
        Self {
            cluster,
            clock: Arc::new(SystemClock),
            ttl: DEFAULT_CACHE_TTL,
            guard: RequestGuard::default(),
            snapshot: RwLock::new(Snapshot {
                descriptors: Arc::new(DescriptorMap::new()),
                built_at: None,
                generation: 0,
            }),
            rebuild: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_guard(mut self, guard: RequestGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn cluster(&self) -> &Arc<C> {
        &self.cluster
    }

    pub fn state(&self) -> CacheState {
        let snapshot = self.snapshot.read();
        match snapshot.built_at {
            None => CacheState::Unbuilt,
            Some(_) if self.is_stale(&snapshot) => CacheState::Stale,
            Some(_) => CacheState::Fresh,
        }
    }

    /// Number of completed discovery passes
    pub fn generation(&self) -> u64 {
        self.snapshot.read().generation
    }

    fn is_stale(&self, snapshot: &Snapshot) -> bool {
        let Some(built_at) = snapshot.built_at else {
            return true;
        };
        let age = self.clock.now().signed_duration_since(built_at);
        // An age that does not fit a std Duration is a clock step backwards
        age.to_std().map(|age| age > self.ttl).unwrap_or(false)
    }

    /// Force a discovery pass and swap in its result.
    ///
    /// If another pass completes while this call waits its turn, that pass is
    /// the answer and the cluster is not asked again. Returns the number of
    /// descriptors now held. On failure the previous set stays in place.
    pub async fn refresh(&self) -> Result<usize, DiscoveryError> {
        let seen = self.generation();
        let _rebuild = self.rebuild.lock().await;
        {
            let snapshot = self.snapshot.read();
            if snapshot.generation != seen {
                debug!(generation = snapshot.generation, "joined concurrent discovery pass");
                return Ok(snapshot.descriptors.len());
            }
        }
        self.rebuild_locked().await
    }

    async fn ensure_fresh(&self) -> Result<(), DiscoveryError> {
        let seen = {
            let snapshot = self.snapshot.read();
            if !self.is_stale(&snapshot) {
                return Ok(());
            }
            snapshot.generation
        };

        let _rebuild = self.rebuild.lock().await;
        if self.generation() != seen {
            return Ok(());
        }
        self.rebuild_locked().await.map(|_| ())
    }

    /// Caller must hold the rebuild gate
    async fn rebuild_locked(&self) -> Result<usize, DiscoveryError> {
        let descriptors = discover(self.cluster.as_ref(), &self.guard).await?;
        let count = descriptors.len();
        let built_at = self.clock.now();

        let mut snapshot = self.snapshot.write();
        *snapshot = Snapshot {
            descriptors: Arc::new(descriptors),
            built_at: Some(built_at),
            generation: snapshot.generation + 1,
        };
        debug!(generation = snapshot.generation, descriptors = count, "resource registry rebuilt");
        Ok(count)
    }

    /// The descriptor set, rebuilt first when stale.
    ///
    /// A failed rebuild falls back to the previous set when one exists.
    async fn current(&self) -> Result<Arc<DescriptorMap>, DiscoveryError> {
        if let Err(err) = self.ensure_fresh().await {
            let snapshot = self.snapshot.read();
            if snapshot.built_at.is_none() {
                return Err(err);
            }
            warn!(error = %err, "resource discovery failed, serving previous registry");
            return Ok(Arc::clone(&snapshot.descriptors));
        }
        Ok(Arc::clone(&self.snapshot.read().descriptors))
    }

    pub async fn get(&self, id: &ResourceId) -> AccessResult<ResourceDescriptor> {
        let descriptors = self.current().await?;
        descriptors
            .get(id)
            .cloned()
            .ok_or_else(|| AccessError::NotFound(id.clone()))
    }

    /// `get` without the error
    pub async fn exists(&self, id: &ResourceId) -> bool {
        self.get(id).await.is_ok()
    }

    /// Kind identity used to decode objects of `id`
    pub async fn kind_of(&self, id: &ResourceId) -> AccessResult<KindId> {
        Ok(self.get(id).await?.kind)
    }

    /// Every known kind, ordered by identity
    pub async fn list_all(&self) -> AccessResult<Vec<ResourceDescriptor>> {
        let descriptors = self.current().await?;
        Ok(sorted(descriptors.values()))
    }

    pub async fn list_custom(&self) -> AccessResult<Vec<ResourceDescriptor>> {
        let descriptors = self.current().await?;
        Ok(sorted(descriptors.values().filter(|d| d.custom)))
    }

    /// Kinds a short name such as `pods`, `pod` or `widgets.example.io` refers to
    pub async fn search(&self, name: &str) -> AccessResult<Vec<ResourceDescriptor>> {
        let descriptors = self.current().await?;
        Ok(sorted(descriptors.values().filter(|d| d.matches_name(name))))
    }

    /// Whatever the last completed pass found, without touching the cluster
    pub fn cached(&self) -> Vec<ResourceDescriptor> {
        sorted(self.snapshot.read().descriptors.values())
    }
}

fn sorted<'a>(descriptors: impl Iterator<Item = &'a ResourceDescriptor>) -> Vec<ResourceDescriptor> {
    let mut descriptors: Vec<_> = descriptors.cloned().collect();
    descriptors.sort_by(|a, b| a.id.cmp(&b.id));
    descriptors
}
