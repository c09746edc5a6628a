use crate::particle::{Particle, Tint, Vec2};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("{collection} replacement has {actual} particles, expected {expected}")]
    LengthMismatch {
        collection: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Read-only view of both collections, taken between passes.
///
/// Holding a snapshot keeps the collections it saw alive; later
/// replacements never show through.
#[derive(Debug, Clone)]
pub struct Snapshot {
    free: Arc<[Particle]>,
    cluster: Arc<[Particle]>,
}

impl Snapshot {
    pub fn free(&self) -> &[Particle] {
        &self.free
    }

    pub fn cluster(&self) -> &[Particle] {
        &self.cluster
    }

    /// Free particles first, then the cluster, each in index order
    pub fn points(&self) -> impl Iterator<Item = (Vec2, Tint)> + '_ {
        self.free
            .iter()
            .chain(self.cluster.iter())
            .map(|p| (p.position, p.tint))
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.free() == other.free() && self.cluster() == other.cluster()
    }
}

/// Canonical owner of the free and cluster collections
#[derive(Debug)]
pub struct ParticleStore {
    free: Arc<[Particle]>,
    cluster: Arc<[Particle]>,
}

impl ParticleStore {
    pub fn new(free: Vec<Particle>, cluster: Vec<Particle>) -> Self {
        Self {
            free: free.into(),
            cluster: cluster.into(),
        }
    }

    pub fn free(&self) -> &[Particle] {
        &self.free
    }

    pub fn cluster(&self) -> &[Particle] {
        &self.cluster
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            free: Arc::clone(&self.free),
            cluster: Arc::clone(&self.cluster),
        }
    }

    /// Swap in the results of one tick. Both lengths are checked before
    /// either collection changes, so a tick commits whole or not at all.
    pub fn commit(
        &mut self,
        free: Vec<Particle>,
        cluster: Option<Vec<Particle>>,
    ) -> Result<(), StoreError> {
        Self::check(&self.free, &free, "free")?;
        if let Some(cluster) = &cluster {
            Self::check(&self.cluster, cluster, "cluster")?;
        }
        self.replace_free(free)?;
        if let Some(cluster) = cluster {
            self.replace_cluster(cluster)?;
        }
        Ok(())
    }

    /// Swap in a complete new free collection, or change nothing
    pub fn replace_free(&mut self, next: Vec<Particle>) -> Result<(), StoreError> {
        Self::replace(&mut self.free, next, "free")
    }

    /// Swap in a complete new cluster collection, or change nothing
    pub fn replace_cluster(&mut self, next: Vec<Particle>) -> Result<(), StoreError> {
        Self::replace(&mut self.cluster, next, "cluster")
    }

    fn replace(
        slot: &mut Arc<[Particle]>,
        next: Vec<Particle>,
        collection: &'static str,
    ) -> Result<(), StoreError> {
        Self::check(&**slot, &next, collection)?;
        *slot = next.into();
        Ok(())
    }

    fn check(
        current: &[Particle],
        next: &[Particle],
        collection: &'static str,
    ) -> Result<(), StoreError> {
        if next.len() != current.len() {
            return Err(StoreError::LengthMismatch {
                collection,
                expected: current.len(),
                actual: next.len(),
            });
        }
        Ok(())
    }
}
