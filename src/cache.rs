//! Scan memoisation owned by a [`Project`](crate::Project).
//!
//! A cached scan is reused only while the collection's generation and the
//! project's registry generation are both unchanged. Generations are drawn
//! from one global counter, so two collections never share a stamp even if
//! one was cloned from the other.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::archive::ArchiveScan;
use crate::scanner::ScanResult;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a scannable collection instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId(u64);

impl CollectionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone)]
pub(crate) enum CachedValue {
    Directory(Rc<ScanResult>),
    Archive(Rc<ArchiveScan>),
}

#[derive(Debug)]
struct CachedScan {
    generation: u64,
    registry_generation: u64,
    value: CachedValue,
}

#[derive(Debug, Default)]
pub(crate) struct ScanCache {
    entries: HashMap<CollectionId, CachedScan>,
}

impl ScanCache {
    pub(crate) fn get(
        &self,
        id: CollectionId,
        generation: u64,
        registry_generation: u64,
    ) -> Option<CachedValue> {
        self.entries
            .get(&id)
            .filter(|c| c.generation == generation && c.registry_generation == registry_generation)
            .map(|c| c.value.clone())
    }

    pub(crate) fn put(
        &mut self,
        id: CollectionId,
        generation: u64,
        registry_generation: u64,
        value: CachedValue,
    ) {
        self.entries.insert(
            id,
            CachedScan {
                generation,
                registry_generation,
                value,
            },
        );
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
