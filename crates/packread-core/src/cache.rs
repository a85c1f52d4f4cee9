use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::BuildHasher;

use packread_storage::StorageBackend;
use packread_types::error::Result;
use packread_types::handle::{FileType, Handle};
use packread_types::id::PackId;

/// Answers whether a pack file is available in a local cache.
///
/// Lookups must be cheap and free of side effects; they are evaluated
/// once per candidate while ordering reads.
pub trait PackCache {
    fn has(&self, handle: &Handle) -> bool;
}

impl<S: BuildHasher> PackCache for HashSet<Handle, S> {
    fn has(&self, handle: &Handle) -> bool {
        self.contains(handle)
    }
}

impl<S: BuildHasher> PackCache for HashMap<Handle, bool, S> {
    fn has(&self, handle: &Handle) -> bool {
        self.get(handle).copied().unwrap_or(false)
    }
}

impl PackCache for BTreeSet<Handle> {
    fn has(&self, handle: &Handle) -> bool {
        self.contains(handle)
    }
}

impl<T: PackCache + ?Sized> PackCache for &T {
    fn has(&self, handle: &Handle) -> bool {
        (**self).has(handle)
    }
}

impl<T: PackCache + ?Sized> PackCache for Box<T> {
    fn has(&self, handle: &Handle) -> bool {
        (**self).has(handle)
    }
}

/// Snapshot of the packs present in a local cache directory.
#[derive(Debug, Clone, Default)]
pub struct CachedPacks {
    packs: HashSet<Handle>,
}

impl CachedPacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// List `packs/` on `backend` once. Keys that are not well-formed pack
    /// paths are skipped.
    pub fn scan(backend: &dyn StorageBackend) -> Result<Self> {
        let mut packs = HashSet::new();
        for key in backend.list("packs/")? {
            match Handle::from_storage_key(&key) {
                Some(handle) if handle.file_type == FileType::Pack => {
                    packs.insert(handle);
                }
                _ => tracing::debug!("ignoring unexpected cache entry '{key}'"),
            }
        }
        tracing::debug!("pack cache holds {} packs", packs.len());
        Ok(Self { packs })
    }

    pub fn insert(&mut self, pack_id: &PackId) {
        self.packs.insert(Handle::pack(pack_id));
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
}

impl PackCache for CachedPacks {
    fn has(&self, handle: &Handle) -> bool {
        self.packs.contains(handle)
    }
}
