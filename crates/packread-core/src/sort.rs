use packread_types::blob::PackedBlob;
use packread_types::handle::Handle;

use crate::cache::PackCache;

/// Move entries whose pack is present in `cache` to the front.
///
/// The sort is stable: within the cached group and within the uncached
/// group the caller's order is kept. `cache` is consulted once per entry.
pub fn sort_cached_packs_first<C: PackCache + ?Sized>(cache: &C, blobs: &mut [PackedBlob]) {
    blobs.sort_by_cached_key(|pb| !cache.has(&Handle::pack(&pb.pack_id)));
}
