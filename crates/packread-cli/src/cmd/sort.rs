use std::path::Path;

use packread_core::{sort_cached_packs_first, CachedPacks, PackCache};
use packread_storage::LocalBackend;
use packread_types::blob::PackedBlob;
use packread_types::handle::Handle;
use packread_types::id::PackId;

/// Print candidate packs with locally cached ones first.
pub(crate) fn run_sort(cache_dir: &Path, candidates: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let cache = CachedPacks::scan(&LocalBackend::new(cache_dir)?)?;

    let mut entries = candidates
        .iter()
        .map(|hex| -> packread_types::error::Result<PackedBlob> {
            Ok(PackedBlob {
                pack_id: PackId::from_hex(hex)?,
                ..PackedBlob::default()
            })
        })
        .collect::<packread_types::error::Result<Vec<_>>>()?;
    sort_cached_packs_first(&cache, &mut entries);

    for entry in &entries {
        let state = if cache.has(&Handle::pack(&entry.pack_id)) {
            "cached"
        } else {
            "remote"
        };
        println!("{}\t{state}", entry.pack_id.to_hex());
    }
    Ok(())
}
