use packread_types::blob::{BlobHandle, PackedBlob};
use packread_types::error::{PackreadError, Result};

use crate::cache::PackCache;
use crate::sort::sort_cached_packs_first;
use crate::stream::PackStreamer;

/// Load one blob from whichever candidate pack yields it first.
///
/// Candidates not matching `handle` are ignored. The rest are tried
/// cache-first; a failed candidate is logged and the next one is tried.
/// Cancellation and malformed index entries stop the search. The caller's
/// slice is left as it was.
pub fn load_blob<C: PackCache + ?Sized>(
    streamer: &PackStreamer<'_>,
    cache: &C,
    handle: &BlobHandle,
    candidates: &[PackedBlob],
) -> Result<Vec<u8>> {
    let mut matching: Vec<PackedBlob> = candidates
        .iter()
        .filter(|c| c.blob.handle == *handle)
        .copied()
        .collect();
    sort_cached_packs_first(cache, &mut matching);

    let mut last_err = None;
    for candidate in &matching {
        if streamer.cancel_token().is_cancelled() {
            return Err(PackreadError::Cancelled);
        }

        let mut delivered = None;
        let outcome = streamer
            .stream(
                &candidate.pack_id,
                std::slice::from_ref(&candidate.blob),
                |_, result| {
                    delivered = Some(result);
                    Ok(())
                },
            )
            .and_then(|()| {
                delivered.unwrap_or_else(|| {
                    Err(PackreadError::Other(format!(
                        "pack {} delivered nothing for blob {handle}",
                        candidate.pack_id
                    )))
                })
            });

        match outcome {
            Ok(plaintext) => return Ok(plaintext),
            Err(e) if matches!(e, PackreadError::Cancelled) || e.is_invalid_request() => {
                return Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    "loading blob {handle} from pack {} failed: {e}",
                    candidate.pack_id
                );
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or(PackreadError::BlobNotFound(*handle)))
}
