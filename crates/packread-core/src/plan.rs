use std::collections::HashSet;

use packread_types::blob::{Blob, MIN_CIPHERTEXT_LEN};
use packread_types::error::{PackreadError, Result};
use packread_types::id::PackId;

use crate::config::StreamConfig;

/// One contiguous range request covering one or more blob records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRun {
    pub start: u64,
    pub end: u64,
    /// Positions into the caller's blob list, in offset order.
    pub members: Vec<usize>,
}

impl ReadRun {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Validate a pack's blob list and coalesce it into range reads.
///
/// Validation happens before anything is planned: every record must be at
/// least an empty sealed record and must not run past `u64::MAX`, then no
/// handle may repeat and no two records may overlap. Runs are returned in
/// offset order.
pub fn plan_reads(pack_id: &PackId, blobs: &[Blob], config: &StreamConfig) -> Result<Vec<ReadRun>> {
    for blob in blobs {
        if blob.length < MIN_CIPHERTEXT_LEN || blob.end().is_none() {
            return Err(PackreadError::InvalidBlobLength {
                pack: *pack_id,
                offset: blob.offset,
                length: blob.length,
            });
        }
    }

    let mut seen = HashSet::with_capacity(blobs.len());
    if !blobs.iter().all(|blob| seen.insert(blob.handle)) {
        return Err(PackreadError::OverlappingBlobs { pack: *pack_id });
    }

    let mut order: Vec<usize> = (0..blobs.len()).collect();
    order.sort_by_key(|&i| blobs[i].offset);

    let mut runs: Vec<ReadRun> = Vec::new();
    let mut prev_end = 0u64;
    for (n, &idx) in order.iter().enumerate() {
        let blob = &blobs[idx];
        let blob_end = blob.offset + blob.length as u64;
        if n > 0 && blob.offset < prev_end {
            return Err(PackreadError::OverlappingBlobs { pack: *pack_id });
        }
        prev_end = blob_end;

        if let Some(cur) = runs.last_mut() {
            let gap = blob.offset - cur.end;
            if gap <= config.max_coalesce_gap {
                cur.end = blob_end;
                cur.members.push(idx);
                continue;
            }
        }
        runs.push(ReadRun {
            start: blob.offset,
            end: blob_end,
            members: vec![idx],
        });
    }

    tracing::debug!(
        "planned {} range reads for {} blobs in pack {pack_id}",
        runs.len(),
        blobs.len()
    );
    Ok(runs)
}
