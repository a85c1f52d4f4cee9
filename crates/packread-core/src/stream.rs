use std::io::Read;
use std::sync::Arc;

use tracing::{debug, warn};

use packread_crypto::Key;
use packread_storage::retry::{classify_io, retry_load};
use packread_storage::{RangeLoader, RetryConfig};
use packread_types::blob::{Blob, BlobHandle};
use packread_types::cancel::CancelToken;
use packread_types::error::{LoadError, PackreadError, Result, VerifyFailure};
use packread_types::handle::Handle;
use packread_types::id::PackId;

use crate::compress;
use crate::config::StreamConfig;
use crate::plan::{plan_reads, ReadRun};

/// Alternative place to fetch a blob whose pack record could not be used.
///
/// Implementations return verified plaintext.
pub trait BlobSource: Send + Sync {
    fn load_blob(&self, handle: &BlobHandle) -> Result<Vec<u8>>;
}

/// Reads, decrypts and verifies blobs from a single pack.
///
/// Blobs are fetched with as few range reads as the [`StreamConfig`]
/// allows and handed to the caller strictly in the order they were
/// requested. A blob that fails to read or verify is reported to the
/// handler as an error without affecting its siblings.
pub struct PackStreamer<'a> {
    loader: &'a dyn RangeLoader,
    key: &'a Key,
    config: StreamConfig,
    cancel: CancelToken,
    fallback: Option<&'a dyn BlobSource>,
}

impl<'a> PackStreamer<'a> {
    pub fn new(loader: &'a dyn RangeLoader, key: &'a Key) -> Self {
        Self {
            loader,
            key,
            config: StreamConfig::default(),
            cancel: CancelToken::new(),
            fallback: None,
        }
    }

    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_fallback(mut self, fallback: &'a dyn BlobSource) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Stream `blobs` out of `pack_id`, calling `handle_blob` exactly once per
    /// blob in input order.
    ///
    /// Returns `Ok(())` only after every blob was delivered. An error from
    /// the handler stops the stream and is returned unchanged. Invalid blob
    /// lists are rejected before any read, without calling the handler.
    pub fn stream<F>(&self, pack_id: &PackId, blobs: &[Blob], mut handle_blob: F) -> Result<()>
    where
        F: FnMut(&BlobHandle, Result<Vec<u8>>) -> Result<()>,
    {
        let runs = plan_reads(pack_id, blobs, &self.config)?;
        let handle = Handle::pack(pack_id);

        let mut parked: Vec<Option<Result<Vec<u8>>>> = Vec::with_capacity(blobs.len());
        parked.resize_with(blobs.len(), || None);
        let mut next = 0;

        for run in &runs {
            if self.cancel.is_cancelled() {
                return Err(PackreadError::Cancelled);
            }
            debug!(
                "reading {} bytes at offset {} of pack {pack_id} ({} blobs)",
                run.len(),
                run.start,
                run.members.len()
            );

            self.decode_run(pack_id, &handle, blobs, run, &mut parked)?;

            while next < blobs.len() {
                let Some(result) = parked[next].take() else {
                    break;
                };
                handle_blob(&blobs[next].handle, result)?;
                next += 1;
            }
        }

        Ok(())
    }

    /// Read `run` and park a result for each of its members.
    ///
    /// Members whose record fails to verify are decoded again from a fresh
    /// read of the identical range while the retry budget lasts. A range
    /// that cannot be read after retries fails every member still pending.
    fn decode_run(
        &self,
        pack_id: &PackId,
        handle: &Handle,
        blobs: &[Blob],
        run: &ReadRun,
        parked: &mut [Option<Result<Vec<u8>>>],
    ) -> Result<()> {
        let mut attempts = 0usize;
        let mut pending = run.members.clone();
        let mut failures: Vec<(usize, PackreadError)> = Vec::new();

        while !pending.is_empty() {
            let data = match self.load_run(handle, run, &mut attempts) {
                Ok(data) => data,
                Err(_) if self.cancel.is_cancelled() => return Err(PackreadError::Cancelled),
                Err(e) if e.is_retryable() => {
                    warn!(
                        "giving up on {} bytes at offset {} of pack {pack_id}: {e}",
                        run.len(),
                        run.start
                    );
                    // A failed re-read keeps the verification errors already seen.
                    if failures.is_empty() {
                        let source = Arc::new(e);
                        for &idx in &pending {
                            let result = Err(PackreadError::ReadFailed {
                                pack: *pack_id,
                                offset: run.start,
                                length: run.len(),
                                source: Arc::clone(&source),
                            });
                            parked[idx] = Some(self.recover(&blobs[idx], result));
                        }
                    }
                    break;
                }
                Err(e) => {
                    return Err(PackreadError::PermanentRead {
                        pack: *pack_id,
                        source: e,
                    })
                }
            };

            failures.clear();
            for &idx in &pending {
                let blob = &blobs[idx];
                let start = (blob.offset - run.start) as usize;
                let record = &data[start..start + blob.length as usize];
                match self.open_blob(blob, record) {
                    Ok(plaintext) => parked[idx] = Some(Ok(plaintext)),
                    Err(e) => failures.push((idx, e)),
                }
            }
            pending = failures.iter().map(|(idx, _)| *idx).collect();
            if pending.is_empty() || attempts > self.config.retry.max_retries {
                break;
            }
            warn!(
                "{} blobs failed to verify in {} bytes at offset {} of pack {pack_id}, reading again",
                pending.len(),
                run.len(),
                run.start
            );
        }

        for (idx, err) in failures {
            parked[idx] = Some(self.recover(&blobs[idx], Err(err)));
        }
        Ok(())
    }

    /// Read one run, retrying transient failures with the identical range.
    ///
    /// `attempts` counts loads across calls for the same run; retries stop
    /// once it exceeds `retry.max_retries`.
    fn load_run(
        &self,
        handle: &Handle,
        run: &ReadRun,
        attempts: &mut usize,
    ) -> std::result::Result<Vec<u8>, LoadError> {
        let length = usize::try_from(run.len()).map_err(|_| {
            LoadError::permanent(format!("range of {} bytes does not fit in memory", run.len()))
        })?;
        let retry = RetryConfig {
            max_retries: self.config.retry.max_retries.saturating_sub(*attempts),
            ..self.config.retry.clone()
        };
        retry_load(&retry, "pack range read", &self.cancel, || {
            *attempts += 1;
            let mut buf = vec![0u8; length];
            self.loader
                .load(&self.cancel, handle, length, run.start, &mut |rd| {
                    rd.read_exact(&mut buf).map_err(classify_io)
                })?;
            Ok(buf)
        })
    }

    /// Decrypt, decompress and hash-check one record.
    fn open_blob(&self, blob: &Blob, record: &[u8]) -> Result<Vec<u8>> {
        let fail = |reason: VerifyFailure| PackreadError::CiphertextVerification {
            handle: blob.handle,
            reason,
        };

        let plaintext = self.key.open(record).map_err(|_| fail(VerifyFailure::Decrypt))?;
        let plaintext = if blob.is_compressed() {
            let expected = blob.uncompressed_length;
            let decoded = compress::decompress_bounded(&plaintext, expected as usize)
                .map_err(|e| fail(VerifyFailure::Decompress(e.to_string())))?;
            if decoded.len() != expected as usize {
                return Err(fail(VerifyFailure::SizeMismatch {
                    expected,
                    actual: decoded.len(),
                }));
            }
            decoded
        } else {
            plaintext
        };

        let actual = self.key.blob_id(&plaintext);
        if actual != blob.handle.id {
            return Err(fail(VerifyFailure::HashMismatch { actual }));
        }
        Ok(plaintext)
    }

    /// Give the fallback source a chance to replace a failed result.
    fn recover(&self, blob: &Blob, result: Result<Vec<u8>>) -> Result<Vec<u8>> {
        let Some(fallback) = self.fallback else {
            return result;
        };
        let err = match result {
            Ok(plaintext) => return Ok(plaintext),
            Err(e) => e,
        };
        match fallback.load_blob(&blob.handle) {
            Ok(plaintext) => {
                warn!("blob {} recovered from fallback source after: {err}", blob.handle);
                Ok(plaintext)
            }
            Err(fallback_err) => {
                debug!("fallback source failed for blob {}: {fallback_err}", blob.handle);
                Err(err)
            }
        }
    }
}

/// Stream blobs from a pack with the default [`StreamConfig`].
pub fn stream_pack<F>(
    loader: &dyn RangeLoader,
    key: &Key,
    pack_id: &PackId,
    blobs: &[Blob],
    handle_blob: F,
) -> Result<()>
where
    F: FnMut(&BlobHandle, Result<Vec<u8>>) -> Result<()>,
{
    PackStreamer::new(loader, key).stream(pack_id, blobs, handle_blob)
}
