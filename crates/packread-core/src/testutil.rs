use std::collections::HashMap;
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use packread_crypto::Key;
use packread_storage::loader::RangeConsumer;
use packread_storage::RangeLoader;
use packread_types::blob::{Blob, BlobHandle, BlobType, NONCE_LEN};
use packread_types::cancel::CancelToken;
use packread_types::error::{LoadError, PackreadError};
use packread_types::handle::Handle;
use packread_types::id::PackId;

use crate::config::StreamConfig;

pub fn test_key() -> Key {
    Key::new(&[0x11; 32], &[0x22; 32])
}

/// Default stream config without retry backoff sleeps.
pub fn fast_config() -> StreamConfig {
    let mut config = StreamConfig::default();
    config.retry.retry_delay_ms = 0;
    config.retry.retry_max_delay_ms = 0;
    config
}

pub fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    buf
}

/// Write a repository file under `root` at a `/`-separated storage key.
pub fn write_object(root: &Path, key: &str, data: &[u8]) {
    let path = root.join(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

/// A pack built in memory, with the plaintext of each blob kept for checks.
pub struct TestPack {
    pub id: PackId,
    pub bytes: Vec<u8>,
    pub blobs: Vec<Blob>,
    pub plaintexts: Vec<Vec<u8>>,
}

impl TestPack {
    /// Seal one blob per entry of `sizes`, back to back. Nonces are fixed
    /// (last byte = position) so packs are reproducible. With `compress` set,
    /// plaintexts are repetitive and stored as raw zstd frames.
    pub fn build(key: &Key, sizes: &[usize], compress: bool) -> Self {
        let mut bytes = Vec::new();
        let mut blobs = Vec::with_capacity(sizes.len());
        let mut plaintexts = Vec::with_capacity(sizes.len());

        for (i, &size) in sizes.iter().enumerate() {
            let plaintext = if compress {
                let pattern = random_bytes(900 + i as u64, 16);
                pattern.iter().copied().cycle().take(size).collect()
            } else {
                random_bytes(800 + i as u64, size)
            };
            let id = key.blob_id(&plaintext);
            let (stored, uncompressed_length) = if compress {
                let frame = zstd::bulk::compress(&plaintext, 3).unwrap();
                (frame, plaintext.len() as u32)
            } else {
                (plaintext.clone(), 0)
            };

            let mut nonce = [0u8; NONCE_LEN];
            nonce[NONCE_LEN - 1] = i as u8;
            let record = key.seal(&nonce, &stored).unwrap();

            blobs.push(Blob {
                handle: BlobHandle::new(BlobType::Data, id),
                offset: bytes.len() as u64,
                length: record.len() as u32,
                uncompressed_length,
            });
            bytes.extend_from_slice(&record);
            plaintexts.push(plaintext);
        }

        Self {
            id: PackId::compute(&bytes),
            bytes,
            blobs,
            plaintexts,
        }
    }
}

/// In-memory [`RangeLoader`] that records every request and can inject
/// short reads and failures.
pub struct MemoryLoader {
    packs: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<(String, u64, usize)>>,
    short_loads: AtomicUsize,
    transient_failures: AtomicUsize,
    corrupt_loads: AtomicUsize,
    permanent_after: AtomicUsize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self {
            packs: HashMap::new(),
            requests: Mutex::new(Vec::new()),
            short_loads: AtomicUsize::new(0),
            transient_failures: AtomicUsize::new(0),
            corrupt_loads: AtomicUsize::new(0),
            permanent_after: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn with_pack(mut self, pack_id: &PackId, bytes: Vec<u8>) -> Self {
        self.packs.insert(pack_id.to_hex(), bytes);
        self
    }

    /// Hand out truncated data for the next `n` loads.
    pub fn short_next(&self, n: usize) {
        self.short_loads.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` loads with a retryable error.
    pub fn fail_next_transient(&self, n: usize) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    /// Flip a byte near the start of the data served by the next `n` loads.
    pub fn corrupt_next(&self, n: usize) {
        self.corrupt_loads.store(n, Ordering::SeqCst);
    }

    /// Fail every load with a non-retryable error.
    pub fn fail_permanently(&self) {
        self.fail_permanently_after(0);
    }

    /// Serve `n` more loads normally, then fail every later one with a
    /// non-retryable error.
    pub fn fail_permanently_after(&self, n: usize) {
        let served = self.calls();
        self.permanent_after.store(served + n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// `(pack name, offset, length)` of every load so far.
    pub fn requests(&self) -> Vec<(String, u64, usize)> {
        self.requests.lock().unwrap().clone()
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl RangeLoader for MemoryLoader {
    fn load(
        &self,
        cancel: &CancelToken,
        handle: &Handle,
        length: usize,
        offset: u64,
        consume: &mut RangeConsumer<'_>,
    ) -> Result<(), LoadError> {
        let previous = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((handle.name.clone(), offset, length));
            requests.len() - 1
        };

        if cancel.is_cancelled() {
            return Err(LoadError::permanent(PackreadError::Cancelled));
        }
        if previous >= self.permanent_after.load(Ordering::SeqCst) {
            return Err(LoadError::permanent(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected permanent failure",
            )));
        }
        if Self::take_one(&self.transient_failures) {
            return Err(LoadError::transient(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "injected transient failure",
            )));
        }
        let Some(pack) = self.packs.get(&handle.name) else {
            return Err(LoadError::permanent(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{handle} not found"),
            )));
        };

        let start = (offset as usize).min(pack.len());
        let mut end = start.saturating_add(length).min(pack.len());
        if Self::take_one(&self.short_loads) {
            end = start + (end - start) / 2;
        }
        let mut served = pack[start..end].to_vec();
        if Self::take_one(&self.corrupt_loads) {
            if let Some(byte) = served.get_mut(20) {
                *byte ^= 0x01;
            }
        }
        consume(&mut Cursor::new(served))
    }
}
