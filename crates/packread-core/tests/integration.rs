use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use packread_core::{load_blob, CachedPacks, PackStreamer, StreamConfig};
use packread_crypto::{load_key_file, Key};
use packread_storage::loader::RangeConsumer;
use packread_storage::{BackendLoader, LocalBackend, RangeLoader};
use packread_types::blob::{Blob, BlobHandle, BlobType, PackedBlob};
use packread_types::cancel::CancelToken;
use packread_types::error::{LoadError, PackreadError};
use packread_types::handle::Handle;
use packread_types::id::PackId;

fn pack_path(repo: &Path, pack_id: &PackId) -> std::path::PathBuf {
    repo.join(Handle::pack(pack_id).storage_key())
}

/// Seal `contents` back to back into a pack file under the `repo` directory.
fn write_pack(repo: &Path, key: &Key, contents: &[(&[u8], bool)]) -> (PackId, Vec<Blob>) {
    let mut bytes = Vec::new();
    let mut blobs = Vec::new();
    for (i, (plaintext, compress)) in contents.iter().enumerate() {
        let blob_type = if i % 2 == 0 { BlobType::Data } else { BlobType::Tree };
        let (stored, uncompressed_length) = if *compress {
            (zstd::bulk::compress(plaintext, 3).unwrap(), plaintext.len() as u32)
        } else {
            (plaintext.to_vec(), 0)
        };
        let record = key.seal_random(&stored).unwrap();
        blobs.push(Blob {
            handle: BlobHandle::new(blob_type, key.blob_id(plaintext)),
            offset: bytes.len() as u64,
            length: record.len() as u32,
            uncompressed_length,
        });
        bytes.extend_from_slice(&record);
    }
    let pack_id = PackId::compute(&bytes);
    let path = pack_path(repo, &pack_id);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, &bytes).unwrap();
    (pack_id, blobs)
}

/// Range loader over a local directory that remembers which packs it read.
struct RecordingLoader {
    inner: BackendLoader<LocalBackend>,
    packs: Mutex<Vec<String>>,
}

impl RecordingLoader {
    fn new(root: &Path) -> Self {
        Self {
            inner: BackendLoader::new(LocalBackend::new(root).unwrap()),
            packs: Mutex::new(Vec::new()),
        }
    }

    fn packs(&self) -> Vec<String> {
        self.packs.lock().unwrap().clone()
    }
}

impl RangeLoader for RecordingLoader {
    fn load(
        &self,
        cancel: &CancelToken,
        handle: &Handle,
        length: usize,
        offset: u64,
        consume: &mut RangeConsumer<'_>,
    ) -> Result<(), LoadError> {
        self.packs.lock().unwrap().push(handle.name.clone());
        self.inner.load(cancel, handle, length, offset, consume)
    }
}

fn fast_config() -> StreamConfig {
    let mut config = StreamConfig::default();
    config.retry.retry_delay_ms = 0;
    config.retry.retry_max_delay_ms = 0;
    config
}

#[test]
fn stream_from_local_repository() {
    let dir = tempfile::tempdir().unwrap();
    let key = Key::generate();

    let big = b"repetitive tree metadata ".repeat(4000);
    let contents: Vec<(&[u8], bool)> = vec![
        (&b"first file chunk"[..], false),
        (&big[..], true),
        (&b""[..], false),
        (&b"last chunk of the pack"[..], true),
    ];
    let (pack_id, blobs) = write_pack(dir.path(), &key, &contents);

    let loader = BackendLoader::new(LocalBackend::new(dir.path()).unwrap());
    let streamer = PackStreamer::new(&loader, &key).with_config(fast_config());
    let request = vec![blobs[3], blobs[0], blobs[2], blobs[1]];
    let mut got = Vec::new();
    streamer
        .stream(&pack_id, &request, |handle, res| {
            got.push((*handle, res?));
            Ok(())
        })
        .unwrap();

    let expected: Vec<(BlobHandle, Vec<u8>)> = [3usize, 0, 2, 1]
        .iter()
        .map(|&i| (blobs[i].handle, contents[i].0.to_vec()))
        .collect();
    assert_eq!(got, expected);
}

#[test]
fn truncated_pack_reports_read_failures() {
    let dir = tempfile::tempdir().unwrap();
    let key = Key::generate();
    let (pack_id, blobs) =
        write_pack(dir.path(), &key, &[(&b"alpha"[..], false), (&b"beta"[..], false)]);

    // Chop the second record in half on disk.
    let path = pack_path(dir.path(), &pack_id);
    let full = std::fs::read(&path).unwrap();
    std::fs::write(&path, &full[..full.len() - blobs[1].length as usize / 2]).unwrap();

    let loader = BackendLoader::new(LocalBackend::new(dir.path()).unwrap());
    let streamer = PackStreamer::new(&loader, &key).with_config(fast_config());
    let mut results = Vec::new();
    streamer
        .stream(&pack_id, &blobs, |_, res| {
            results.push(res);
            Ok(())
        })
        .unwrap();

    assert_eq!(results.len(), 2);
    for res in &results {
        assert!(matches!(res, Err(PackreadError::ReadFailed { .. })));
    }
}

#[test]
fn load_blob_prefers_locally_cached_pack() {
    let repo_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let key = Key::generate();

    let (remote_id, remote_blobs) =
        write_pack(repo_dir.path(), &key, &[(&b"shared chunk"[..], false)]);
    let (other_id, other_blobs) = write_pack(
        repo_dir.path(),
        &key,
        &[(&b"padding"[..], false), (&b"shared chunk"[..], false)],
    );

    // Only the second pack is present in the local cache.
    let cached_path = pack_path(cache_dir.path(), &other_id);
    std::fs::create_dir_all(cached_path.parent().unwrap()).unwrap();
    std::fs::copy(pack_path(repo_dir.path(), &other_id), &cached_path).unwrap();
    let cached = CachedPacks::scan(&LocalBackend::new(cache_dir.path()).unwrap()).unwrap();
    assert_eq!(cached.len(), 1);

    let loader = RecordingLoader::new(repo_dir.path());
    let streamer = PackStreamer::new(&loader, &key).with_config(fast_config());
    let handle = remote_blobs[0].handle;
    assert_eq!(handle, other_blobs[1].handle);

    let candidates = vec![
        PackedBlob {
            blob: remote_blobs[0],
            pack_id: remote_id,
        },
        PackedBlob {
            blob: other_blobs[1],
            pack_id: other_id,
        },
    ];
    let plaintext = load_blob(&streamer, &cached, &handle, &candidates).unwrap();
    assert_eq!(plaintext, b"shared chunk");
    assert_eq!(loader.packs(), vec![other_id.to_hex()]);
}

#[test]
fn key_file_roundtrip_opens_pack() {
    let dir = tempfile::tempdir().unwrap();
    let key = Key::generate();
    let key_path = dir.path().join("key.json");
    std::fs::write(&key_path, key.to_key_file().to_json().unwrap()).unwrap();
    let reloaded = load_key_file(&key_path).unwrap();

    let repo = dir.path().join("repo");
    let (pack_id, blobs) = write_pack(&repo, &key, &[(&b"sealed with the original"[..], false)]);

    let loader = BackendLoader::new(LocalBackend::new(&repo).unwrap());
    let mut plaintexts = HashMap::new();
    packread_core::stream_pack(&loader, &reloaded, &pack_id, &blobs, |handle, res| {
        plaintexts.insert(*handle, res?);
        Ok(())
    })
    .unwrap();
    assert_eq!(plaintexts[&blobs[0].handle], b"sealed with the original");
}
