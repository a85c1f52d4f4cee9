use std::path::Path;

use packread_core::{PackStreamer, StreamConfig};
use packread_crypto::load_key_file;
use packread_storage::{BackendLoader, LocalBackend};
use packread_types::blob::Blob;
use packread_types::id::PackId;

/// Stream the requested blobs, printing one line per blob or writing each
/// plaintext under `out`. Returns the number of blobs that failed.
pub(crate) fn run_stream(
    config: &StreamConfig,
    repo: &Path,
    key_path: &Path,
    pack: &str,
    blobs: &[Blob],
    out: Option<&Path>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let key = load_key_file(key_path)?;
    let pack_id = PackId::from_hex(pack)?;
    let backend = LocalBackend::new(repo)?;
    let loader = BackendLoader::new(backend);
    let streamer = PackStreamer::new(&loader, &key).with_config(config.clone());

    if let Some(dir) = out {
        std::fs::create_dir_all(dir)?;
    }

    let mut failed = 0usize;
    streamer.stream(&pack_id, blobs, |handle, result| {
        match result {
            Ok(plaintext) => match out {
                Some(dir) => {
                    let path = dir.join(format!("{}-{}", handle.blob_type, handle.id.to_hex()));
                    std::fs::write(&path, &plaintext)?;
                    tracing::info!("wrote {} bytes to {}", plaintext.len(), path.display());
                }
                None => println!("{handle}\t{} bytes", plaintext.len()),
            },
            Err(e) => {
                failed += 1;
                eprintln!("{handle}\tERROR: {e}");
            }
        }
        Ok(())
    })?;

    Ok(failed)
}
