//! Reading blobs out of encrypted, content-addressed pack files.
//!
//! [`PackStreamer`] turns a list of blob locations into a few coalesced
//! range reads, verifies every record and delivers plaintexts in request
//! order. [`sort_cached_packs_first`] and [`load_blob`] pick between
//! packs that hold the same blob.

pub mod cache;
pub mod compress;
pub mod config;
pub mod load;
pub mod plan;
pub mod sort;
pub mod stream;

#[cfg(test)]
mod testutil;

pub use cache::{CachedPacks, PackCache};
pub use config::{load_config, StreamConfig};
pub use load::load_blob;
pub use sort::sort_cached_packs_first;
pub use stream::{stream_pack, BlobSource, PackStreamer};
