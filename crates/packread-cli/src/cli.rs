use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use packread_types::blob::{Blob, BlobHandle, BlobType};
use packread_types::id::BlobId;

#[derive(Parser)]
#[command(
    name = "packread",
    version,
    about = "Stream and verify blobs from encrypted pack files",
    after_help = "\
Configuration file lookup order:
  1. --config <path>             (explicit flag)
  2. $PACKREAD_CONFIG            (environment variable)
  3. built-in defaults

Blob specs have the form TYPE:ID:OFFSET:LENGTH[:UNCOMPRESSED_LENGTH]
where TYPE is `data` or `tree` and ID is the 64-character hex content id."
)]
pub(crate) struct Cli {
    /// Path to a stream configuration file (overrides PACKREAD_CONFIG)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Read blobs from one pack, verifying each against its content id
    Stream {
        /// Repository directory
        #[arg(short = 'R', long)]
        repo: PathBuf,

        /// JSON key file
        #[arg(short, long)]
        key: PathBuf,

        /// Pack id (hex)
        #[arg(short, long)]
        pack: String,

        /// Blob to read; repeat for several, output follows this order
        #[arg(short, long = "blob", required = true)]
        blobs: Vec<BlobSpec>,

        /// Write each plaintext to <DIR>/<type>-<id> instead of printing a summary
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Order candidate packs so locally cached ones come first
    Sort {
        /// Local pack cache directory
        #[arg(long)]
        cache: PathBuf,

        /// Candidate pack id (hex); repeat for several
        #[arg(long = "candidate", required = true)]
        candidates: Vec<String>,
    },
}

/// A blob location given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlobSpec(pub Blob);

impl FromStr for BlobSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if !(4..=5).contains(&parts.len()) {
            return Err(format!(
                "expected TYPE:ID:OFFSET:LENGTH[:UNCOMPRESSED_LENGTH], got '{s}'"
            ));
        }
        let blob_type = match parts[0] {
            "data" => BlobType::Data,
            "tree" => BlobType::Tree,
            other => return Err(format!("unknown blob type '{other}'")),
        };
        let id = BlobId::from_hex(parts[1]).map_err(|e| e.to_string())?;
        let offset = parts[2]
            .parse::<u64>()
            .map_err(|e| format!("invalid offset '{}': {e}", parts[2]))?;
        let length = parts[3]
            .parse::<u32>()
            .map_err(|e| format!("invalid length '{}': {e}", parts[3]))?;
        let uncompressed_length = match parts.get(4) {
            Some(v) => v
                .parse::<u32>()
                .map_err(|e| format!("invalid uncompressed length '{v}': {e}"))?,
            None => 0,
        };
        Ok(BlobSpec(Blob {
            handle: BlobHandle::new(blob_type, id),
            offset,
            length,
            uncompressed_length,
        }))
    }
}
