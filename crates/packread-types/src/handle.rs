use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::PackId;

/// Kind of repository object a [`Handle`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileType {
    Pack,
    Index,
    Snapshot,
}

impl FileType {
    fn dir(&self) -> &'static str {
        match self {
            FileType::Pack => "packs",
            FileType::Index => "index",
            FileType::Snapshot => "snapshots",
        }
    }
}

/// Reference to a named backend object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub file_type: FileType,
    pub name: String,
}

impl Handle {
    pub fn new(file_type: FileType, name: impl Into<String>) -> Self {
        Self {
            file_type,
            name: name.into(),
        }
    }

    /// Handle of the pack object named by `pack_id`.
    pub fn pack(pack_id: &PackId) -> Self {
        Self::new(FileType::Pack, pack_id.to_hex())
    }

    /// Storage key for this object. Packs are sharded by the first byte of
    /// their name: `packs/<shard>/<name>`.
    pub fn storage_key(&self) -> String {
        match self.file_type {
            FileType::Pack => {
                let shard = self.name.get(..2).unwrap_or(&self.name);
                format!("packs/{shard}/{}", self.name)
            }
            other => format!("{}/{}", other.dir(), self.name),
        }
    }

    /// Inverse of [`Handle::storage_key`]. Returns `None` for keys outside
    /// the known object directories.
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let mut parts = key.split('/');
        let dir = parts.next()?;
        let file_type = match dir {
            "packs" => FileType::Pack,
            "index" => FileType::Index,
            "snapshots" => FileType::Snapshot,
            _ => return None,
        };
        if file_type == FileType::Pack {
            let shard = parts.next()?;
            let name = parts.next()?;
            if parts.next().is_some() || name.is_empty() || !name.starts_with(shard) {
                return None;
            }
            return Some(Self::new(file_type, name));
        }
        let name = parts.next()?;
        if parts.next().is_some() || name.is_empty() {
            return None;
        }
        Some(Self::new(file_type, name))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{:?}/{}>", self.file_type, self.name)
    }
}
