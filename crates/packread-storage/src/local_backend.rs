use std::fs;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use packread_types::error::{PackreadError, Result};

use crate::StorageBackend;

/// Read-only view of a repository or pack cache directory on the local
/// filesystem.
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Open the directory at `root`. A missing directory is not an error;
    /// it lists as empty and every range read reports the object missing.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        // Keys are derived by stripping the root, so resolve symlinks up front.
        let root = if root.exists() {
            fs::canonicalize(root)?
        } else {
            root.to_path_buf()
        };
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a `/`-separated key to a path under the root. Every segment must
    /// be a plain file or directory name.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let unsafe_key = |why: &str| {
            PackreadError::InvalidFormat(format!("unsafe storage key '{key}': {why}"))
        };
        if key.is_empty() {
            return Err(unsafe_key("empty"));
        }
        if key.contains('\\') {
            return Err(unsafe_key("contains backslash"));
        }
        let mut path = self.root.clone();
        for segment in key.split('/') {
            match segment {
                "" => return Err(unsafe_key("empty segment")),
                "." | ".." => return Err(unsafe_key("relative segment")),
                name => path.push(name),
            }
        }
        Ok(path)
    }

    fn collect_keys(&self, dir: &Path, keys: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.collect_keys(&path, keys)?;
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&self.root) else {
                continue;
            };
            let segments: Vec<_> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            keys.push(segments.join("/"));
        }
        Ok(())
    }
}

impl StorageBackend for LocalBackend {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.trim_end_matches('/');
        let dir = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.resolve(prefix)?
        };
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        }
        let mut keys = Vec::new();
        self.collect_keys(&dir, &mut keys)?;
        keys.sort();
        Ok(keys)
    }

    fn get_range(&self, key: &str, offset: u64, length: u64) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(key)?;
        let mut file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(usize::try_from(length).unwrap_or(0).min(1 << 20));
        file.take(length).read_to_end(&mut buf)?;
        Ok(Some(buf))
    }
}
