use std::io::{self, Cursor, Read};

use packread_types::cancel::CancelToken;
use packread_types::error::{LoadError, PackreadError};
use packread_types::handle::Handle;

use crate::retry::classify_io;
use crate::StorageBackend;

/// Callback handed a reader over exactly the requested byte range.
pub type RangeConsumer<'a> = dyn FnMut(&mut dyn Read) -> Result<(), LoadError> + 'a;

/// Offset-based partial reads of backend objects.
///
/// Implementations call `consume` synchronously, at most once per `load`
/// call, and must classify unrecoverable conditions (such as a missing
/// object) as permanent. An error returned by `consume` is passed through
/// unchanged.
pub trait RangeLoader: Send + Sync {
    fn load(
        &self,
        cancel: &CancelToken,
        handle: &Handle,
        length: usize,
        offset: u64,
        consume: &mut RangeConsumer<'_>,
    ) -> Result<(), LoadError>;
}

/// [`RangeLoader`] over a [`StorageBackend`]'s `get_range`.
pub struct BackendLoader<B> {
    backend: B,
}

impl<B: StorageBackend> BackendLoader<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: StorageBackend> RangeLoader for BackendLoader<B> {
    fn load(
        &self,
        cancel: &CancelToken,
        handle: &Handle,
        length: usize,
        offset: u64,
        consume: &mut RangeConsumer<'_>,
    ) -> Result<(), LoadError> {
        if cancel.is_cancelled() {
            return Err(LoadError::permanent(PackreadError::Cancelled));
        }
        let key = handle.storage_key();
        let data = match self.backend.get_range(&key, offset, length as u64) {
            Ok(Some(data)) => data,
            Ok(None) => {
                return Err(LoadError::permanent(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{handle} not found"),
                )))
            }
            Err(PackreadError::Io(e)) => return Err(classify_io(e)),
            Err(e) => return Err(LoadError::permanent(e)),
        };
        tracing::trace!(
            "loaded {} of {length} bytes at offset {offset} from {handle}",
            data.len()
        );
        consume(&mut Cursor::new(data))
    }
}
