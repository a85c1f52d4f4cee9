use std::io::Read;

use packread_types::error::{PackreadError, Result};

/// Decode a raw zstd frame, reading at most `limit + 1` bytes of output.
///
/// The extra byte lets callers detect a frame that decodes to more than
/// the recorded size without materializing an unbounded buffer.
pub fn decompress_bounded(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut decoder = zstd::stream::Decoder::new(std::io::Cursor::new(data))
        .map_err(|e| PackreadError::InvalidFormat(format!("zstd init: {e}")))?;
    let mut output = Vec::with_capacity(limit);
    decoder
        .by_ref()
        .take(limit as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|e| PackreadError::InvalidFormat(format!("zstd: {e}")))?;
    Ok(output)
}
