//! Chunked reading of a byte source under a size ceiling.
//!
//! The reader pulls fixed-size chunks in order and reassembles them into a
//! single buffer. Progress is reported after every chunk and covers the
//! read phase only (`0.0..=READ_PHASE_CEILING`).

use tracing::debug;

use crate::core::{Chunk, Progress, ProgressObserver};
use crate::error::{IoError, Result, ValidationError};
use crate::io::source::ByteSource;

/// Size of a single read (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Maximum accepted source size (200 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// Reads a [`ByteSource`] in fixed-size chunks.
///
/// # Examples
///
/// ```
/// use docchat::core::NoProgress;
/// use docchat::io::{ChunkedReader, MemorySource};
///
/// # tokio_test_block_on(async {
/// let mut source = MemorySource::new("a.pdf", b"0123456789".to_vec());
/// let reader = ChunkedReader::new(1024).with_chunk_size(4);
/// let bytes = reader.read_all(&mut source, &NoProgress).await.unwrap();
/// assert_eq!(bytes, b"0123456789");
/// assert_eq!(source.reads(), 3);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedReader {
    chunk_size: usize,
    max_size: u64,
}

impl Default for ChunkedReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl ChunkedReader {
    /// Creates a reader that rejects sources larger than `max_size` bytes.
    #[must_use]
    pub const fn new(max_size: u64) -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_size,
        }
    }

    /// Sets the chunk size (at least one byte).
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = if chunk_size == 0 { 1 } else { chunk_size };
        self
    }

    /// Returns the chunk size in bytes.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the size ceiling in bytes.
    #[must_use]
    pub const fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Number of chunks needed for a source of `size` bytes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn chunk_count(&self, size: u64) -> usize {
        size.div_ceil(self.chunk_size as u64) as usize
    }

    /// Checks the declared size against the ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooLarge`] if `size` exceeds the ceiling.
    pub const fn check_size(&self, size: u64) -> std::result::Result<(), ValidationError> {
        if size > self.max_size {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_size,
            });
        }
        Ok(())
    }

    /// Reads chunk `index` of the source.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ReadFailed`] if the source fails and
    /// [`IoError::ShortRead`] if it returns fewer bytes than expected.
    pub async fn read_chunk(&self, source: &mut dyn ByteSource, index: usize) -> Result<Chunk> {
        let size = source.size();
        let offset = index as u64 * self.chunk_size as u64;
        let remaining = size.saturating_sub(offset);
        #[allow(clippy::cast_possible_truncation)]
        let expected = remaining.min(self.chunk_size as u64) as usize;

        let bytes = source
            .read_chunk(offset, expected)
            .await
            .map_err(|e| IoError::ReadFailed {
                path: source.name().to_string(),
                reason: e.to_string(),
            })?;

        if bytes.len() != expected {
            return Err(IoError::ShortRead {
                offset,
                expected,
                actual: bytes.len(),
            }
            .into());
        }

        Ok(Chunk::new(index, offset, bytes))
    }

    /// Reads the whole source into memory.
    ///
    /// The size ceiling is enforced before the first read. On any read
    /// failure the partial buffer is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooLarge`] for oversize sources and an
    /// [`IoError`] if a chunk read fails.
    pub async fn read_all(
        &self,
        source: &mut dyn ByteSource,
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<u8>> {
        let size = source.size();
        self.check_size(size)?;

        let capacity = usize::try_from(size).map_err(|_| ValidationError::TooLarge {
            size,
            max: self.max_size,
        })?;
        let total = self.chunk_count(size);
        let mut buffer = Vec::with_capacity(capacity);
        let mut previous: Option<(usize, u64)> = None;

        for index in 0..total {
            let chunk = self.read_chunk(source, index).await?;
            if let Some((prev_index, prev_end)) = previous {
                debug_assert!(chunk.index == prev_index + 1 && chunk.offset == prev_end);
            }
            previous = Some((chunk.index, chunk.byte_range().end));
            buffer.extend_from_slice(&chunk.bytes);

            debug!(
                source = source.name(),
                chunk = index + 1,
                total,
                bytes = chunk.len(),
                "read chunk"
            );
            observer.on_progress(Progress::reading(index + 1, total));
        }

        Ok(buffer)
    }
}

/// Concatenates chunks that were read in order.
///
/// # Errors
///
/// Returns [`IoError::Generic`] if the chunks are not contiguous and in
/// index order starting at offset zero.
pub fn reassemble(chunks: &[Chunk]) -> Result<Vec<u8>> {
    let total: usize = chunks.iter().map(Chunk::len).sum();
    let mut buffer = Vec::with_capacity(total);

    for (position, chunk) in chunks.iter().enumerate() {
        let in_order = match position.checked_sub(1) {
            Some(prev) => chunks[prev].is_followed_by(chunk),
            None => chunk.index == 0 && chunk.offset == 0,
        };
        if !in_order {
            return Err(IoError::Generic(format!(
                "chunk {} at offset {} is out of order",
                chunk.index, chunk.offset
            ))
            .into());
        }
        buffer.extend_from_slice(&chunk.bytes);
    }

    Ok(buffer)
}
