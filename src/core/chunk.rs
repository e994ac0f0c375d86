//! Byte chunks produced while reading a document source.
//!
//! A chunk is a contiguous slice of the source identified by its sequential
//! index and byte offset. Chunks are reassembled strictly in index order.

use std::ops::Range;

/// A contiguous range of bytes read from a source.
///
/// # Examples
///
/// ```
/// use docchat::core::Chunk;
///
/// let chunk = Chunk::new(0, 0, b"%PDF-1.7".to_vec());
/// assert_eq!(chunk.len(), 8);
/// assert_eq!(chunk.byte_range(), 0..8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Sequential index within the source (0-based).
    pub index: usize,

    /// Byte offset of the first byte in the source.
    pub offset: u64,

    /// Chunk content.
    pub bytes: Vec<u8>,
}

impl Chunk {
    /// Creates a new chunk.
    #[must_use]
    pub const fn new(index: usize, offset: u64, bytes: Vec<u8>) -> Self {
        Self {
            index,
            offset,
            bytes,
        }
    }

    /// Returns the number of bytes in the chunk.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the chunk holds no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte range covered in the source.
    #[must_use]
    pub const fn byte_range(&self) -> Range<u64> {
        self.offset..self.offset + self.bytes.len() as u64
    }

    /// Returns true if `next` starts exactly where this chunk ends.
    #[must_use]
    pub const fn is_followed_by(&self, next: &Self) -> bool {
        next.index == self.index + 1 && next.offset == self.byte_range().end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_range() {
        let chunk = Chunk::new(2, 2048, vec![0; 100]);
        assert_eq!(chunk.byte_range(), 2048..2148);
        assert_eq!(chunk.len(), 100);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_chunk_contiguity() {
        let first = Chunk::new(0, 0, vec![1, 2, 3]);
        let second = Chunk::new(1, 3, vec![4]);
        let gap = Chunk::new(1, 4, vec![5]);
        assert!(first.is_followed_by(&second));
        assert!(!first.is_followed_by(&gap));
        assert!(!second.is_followed_by(&first));
    }

    #[test]
    fn test_empty_chunk() {
        let chunk = Chunk::new(0, 10, Vec::new());
        assert!(chunk.is_empty());
        assert_eq!(chunk.byte_range(), 10..10);
    }
}
