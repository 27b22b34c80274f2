//! Fixed-size partition of a payload.

use bytes::Bytes;

/// Default chunk size (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// An ordered, contiguous split of a payload into `chunk_size` pieces.
///
/// Chunks share the payload's buffer; slicing never copies.
///
/// # Example
///
/// ```
/// use bridgewire_client::transfer::ChunkSequence;
/// use bytes::Bytes;
///
/// let chunks = ChunkSequence::new(Bytes::from(vec![0u8; 150_000]), 65_536);
/// let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
/// assert_eq!(sizes, vec![65_536, 65_536, 18_928]);
/// ```
#[derive(Debug, Clone)]
pub struct ChunkSequence {
    payload: Bytes,
    chunk_size: usize,
}

impl ChunkSequence {
    /// Split `payload` into chunks of `chunk_size` bytes (the last may be shorter).
    ///
    /// A zero `chunk_size` is treated as one byte.
    pub fn new(payload: Bytes, chunk_size: usize) -> Self {
        Self {
            payload,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of chunks: `ceil(len / chunk_size)`, zero for an empty payload.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len().div_ceil(self.chunk_size)
    }

    /// True when the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Configured chunk size.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Total payload length in bytes.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.payload.len()
    }

    /// Chunk at `index`, or `None` past the end.
    pub fn chunk(&self, index: usize) -> Option<Bytes> {
        let start = index.checked_mul(self.chunk_size)?;
        if start >= self.payload.len() {
            return None;
        }
        let end = (start + self.chunk_size).min(self.payload.len());
        Some(self.payload.slice(start..end))
    }

    /// Iterate chunks in order.
    pub fn iter(&self) -> impl Iterator<Item = Bytes> + '_ {
        (0..self.len()).filter_map(move |i| self.chunk(i))
    }
}
