// Chunk: docs/chunks/piece_table - Piece table storage engine

//! Append-only backing stores for document text.
//!
//! A sequence buffer never rewrites bytes in place: the load-time buffer
//! holds the original file contents, and every insertion appends to the
//! current "add" buffer. Pieces reference `(offset, length)` slices of these
//! buffers, so undo never has to reconstruct text — the bytes are still
//! there.

/// Extra capacity granted to a freshly allocated add buffer beyond the
/// insertion that triggered it.
pub(crate) const ADD_BUFFER_HEADROOM: usize = 0x10000;

/// An append-only byte store owned by the piece table.
///
/// `max_size` is a soft cap: once appending would reach it, the table rolls
/// over to a new add buffer and this one is never written again. The setup
/// buffer is sized exactly to the initial text, which makes it read-only
/// from the first insert onward.
#[derive(Debug)]
pub struct SeqBuffer {
    bytes: Vec<u8>,
    max_size: usize,
}

impl SeqBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(max_size),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True if appending `incoming` more bytes should roll over to a fresh
    /// add buffer instead.
    pub fn would_overflow(&self, incoming: usize) -> bool {
        self.bytes.len() + incoming >= self.max_size
    }

    /// Appends `bytes` and returns the offset at which they begin.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let offset = self.bytes.len();
        self.bytes.extend_from_slice(bytes);
        offset
    }

    /// Returns the `len` bytes starting at `start`.
    ///
    /// Panics if the slice is out of range; pieces are constructed from
    /// append offsets, so a miss here is a corrupted descriptor.
    pub fn slice(&self, start: usize, len: usize) -> &[u8] {
        &self.bytes[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_returns_offsets() {
        let mut buf = SeqBuffer::new(64);
        assert_eq!(buf.append(b"hello"), 0);
        assert_eq!(buf.append(b" world"), 5);
        assert_eq!(buf.len(), 11);
        assert_eq!(buf.slice(0, 11), b"hello world");
        assert_eq!(buf.slice(5, 6), b" world");
    }

    #[test]
    fn test_overflow_check() {
        let mut buf = SeqBuffer::new(8);
        assert!(!buf.would_overflow(7));
        assert!(buf.would_overflow(8));
        buf.append(b"abcd");
        assert!(!buf.would_overflow(3));
        assert!(buf.would_overflow(4));
    }

    #[test]
    fn test_setup_buffer_is_full_by_construction() {
        // A buffer sized exactly to its contents overflows on any append.
        let mut buf = SeqBuffer::new(5);
        buf.append(b"hello");
        assert!(buf.would_overflow(1));
    }
}
