//! # Wire Buffer
//!
//! Byte region carrying one message's on-the-wire form.
//!
//! `len()` is the number of bytes still *unconsumed from the front*, not the
//! capacity. Decoding consumes a prefix; whatever it leaves stays readable for
//! later stages.
//!
//! ## Alignment
//! The surrounding system expects the start of a freshly written buffer to sit
//! on a 4-byte boundary. Every constructor allocates real storage, and writing
//! into an empty buffer rewinds to the start of that storage, so the start
//! address comes straight from the allocator.

use crate::error::{constants, invariant_violation};

/// Required alignment of the buffer start on the outgoing path
pub const WIRE_ALIGNMENT: usize = 4;

/// Smallest backing allocation
pub const MIN_CAPACITY: usize = 64;

/// Typical DHT message size; used by `WireBuffer::new`
pub const DEFAULT_CAPACITY: usize = 1536;

#[derive(Debug)]
pub struct WireBuffer {
    storage: Vec<u8>,
    // Number of bytes already consumed from the front of `storage`
    offset: usize,
}

impl Default for WireBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl WireBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Vec::with_capacity(capacity.max(MIN_CAPACITY)),
            offset: 0,
        }
    }

    /// Buffer holding a copy of `bytes`, e.g. a datagram just received.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buffer = Self::with_capacity(bytes.len());
        buffer.storage.extend_from_slice(bytes);
        buffer
    }

    /// Unconsumed byte count
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len() - self.offset
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// The unconsumed bytes
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.offset..]
    }

    /// Drop `count` bytes from the front.
    ///
    /// # Panics
    /// If `count` exceeds `len()`.
    pub fn consume(&mut self, count: usize) {
        if count > self.len() {
            invariant_violation(constants::ERR_CONSUME_PAST_END);
        }
        self.offset += count;
    }

    /// Discard all content and rewind to the start of the allocation.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.offset = 0;
    }

    /// Append bytes after the unconsumed content.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        if self.is_empty() {
            self.clear();
        }
        self.storage.extend_from_slice(bytes);
    }

    /// Writable storage for an encoder, positioned at the start of the
    /// allocation. Only valid on an empty buffer.
    pub(crate) fn writer(&mut self) -> &mut Vec<u8> {
        if !self.is_empty() {
            invariant_violation(constants::ERR_BUFFER_NOT_EMPTY);
        }
        self.clear();
        &mut self.storage
    }

    /// Address of the first unconsumed byte
    #[inline]
    pub fn start_address(&self) -> usize {
        self.as_slice().as_ptr() as usize
    }

    /// Whether the first unconsumed byte sits on a `WIRE_ALIGNMENT` boundary.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.start_address() % WIRE_ALIGNMENT == 0
    }

    /// Copy of the unconsumed bytes
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }
}

// A derived clone would drop an empty buffer's allocation.
impl Clone for WireBuffer {
    fn clone(&self) -> Self {
        Self::from_slice(self.as_slice())
    }
}

impl From<&[u8]> for WireBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl AsRef<[u8]> for WireBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty_and_aligned() {
        let buffer = WireBuffer::new();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= DEFAULT_CAPACITY);
        assert!(buffer.is_aligned());

        let tiny = WireBuffer::with_capacity(0);
        assert!(tiny.capacity() >= MIN_CAPACITY);
        assert!(tiny.is_aligned());
    }

    #[test]
    fn test_clone_of_empty_buffer_is_aligned() {
        let buffer = WireBuffer::new().clone();
        assert!(buffer.capacity() >= MIN_CAPACITY);
        assert!(buffer.is_aligned());
    }

    #[test]
    fn test_consume_moves_cursor() {
        let mut buffer = WireBuffer::from_slice(b"hello world");
        buffer.consume(6);
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.as_slice(), b"world");
        buffer.consume(5);
        assert!(buffer.is_empty());
    }

    #[test]
    #[should_panic(expected = "cannot consume")]
    fn test_consume_past_end_panics() {
        let mut buffer = WireBuffer::from_slice(b"abc");
        buffer.consume(4);
    }

    #[test]
    fn test_drained_buffer_rewinds_on_write() {
        let mut buffer = WireBuffer::from_slice(b"abcdefg");
        buffer.consume(7);
        buffer.writer().extend_from_slice(b"xyz");
        assert_eq!(buffer.as_slice(), b"xyz");
        assert!(buffer.is_aligned());
    }

    #[test]
    fn test_extend_keeps_unconsumed_content() {
        let mut buffer = WireBuffer::from_slice(b"abc");
        buffer.consume(1);
        buffer.extend_from_slice(b"de");
        assert_eq!(buffer.as_slice(), b"bcde");
    }

    #[test]
    #[should_panic(expected = "must be empty")]
    fn test_writer_on_non_empty_buffer_panics() {
        let mut buffer = WireBuffer::from_slice(b"x");
        let _ = buffer.writer();
    }
}
