//! Growable byte accumulator used by every component that needs to build up
//! output incrementally: response serialization, chunk-size encoding,
//! [`crate::stream::read_line`] and [`crate::stream::read_all`] scratch space.

use std::str::{self, Utf8Error};

const MIN_GROWTH: usize = 16;

/// A resizable byte container with amortized O(1) append.
///
/// Growth doubles the backing capacity (with a floor of [`MIN_GROWTH`] bytes)
/// whenever a push would overflow it, so a sequence of N pushes touches the
/// allocator O(log N) times rather than once per push.
#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    /// Creates an empty buffer pre-sized for `cap` bytes.
    pub fn with_capacity(cap: usize) -> Self {
        ByteBuffer { data: Vec::with_capacity(cap) }
    }

    /// Empties the buffer without releasing its backing allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Number of bytes currently held.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn ensure_room(&mut self, extra: usize) {
        let needed = self.data.len() + extra;
        if needed > self.data.capacity() {
            let grown = (self.data.capacity() * 2).max(needed).max(MIN_GROWTH);
            self.data.reserve(grown - self.data.len());
        }
    }

    /// Appends a single byte.
    #[inline]
    pub fn push_byte(&mut self, b: u8) {
        self.ensure_room(1);
        self.data.push(b);
    }

    /// Appends `p` in full.
    #[inline]
    pub fn push_slice(&mut self, p: &[u8]) {
        self.ensure_room(p.len());
        self.data.extend_from_slice(p);
    }

    /// Current contents as a byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Current contents decoded as UTF-8. Fails if the accumulated bytes are
    /// not valid UTF-8; callers needing raw bytes should use [`Self::as_slice`].
    pub fn contents(&self) -> Result<&str, Utf8Error> {
        str::from_utf8(&self.data)
    }

    /// Consumes the buffer, returning the owned backing storage.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}
