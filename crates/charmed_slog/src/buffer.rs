//! Pooled scratch buffers.
//!
//! Every `handle` call formats into a [`Buffer`] taken from a process-wide
//! free-list and gives it back when the line has been written. Buffers that
//! grew unusually large are dropped instead of pooled so one huge record does
//! not pin memory for the rest of the process.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::trace;

/// Buffers with more capacity than this are not returned to the pool.
const MAX_POOLED_CAPACITY: usize = 16 << 10;
const INITIAL_CAPACITY: usize = 1024;
const MAX_POOLED_BUFFERS: usize = 64;

/// A bounded free-list of reusable values.
pub(crate) struct FreeList<T> {
    items: Mutex<Vec<T>>,
    limit: usize,
}

impl<T> FreeList<T> {
    pub(crate) const fn new(limit: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            limit,
        }
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }

    /// Returns `item` to the list. Callers must reset it first.
    pub(crate) fn give(&self, item: T) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.len() < self.limit {
            items.push(item);
        }
    }
}

static BUFFERS: FreeList<Vec<u8>> = FreeList::new(MAX_POOLED_BUFFERS);

/// Growable byte buffer with the append helpers the encoder needs.
#[derive(Debug, Default)]
pub(crate) struct Buffer(Vec<u8>);

impl Buffer {
    /// Takes an empty buffer from the pool, allocating if the pool is empty.
    pub(crate) fn new() -> Self {
        Self(
            BUFFERS
                .take()
                .unwrap_or_else(|| Vec::with_capacity(INITIAL_CAPACITY)),
        )
    }

    /// Wraps an existing vector; the buffer keeps its contents.
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Clears the buffer and returns it to the pool.
    pub(crate) fn free(mut self) {
        if self.0.capacity() > MAX_POOLED_CAPACITY {
            trace!(
                buffer.capacity = self.0.capacity(),
                "dropping oversized scratch buffer"
            );
            return;
        }
        self.0.clear();
        BUFFERS.give(self.0);
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub(crate) fn write_byte(&mut self, b: u8) {
        self.0.push(b);
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    pub(crate) fn write_str(&mut self, s: &str) {
        self.0.extend_from_slice(s.as_bytes());
    }

    pub(crate) fn write_u64(&mut self, mut n: u64) {
        let mut digits = [0u8; 20];
        let mut start = digits.len();
        loop {
            start -= 1;
            digits[start] = b'0' + (n % 10) as u8;
            n /= 10;
            if n == 0 {
                break;
            }
        }
        self.0.extend_from_slice(&digits[start..]);
    }

    pub(crate) fn write_i64(&mut self, n: i64) {
        if n < 0 {
            self.write_byte(b'-');
        }
        self.write_u64(n.unsigned_abs());
    }

    /// Writes `n` in decimal, zero-padded to at least `width` digits.
    pub(crate) fn write_pos_int_width(&mut self, mut n: u32, mut width: usize) {
        let mut digits = [0u8; 20];
        let mut pos = digits.len() - 1;
        while n >= 10 || width > 1 {
            width = width.saturating_sub(1);
            digits[pos] = b'0' + (n % 10) as u8;
            pos -= 1;
            n /= 10;
        }
        digits[pos] = b'0' + n as u8;
        self.0.extend_from_slice(&digits[pos..]);
    }

    /// Runs a [`fmt::Write`] renderer against the buffer.
    ///
    /// Writes to a `Buffer` cannot fail, so an error can only come from the
    /// renderer itself, such as a user `Debug` impl. Whatever it wrote before
    /// failing is kept.
    pub(crate) fn render(&mut self, render: impl FnOnce(&mut Self) -> fmt::Result) {
        if render(self).is_err() {
            trace!("renderer failed after a partial write");
        }
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}
