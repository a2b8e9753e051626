use std::ptr;

/// Fixed-layout record describing one producer-owned byte buffer.
///
/// Handed across the boundary by address. The consumer may read `length`
/// bytes starting at `data` until it passes the same address back to
/// release; after that both the record and the buffer are gone.
/// ABI-stable across languages: `{ size_t length; const uint8_t *data; }`.
#[repr(C)]
#[derive(Debug)]
pub struct BufferHandle {
    /// Exact byte count of the payload.
    pub length: usize,
    /// First payload byte, or null when `length == 0`.
    pub data: *const u8,
}

impl BufferHandle {
    pub(crate) fn new(length: usize, data: *const u8) -> Self {
        Self { length, data }
    }

    /// The "resource not available" record.
    pub(crate) fn empty() -> Self {
        Self::new(0, ptr::null())
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Borrow the described bytes.
    ///
    /// Returns `None` when a non-zero length is paired with a null `data`
    /// pointer, which no well-behaved producer hands out.
    ///
    /// # Safety
    /// The handle must still be registered with the producer that issued it,
    /// and the returned slice must be dropped before the handle is released.
    pub unsafe fn bytes(&self) -> Option<&[u8]> {
        if self.length == 0 {
            return Some(&[]);
        }
        if self.data.is_null() {
            return None;
        }
        Some(std::slice::from_raw_parts(self.data, self.length))
    }
}
