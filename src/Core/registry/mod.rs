use crate::Core::error::BridgeError;
use crate::Core::handle::BufferHandle;
use std::collections::{HashMap, VecDeque};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;
mod debug;
mod getters;

// Use parking_lot's Mutex for better performance
use parking_lot::Mutex;

/// Released records kept allocated before their memory goes back to the
/// allocator. While a record sits here its address cannot be issued to a
/// new handle, so a stale release of it is reported instead of hitting
/// whichever handle would have reused the address.
pub const RETIRED_RECORDS: usize = 256;

/// The `BufferHandle` the consumer sees, leaked out of its box so the
/// address stays put while the map rehashes.
struct Record(NonNull<BufferHandle>);

impl Record {
    fn new(record: BufferHandle) -> Self {
        Self(NonNull::from(Box::leak(Box::new(record))))
    }

    fn address(&self) -> usize {
        self.0.as_ptr() as usize
    }

    /// Overwrite with the "not available" record once the payload is gone,
    /// so a late read sees `length == 0` rather than a dangling pointer.
    fn clear(&mut self) {
        // SAFETY: the record is ours and still allocated.
        unsafe { self.0.as_ptr().write(BufferHandle::empty()) }
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        // SAFETY: produced by `Box::leak` in `new`; only freed here.
        unsafe { drop(Box::from_raw(self.0.as_ptr())) }
    }
}

/// Payload bytes, leaked for the same reason as `Record`.
struct Payload(NonNull<[u8]>);

impl Payload {
    fn new(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        Some(Self(NonNull::from(Box::leak(bytes.into_boxed_slice()))))
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn as_ptr(&self) -> *const u8 {
        self.0.as_ptr() as *mut u8 as *const u8
    }
}

impl Drop for Payload {
    fn drop(&mut self) {
        // SAFETY: produced by `Box::leak` in `new`; only freed here.
        unsafe { drop(Box::from_raw(self.0.as_ptr())) }
    }
}

// Both wrappers exclusively own their boxes; consumers only ever read
// through the addresses handed out.
unsafe impl Send for Record {}
unsafe impl Send for Payload {}

/// One outstanding handle together with the payload it describes.
struct Allocation {
    record: Record,
    payload: Option<Payload>,
    token: u64,
    identifier: Box<str>,
}

impl Allocation {
    fn new(payload: Vec<u8>, token: u64, identifier: &str) -> Self {
        let payload = Payload::new(payload);
        let record = match &payload {
            Some(bytes) => BufferHandle::new(bytes.len(), bytes.as_ptr()),
            None => BufferHandle::empty(),
        };

        Self {
            record: Record::new(record),
            payload,
            token,
            identifier: identifier.into(),
        }
    }

    // Taken from our own copy of the payload, never from the record the
    // consumer can see.
    fn length(&self) -> usize {
        self.payload.as_ref().map_or(0, Payload::len)
    }
}

/// Summary of a handle that left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleasedHandle {
    pub token: u64,
    pub length: usize,
}

struct Slots {
    live: HashMap<usize, Allocation>,
    retired: VecDeque<Record>,
}

impl Slots {
    /// Park a released record, handing back the oldest one once full.
    fn retire(&mut self, mut record: Record) -> Option<Record> {
        record.clear();
        let evicted = if self.retired.len() == RETIRED_RECORDS {
            self.retired.pop_front()
        } else {
            None
        };
        self.retired.push_back(record);
        evicted
    }
}

/// Producer-side record of every handle issued and not yet released.
///
/// Keyed by the address of the `BufferHandle` record, which is what the
/// consumer passes back. Each entry also carries a monotonically increasing
/// token so log lines can tell reissued addresses apart.
///
/// Outside the crate only the read-only views in `getters` are reachable;
/// entries come and go through `Producer::load_resource` and
/// `Producer::release`.
pub struct HandleRegistry {
    slots: Mutex<Slots>,
    next_token: AtomicU64,
}

impl HandleRegistry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                live: HashMap::new(),
                retired: VecDeque::with_capacity(RETIRED_RECORDS),
            }),
            next_token: AtomicU64::new(1),
        }
    }

    /// Take ownership of `payload` and register a handle describing it.
    ///
    /// An empty payload is registered too, with a null `data` pointer.
    pub(crate) fn insert(&self, payload: Vec<u8>, identifier: &str) -> (NonNull<BufferHandle>, u64) {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let allocation = Allocation::new(payload, token, identifier);
        let handle = allocation.record.0;

        self.slots.lock().live.insert(allocation.record.address(), allocation);
        (handle, token)
    }

    /// Deregister `handle` and free its buffer.
    ///
    /// Unknown addresses are left untouched and reported as
    /// `DoubleReleaseOrForeignHandle`; nothing is ever freed twice.
    pub(crate) fn remove(&self, handle: *const BufferHandle) -> Result<ReleasedHandle, BridgeError> {
        if handle.is_null() {
            return Err(BridgeError::NullHandle);
        }

        let address = handle as usize;
        let (payload, evicted, released) = {
            let mut slots = self.slots.lock();
            let Allocation {
                record,
                payload,
                token,
                ..
            } = slots
                .live
                .remove(&address)
                .ok_or(BridgeError::DoubleReleaseOrForeignHandle { address })?;

            let released = ReleasedHandle {
                token,
                length: payload.as_ref().map_or(0, Payload::len),
            };
            (payload, slots.retire(record), released)
        };

        // Freed here, outside the lock.
        drop(payload);
        drop(evicted);
        Ok(released)
    }

    /// Whether `handle` is currently outstanding.
    pub fn contains(&self, handle: *const BufferHandle) -> bool {
        self.slots.lock().live.contains_key(&(handle as usize))
    }

    /// Number of outstanding handles.
    pub fn len(&self) -> usize {
        self.slots.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Force-free every outstanding handle and return how many there were.
    pub(crate) fn drain(&self) -> usize {
        let (drained, retired) = {
            let mut slots = self.slots.lock();
            let drained: Vec<Allocation> = slots.live.drain().map(|(_, a)| a).collect();
            (drained, std::mem::take(&mut slots.retired))
        };

        for allocation in &drained {
            warn!(
                token = allocation.token,
                length = allocation.length(),
                identifier = %allocation.identifier,
                "force-freeing handle that was never released"
            );
        }
        drop(retired);
        drained.len()
    }
}
