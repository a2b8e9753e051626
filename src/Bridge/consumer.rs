// src/Bridge/consumer.rs

use super::Producer;
use crate::Core::error::ConsumerError;
use crate::Core::handle::BufferHandle;
use crate::ffi::{self, HANDOFF_SUCCESS};
use serde::de::DeserializeOwned;
use std::ptr::NonNull;
use tracing::error;

/// The two boundary operations as seen from the consumer.
pub trait Endpoint {
    /// Ask the producer for `identifier`. Null means no producer answered.
    fn load_resource(&self, identifier: &[u8]) -> *const BufferHandle;

    /// Hand `handle` back to the producer, returning its status code.
    ///
    /// # Safety
    /// `handle` must come from `load_resource` on this endpoint, and no
    /// borrow of its buffer may outlive this call.
    unsafe fn release(&self, handle: *const BufferHandle) -> i32;
}

impl Endpoint for Producer {
    fn load_resource(&self, identifier: &[u8]) -> *const BufferHandle {
        Producer::load_resource(self, identifier).as_ptr()
    }

    unsafe fn release(&self, handle: *const BufferHandle) -> i32 {
        match Producer::release(self, handle) {
            Ok(_) => HANDOFF_SUCCESS,
            Err(e) => e.status_code(),
        }
    }
}

impl<T: Endpoint + ?Sized> Endpoint for &T {
    fn load_resource(&self, identifier: &[u8]) -> *const BufferHandle {
        (**self).load_resource(identifier)
    }

    unsafe fn release(&self, handle: *const BufferHandle) -> i32 {
        (**self).release(handle)
    }
}

/// Goes through the exported C ABI and the process-wide producer, exactly
/// like a foreign runtime would.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEndpoint;

impl Endpoint for NativeEndpoint {
    fn load_resource(&self, identifier: &[u8]) -> *const BufferHandle {
        // SAFETY: the slice is valid for `len` bytes for the duration of the call.
        unsafe { ffi::handoff_load_resource_bytes(identifier.as_ptr(), identifier.len()) }
    }

    unsafe fn release(&self, handle: *const BufferHandle) -> i32 {
        ffi::handoff_release(handle)
    }
}

/// A producer-owned handle held on the consumer side.
///
/// Opaque: it is passed back verbatim on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignHandle(NonNull<BufferHandle>);

impl ForeignHandle {
    pub fn as_ptr(&self) -> *const BufferHandle {
        self.0.as_ptr()
    }
}

/// Scoped acquisition of one handle.
///
/// The handle is released exactly once: by `release`, or on drop for every
/// other exit path.
pub struct HandleGuard<'e, E: Endpoint + ?Sized> {
    endpoint: &'e E,
    handle: Option<ForeignHandle>,
}

impl<'e, E: Endpoint + ?Sized> HandleGuard<'e, E> {
    pub fn acquire(endpoint: &'e E, identifier: &[u8]) -> Result<Self, ConsumerError> {
        let raw = endpoint.load_resource(identifier);
        let handle = NonNull::new(raw as *mut BufferHandle).ok_or(ConsumerError::NoProducer)?;
        Ok(Self {
            endpoint,
            handle: Some(ForeignHandle(handle)),
        })
    }

    pub fn handle(&self) -> Option<ForeignHandle> {
        self.handle
    }

    /// Copy the payload into consumer-owned memory.
    ///
    /// `Ok(None)` is the "resource not available" answer (zero length); the
    /// data pointer is not looked at in that case.
    pub fn copy_out(&self) -> Result<Option<Vec<u8>>, ConsumerError> {
        let Some(handle) = self.handle else {
            return Ok(None);
        };

        // SAFETY: the guard still holds the handle, so the producer keeps
        // both the record and its buffer alive.
        let record = unsafe { handle.0.as_ref() };
        if record.is_empty() {
            return Ok(None);
        }

        // SAFETY: as above; the borrow ends with this statement.
        let bytes = unsafe { record.bytes() }.ok_or(ConsumerError::ContractViolation {
            length: record.length,
        })?;
        Ok(Some(bytes.to_vec()))
    }

    /// Release now and report the producer's answer.
    pub fn release(mut self) -> Result<(), ConsumerError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), ConsumerError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        // SAFETY: the handle came from this endpoint and `copy_out` hands
        // out owned copies only.
        let status = unsafe { self.endpoint.release(handle.as_ptr()) };
        if status == HANDOFF_SUCCESS {
            Ok(())
        } else {
            Err(ConsumerError::Release(status))
        }
    }
}

impl<E: Endpoint + ?Sized> Drop for HandleGuard<'_, E> {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            error!(error = %e, "release on scope exit failed");
        }
    }
}

/// Runs request → copy → release cycles against an endpoint.
pub struct Consumer<E: Endpoint = NativeEndpoint> {
    endpoint: E,
}

impl Default for Consumer<NativeEndpoint> {
    fn default() -> Self {
        Self::new(NativeEndpoint)
    }
}

impl<E: Endpoint> Consumer<E> {
    pub fn new(endpoint: E) -> Self {
        Self { endpoint }
    }

    /// Fetch the raw payload for `identifier`.
    ///
    /// The bytes are copied out before the handle is released, and the
    /// handle is released whatever happens to the copy.
    ///
    /// # Returns
    /// * `Ok(Some(bytes))` if the producer had the resource
    /// * `Ok(None)` if the resource is not available
    /// * `Err(ConsumerError)` if the exchange itself failed
    pub fn fetch(&self, identifier: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>, ConsumerError> {
        let guard = HandleGuard::acquire(&self.endpoint, identifier.as_ref())?;
        let copied = guard.copy_out();
        let released = guard.release();

        let copied = copied?;
        released?;
        Ok(copied)
    }

    /// Fetch and decode. Decoding only starts after the handle is released.
    pub fn fetch_decoded<T, D, DecodeErr>(
        &self,
        identifier: impl AsRef<[u8]>,
        decode: D,
    ) -> Result<Option<T>, ConsumerError>
    where
        D: FnOnce(&[u8]) -> Result<T, DecodeErr>,
        DecodeErr: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match self.fetch(identifier)? {
            Some(bytes) => decode(&bytes)
                .map(Some)
                .map_err(|e| ConsumerError::Decode(e.into())),
            None => Ok(None),
        }
    }

    /// Fetch a JSON payload and deserialize it into `T`.
    pub fn fetch_json<T: DeserializeOwned>(
        &self,
        identifier: impl AsRef<[u8]>,
    ) -> Result<Option<T>, ConsumerError> {
        self.fetch_decoded(identifier, |bytes: &[u8]| serde_json::from_slice::<T>(bytes))
    }
}
