// In src/Bridge/producer.rs
use crate::Core::error::{BridgeError, LoadError};
use crate::Core::handle::BufferHandle;
use crate::Core::loader::ResourceLoader;
use crate::Core::registry::{HandleRegistry, ReleasedHandle};
use std::fmt;
use std::ptr::NonNull;
use tracing::{debug, warn};

/// The side of the bridge that allocates payload buffers and frees them again.
///
/// Every handle returned by `load_resource` stays registered, and its buffer
/// readable, until the same address comes back through `release`.
pub struct Producer {
    loader: Box<dyn ResourceLoader>,
    registry: HandleRegistry,
    max_identifier_len: usize,
}

impl Producer {
    pub(crate) fn new(loader: Box<dyn ResourceLoader>, max_identifier_len: usize) -> Self {
        Self {
            loader,
            registry: HandleRegistry::new(),
            max_identifier_len,
        }
    }

    /// Produce a handle for the resource named by `identifier`.
    ///
    /// Always returns a registered handle. If the resource cannot be loaded
    /// the handle has `length == 0` and a null `data` pointer; it must still
    /// be released like any other.
    pub fn load_resource(&self, identifier: &[u8]) -> NonNull<BufferHandle> {
        match self.read_resource(identifier) {
            Ok(payload) => self.issue(payload, &String::from_utf8_lossy(identifier)),
            Err(e) => self.reject(e),
        }
    }

    /// Register a zero-length handle standing for a failed load.
    pub(crate) fn reject(&self, error: LoadError) -> NonNull<BufferHandle> {
        debug!(error = %error, "resource not available");
        self.issue(Vec::new(), error.identifier())
    }

    fn issue(&self, payload: Vec<u8>, identifier: &str) -> NonNull<BufferHandle> {
        let length = payload.len();
        let (handle, token) = self.registry.insert(payload, identifier);
        debug!(token, length, identifier, "issued handle");
        handle
    }

    fn read_resource(&self, identifier: &[u8]) -> Result<Vec<u8>, LoadError> {
        let label = || String::from_utf8_lossy(identifier).into_owned();

        if identifier.is_empty() {
            return Err(LoadError::NotFound(String::new()));
        }
        if identifier.len() > self.max_identifier_len {
            return Err(LoadError::unreadable(
                label(),
                format!(
                    "identifier too long ({} > {})",
                    identifier.len(),
                    self.max_identifier_len
                ),
            ));
        }
        if identifier.contains(&0) {
            return Err(LoadError::unreadable(label(), "embedded NUL byte"));
        }

        let identifier = std::str::from_utf8(identifier)
            .map_err(|e| LoadError::unreadable(label(), e))?;
        self.loader.load(identifier)
    }

    /// Free the buffer behind `handle` and forget the handle.
    ///
    /// Only addresses currently in the registry are freed. Anything else is
    /// reported as `DoubleReleaseOrForeignHandle` and left alone. The handle
    /// is never dereferenced.
    pub fn release(&self, handle: *const BufferHandle) -> Result<ReleasedHandle, BridgeError> {
        match self.registry.remove(handle) {
            Ok(released) => {
                debug!(
                    token = released.token,
                    length = released.length,
                    "released handle"
                );
                Ok(released)
            }
            Err(e) => {
                warn!(error = %e, "rejected release");
                Err(e)
            }
        }
    }

    /// Number of handles issued and not yet released.
    pub fn live_handles(&self) -> usize {
        self.registry.len()
    }

    /// Free everything still outstanding, returning how many handles that was.
    pub fn shutdown(&self) -> usize {
        let leaked = self.registry.drain();
        if leaked > 0 {
            warn!(leaked, "producer shut down with live handles");
        }
        leaked
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn max_identifier_len(&self) -> usize {
        self.max_identifier_len
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_producer(self, f)
    }
}
