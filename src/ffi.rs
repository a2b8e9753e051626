use crate::Bridge::{Producer, ProducerBuilder};
use crate::Core::error::LoadError;
use crate::Core::handle::BufferHandle;
use lazy_static::lazy_static;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::ffi::{c_char, CStr};
use std::ptr;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// Status codes
pub const HANDOFF_SUCCESS: i32 = 0;
pub const HANDOFF_ERROR_NULL_POINTER: i32 = -1;
pub const HANDOFF_ERROR_INVALID_ARG: i32 = -2;
pub const HANDOFF_ERROR_DOUBLE_RELEASE: i32 = -3;
pub const HANDOFF_ERROR_BUSY: i32 = -4;

/// Environment variable holding a `tracing` filter; logging stays off when unset.
pub const LOG_ENV: &str = "HANDOFF_LOG";

lazy_static! {
    /// Process-wide producer behind the exported symbols.
    static ref PRODUCER: RwLock<Option<Producer>> = RwLock::new(None);
}

fn init_logging() {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        // Another subscriber may already be installed by the host; it wins.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(directives))
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Run `f` against the process-wide producer, starting it from the
/// environment if nothing has started it yet.
fn with_producer<R>(f: impl FnOnce(&Producer) -> R) -> Option<R> {
    {
        let guard = PRODUCER.read();
        if let Some(producer) = guard.as_ref() {
            return Some(f(producer));
        }
    }

    let mut guard = PRODUCER.write();
    if guard.is_none() {
        init_logging();
        match ProducerBuilder::from_env().build() {
            Ok(producer) => {
                info!("started producer from environment");
                *guard = Some(producer);
            }
            Err(e) => {
                error!(error = %e, "failed to start producer from environment");
                return None;
            }
        }
    }

    let guard = RwLockWriteGuard::downgrade(guard);
    guard.as_ref().map(f)
}

fn load(identifier: Result<&[u8], LoadError>) -> *const BufferHandle {
    with_producer(|producer| match identifier {
        Ok(identifier) => producer.load_resource(identifier),
        Err(e) => producer.reject(e),
    })
    .map_or(ptr::null(), |handle| handle.as_ptr() as *const BufferHandle)
}

// -----------------------------------------------------------------------------
// Lifecycle
// -----------------------------------------------------------------------------

/// Start the producer.
///
/// # Arguments
/// * `root_dir` - Directory identifiers resolve against, or NULL to take it
///   from `HANDOFF_ROOT_DIR` (default: current directory).
///
/// # Returns
/// * 0 on success.
/// * `HANDOFF_ERROR_BUSY` if a running producer still has live handles.
/// * `HANDOFF_ERROR_INVALID_ARG` if the directory is unusable.
///
/// # Safety
/// `root_dir` must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn handoff_startup(root_dir: *const c_char) -> i32 {
    init_logging();

    let mut builder = ProducerBuilder::from_env();
    if !root_dir.is_null() {
        match CStr::from_ptr(root_dir).to_str() {
            Ok(root) => builder = builder.with_root_dir(root),
            Err(e) => {
                error!(error = %e, "root directory is not valid UTF-8");
                return HANDOFF_ERROR_INVALID_ARG;
            }
        }
    }

    let mut guard = PRODUCER.write();
    if let Some(existing) = guard.as_ref() {
        let live = existing.live_handles();
        if live > 0 {
            warn!(live, "refusing to restart producer with live handles");
            return HANDOFF_ERROR_BUSY;
        }
    }

    match builder.build() {
        Ok(producer) => {
            info!(?producer, "producer started");
            *guard = Some(producer);
            HANDOFF_SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to start producer");
            HANDOFF_ERROR_INVALID_ARG
        }
    }
}

/// Tear the producer down.
///
/// Handles still outstanding are force-freed with a warning.
///
/// # Returns
/// * Number of handles that had not been released.
#[no_mangle]
pub extern "C" fn handoff_shutdown() -> usize {
    let producer = PRODUCER.write().take();
    match producer {
        Some(producer) => {
            let leaked = producer.shutdown();
            info!(leaked, "producer shut down");
            leaked
        }
        None => 0,
    }
}

/// Number of handles issued and not yet released.
#[no_mangle]
pub extern "C" fn handoff_live_handles() -> usize {
    PRODUCER.read().as_ref().map_or(0, Producer::live_handles)
}

// -----------------------------------------------------------------------------
// Exchange
// -----------------------------------------------------------------------------

/// Load the resource named by a NUL-terminated identifier.
///
/// # Returns
/// * Pointer to a `BufferHandle` that must be passed to `handoff_release`.
///   `length == 0` means the resource is not available.
/// * NULL only if no producer could be started.
///
/// # Safety
/// `identifier` must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn handoff_load_resource(identifier: *const c_char) -> *const BufferHandle {
    if identifier.is_null() {
        return load(Err(LoadError::unreadable("<null>", "null identifier")));
    }
    load(Ok(CStr::from_ptr(identifier).to_bytes()))
}

/// Load the resource named by `len` bytes at `identifier`.
///
/// Same contract as `handoff_load_resource`; an identifier with an embedded
/// NUL byte is reported as unreadable.
///
/// # Safety
/// `identifier` must be valid for reads of `len` bytes, or NULL with `len == 0`.
#[no_mangle]
pub unsafe extern "C" fn handoff_load_resource_bytes(
    identifier: *const u8,
    len: usize,
) -> *const BufferHandle {
    if identifier.is_null() {
        if len == 0 {
            let empty: &[u8] = &[];
            return load(Ok(empty));
        }
        return load(Err(LoadError::unreadable("<null>", "null identifier")));
    }
    load(Ok(std::slice::from_raw_parts(identifier, len)))
}

/// Release a handle returned by `handoff_load_resource`.
///
/// The handle is looked up by address only and never dereferenced, so a
/// stale or foreign pointer is reported instead of freed.
///
/// # Returns
/// * 0 on success.
/// * `HANDOFF_ERROR_NULL_POINTER` if `handle` is NULL.
/// * `HANDOFF_ERROR_DOUBLE_RELEASE` if `handle` is not live.
#[no_mangle]
pub extern "C" fn handoff_release(handle: *const BufferHandle) -> i32 {
    if handle.is_null() {
        warn!("null handle passed to release");
        return HANDOFF_ERROR_NULL_POINTER;
    }

    let guard = PRODUCER.read();
    let Some(producer) = guard.as_ref() else {
        warn!(address = handle as usize, "release without a running producer");
        return HANDOFF_ERROR_DOUBLE_RELEASE;
    };

    match producer.release(handle) {
        Ok(_) => HANDOFF_SUCCESS,
        Err(e) => e.status_code(),
    }
}

// -----------------------------------------------------------------------------
// Legacy names
// -----------------------------------------------------------------------------

/// Alias of `handoff_load_resource` under the name older consumers bind.
///
/// # Safety
/// Same as `handoff_load_resource`.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn LoadFile(identifier: *const c_char) -> *const BufferHandle {
    handoff_load_resource(identifier)
}

/// Alias of `handoff_release` under the name older consumers bind.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn Release(handle: *const BufferHandle) -> i32 {
    handoff_release(handle)
}
