use thiserror::Error;

use crate::ffi::{HANDOFF_ERROR_DOUBLE_RELEASE, HANDOFF_ERROR_NULL_POINTER};

/// Why a resource could not be turned into a payload.
///
/// Never crosses the boundary: the producer logs it and answers with a
/// zero-length handle.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource unreadable: {identifier}: {reason}")]
    Unreadable { identifier: String, reason: String },

    #[error("resource malformed: {identifier}: {source}")]
    Malformed {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// The identifier the failed load was asked for.
    pub fn identifier(&self) -> &str {
        match self {
            LoadError::NotFound(identifier)
            | LoadError::Unreadable { identifier, .. }
            | LoadError::Malformed { identifier, .. } => identifier,
        }
    }

    pub(crate) fn unreadable(identifier: impl Into<String>, reason: impl ToString) -> Self {
        LoadError::Unreadable {
            identifier: identifier.into(),
            reason: reason.to_string(),
        }
    }
}

/// Producer-side release failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    #[error("null handle passed to release")]
    NullHandle,

    /// Always a caller bug: the handle was released already or never issued here.
    #[error("handle {address:#x} is not live (already released or not issued by this producer)")]
    DoubleReleaseOrForeignHandle { address: usize },
}

impl BridgeError {
    /// Status code reported at the C ABI.
    pub fn status_code(&self) -> i32 {
        match self {
            BridgeError::NullHandle => HANDOFF_ERROR_NULL_POINTER,
            BridgeError::DoubleReleaseOrForeignHandle { .. } => HANDOFF_ERROR_DOUBLE_RELEASE,
        }
    }
}

/// Failures seen by the consumer during one request/copy/release cycle.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("no producer available to serve the request")]
    NoProducer,

    #[error("handle describes {length} bytes but carries a null data pointer")]
    ContractViolation { length: usize },

    #[error("release failed with status {0}")]
    Release(i32),

    #[error("payload decode failed: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
}
