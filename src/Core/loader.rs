use crate::Core::error::LoadError;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Turns a named resource into the bytes handed to the consumer.
///
/// The bridge never looks inside the payload; it only needs the exact bytes
/// or a reason why there are none.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, identifier: &str) -> Result<Vec<u8>, LoadError>;
}

/// Loads JSON documents from disk and re-serializes them in compact form.
///
/// Identifiers resolve relative to `root`; absolute identifiers are used as-is.
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, identifier: &str) -> PathBuf {
        self.root.join(identifier)
    }
}

impl ResourceLoader for FileLoader {
    fn load(&self, identifier: &str) -> Result<Vec<u8>, LoadError> {
        if identifier.is_empty() {
            return Err(LoadError::NotFound(String::new()));
        }

        let path = self.resolve(identifier);
        let raw = fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(identifier.to_string()),
            _ => LoadError::unreadable(identifier, format!("{}: {e}", path.display())),
        })?;

        let document: serde_json::Value =
            serde_json::from_slice(&raw).map_err(|source| LoadError::Malformed {
                identifier: identifier.to_string(),
                source,
            })?;

        serde_json::to_vec(&document).map_err(|source| LoadError::Malformed {
            identifier: identifier.to_string(),
            source,
        })
    }
}

/// Serves a fixed table of payloads held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    resources: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `identifier` as compact JSON.
    pub fn insert_json<T: Serialize + ?Sized>(
        &mut self,
        identifier: impl Into<String>,
        value: &T,
    ) -> serde_json::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.resources.insert(identifier.into(), bytes);
        Ok(())
    }

    /// Register bytes served verbatim, whatever they contain.
    pub fn insert_raw(&mut self, identifier: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.resources.insert(identifier.into(), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl ResourceLoader for MemoryLoader {
    fn load(&self, identifier: &str) -> Result<Vec<u8>, LoadError> {
        self.resources
            .get(identifier)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(identifier.to_string()))
    }
}
