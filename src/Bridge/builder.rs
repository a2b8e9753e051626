use super::Producer;
use crate::Core::loader::{FileLoader, ResourceLoader};
use std::io;
use std::path::PathBuf;
use tracing::warn;

/// Environment variable naming the directory identifiers resolve against.
pub const ROOT_DIR_ENV: &str = "HANDOFF_ROOT_DIR";
/// Environment variable bounding identifier length in bytes.
pub const MAX_IDENTIFIER_LEN_ENV: &str = "HANDOFF_MAX_IDENTIFIER_LEN";

pub struct ProducerBuilder {
    root_dir: PathBuf,
    max_identifier_len: usize,
    loader: Option<Box<dyn ResourceLoader>>,
}

impl Default for ProducerBuilder {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            max_identifier_len: 4096, // PATH_MAX on Linux
            loader: None,
        }
    }
}

impl ProducerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `HANDOFF_ROOT_DIR` and `HANDOFF_MAX_IDENTIFIER_LEN`.
    pub fn from_env() -> Self {
        let mut builder = Self::default();

        if let Ok(root) = std::env::var(ROOT_DIR_ENV) {
            builder = builder.with_root_dir(root);
        }
        if let Ok(raw) = std::env::var(MAX_IDENTIFIER_LEN_ENV) {
            match raw.parse::<usize>() {
                Ok(len) => builder = builder.with_max_identifier_len(len),
                Err(e) => warn!(value = %raw, error = %e, "ignoring {}", MAX_IDENTIFIER_LEN_ENV),
            }
        }
        builder
    }

    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    pub fn with_max_identifier_len(mut self, len: usize) -> Self {
        self.max_identifier_len = len;
        self
    }

    /// Serve resources from `loader` instead of files under the root directory.
    pub fn with_loader(mut self, loader: impl ResourceLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn build(self) -> io::Result<Producer> {
        let loader = match self.loader {
            Some(loader) => loader,
            None => {
                if !self.root_dir.is_dir() {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("Root directory {} not found", self.root_dir.display()),
                    ));
                }
                Box::new(FileLoader::new(self.root_dir))
            }
        };
        Ok(Producer::new(loader, self.max_identifier_len))
    }
}
