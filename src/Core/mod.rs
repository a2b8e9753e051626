pub mod error;
pub mod handle;
pub mod loader;
pub mod registry;

pub use error::{BridgeError, ConsumerError, LoadError};
pub use handle::BufferHandle;
pub use loader::{FileLoader, MemoryLoader, ResourceLoader};
pub use registry::{HandleRegistry, ReleasedHandle, RETIRED_RECORDS};
