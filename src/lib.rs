// Module naming follows project convention (capitalised top-level modules)
#[allow(non_snake_case)]
pub mod Core;
#[allow(non_snake_case)]
pub mod Bridge;
#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}
pub mod ffi;

pub use Bridge::{Consumer, Producer, ProducerBuilder}; // re-export for stable path
pub use Core::handle::BufferHandle;
