mod builder;
mod consumer;
mod producer;

pub use builder::{ProducerBuilder, MAX_IDENTIFIER_LEN_ENV, ROOT_DIR_ENV};
pub use consumer::{Consumer, Endpoint, ForeignHandle, HandleGuard, NativeEndpoint};
pub use producer::Producer;
