use std::fmt;
use crate::Bridge::Producer;
use crate::Core::registry::HandleRegistry;

/// Debug function for HandleRegistry
///
/// Shows counts only. Payload bytes belong to consumers while their handles
/// are live and are never formatted here.
pub fn debug_handle_registry(registry: &HandleRegistry, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HandleRegistry")
        .field("live", &registry.len())
        .field("live_bytes", &registry.live_bytes())
        .field("next_token", &registry.next_token())
        .finish()
}

/// Debug function for Producer
///
/// Shows:
/// - Opaque reference to the resource loader
/// - Registry summary
/// - Identifier bound
pub fn debug_producer(producer: &Producer, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Producer")
        .field("loader", &"<opaque>")
        .field("registry", producer.registry())
        .field("max_identifier_len", &producer.max_identifier_len())
        .finish()
}
