//! Transports for the gateway's inbound and outbound streams

pub mod memory;
pub mod stdio;

pub use memory::MemorySink;
pub use stdio::FallbackHandler;
