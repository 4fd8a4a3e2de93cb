//! # simlink-server
//!
//! Message gateway for the simlink control channel.
//!
//! This crate provides:
//! - `Gateway`: handler registry keyed by message type, response writing and
//!   thread-safe `emit` for unsolicited events
//! - The stdin input pump that feeds the gateway and falls back to the
//!   command console for lines that are not JSON

pub mod gateway;
pub mod transport;

pub use gateway::{Dispatch, Gateway, Incoming};
pub use transport::{FallbackHandler, MemorySink};

use simlink_core::Result;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Gateway plus the console fallback, ready to serve stdio
pub struct SimlinkServer {
    gateway: Arc<Gateway>,
    fallback: Arc<dyn FallbackHandler>,
}

impl SimlinkServer {
    pub fn new(gateway: Arc<Gateway>, fallback: Arc<dyn FallbackHandler>) -> Self {
        Self { gateway, fallback }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Start the stdin input pump. Resolves when stdin closes.
    pub fn run_stdio(&self) -> Result<oneshot::Receiver<Result<()>>> {
        transport::stdio::spawn(self.gateway.clone(), self.fallback.clone())
    }
}
