//! Gateway message handlers served by the bridge

use crate::host::SimulationHost;
use serde::{Deserialize, Serialize};
use simlink_server::{Gateway, Incoming};
use std::sync::Arc;
use tracing::debug;

/// Chat text from the peer, broadcast to every player
pub const DISCORD_MESSAGE: &str = "DISCORD_MESSAGE";
/// Handshake; answered with [`ServerInfo`]
pub const HELLO: &str = "HELLO";

/// Reply to `HELLO`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

pub fn register_handlers(gateway: &mut Gateway, host: Arc<dyn SimulationHost>, info: ServerInfo) {
    gateway.register(DISCORD_MESSAGE, move |msg: &mut Incoming<String>| {
        host.broadcast(msg.payload());
        Ok(())
    });

    gateway.register(HELLO, move |msg: &mut Incoming<serde_json::Value>| {
        debug!("{} from peer, answering as {} v{}", msg.message_type(), info.name, info.version);
        msg.respond(&info)
    });
}
