//! Gateway dispatcher
//!
//! Owns the handler registry keyed by message type, routes decoded envelopes
//! to their handler and writes responses and unsolicited events to the
//! outbound stream.
//!
//! Handlers are registered while the gateway is still exclusively owned;
//! once it is shared behind an `Arc` the registry is read-only. The outbound
//! writer is the only shared mutable piece and sits behind one mutex, so a
//! line is always written whole.

use serde::Serialize;
use serde::de::DeserializeOwned;
use simlink_core::codec::{self, Decoded, Envelope};
use simlink_core::{Result, SimlinkError};
use std::collections::HashMap;
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, warn};

type Handler = Box<dyn Fn(&Envelope) -> Result<Option<serde_json::Value>> + Send + Sync>;

/// A decoded inbound message handed to a handler
#[derive(Debug)]
pub struct Incoming<P> {
    message_type: String,
    payload: P,
    response: Option<serde_json::Value>,
}

impl<P> Incoming<P> {
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Set the response written back for this message. Responding again
    /// replaces the earlier value; only one line is ever written.
    pub fn respond<T: Serialize>(&mut self, value: T) -> Result<()> {
        self.response = Some(serde_json::to_value(value)?);
        Ok(())
    }
}

/// Outcome of dispatching one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran; `responded` is true if a response line was written
    Handled { responded: bool },
    /// Not a gateway message; hand the line to the command console
    NotAMessage,
}

/// Routes inbound envelopes and writes outbound lines
pub struct Gateway {
    handlers: HashMap<String, Handler>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Gateway {
    /// Gateway writing outbound lines to `writer`
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            handlers: HashMap::new(),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Gateway writing outbound lines to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Bind `handler` to `message_type`. The payload is decoded into `P`
    /// before the handler runs. Registering a type again replaces the
    /// previous handler.
    pub fn register<P, F>(&mut self, message_type: &str, handler: F)
    where
        P: DeserializeOwned + 'static,
        F: Fn(&mut Incoming<P>) -> Result<()> + Send + Sync + 'static,
    {
        let wrapped = move |envelope: &Envelope| -> Result<Option<serde_json::Value>> {
            let payload: P = serde_json::from_value(envelope.payload.clone()).map_err(|e| {
                SimlinkError::PayloadMismatch {
                    message_type: envelope.message_type.clone(),
                    reason: e.to_string(),
                }
            })?;

            let mut incoming = Incoming {
                message_type: envelope.message_type.clone(),
                payload,
                response: None,
            };
            handler(&mut incoming).map_err(|e| SimlinkError::HandlerFailed {
                message_type: envelope.message_type.clone(),
                reason: e.to_string(),
            })?;

            Ok(incoming.response)
        };

        if self
            .handlers
            .insert(message_type.to_string(), Box::new(wrapped))
            .is_some()
        {
            debug!("Replaced handler for {}", message_type);
        }
    }

    /// Decode one inbound line and run its handler on the calling thread.
    ///
    /// Returns [`Dispatch::NotAMessage`] when the line is not JSON. Any
    /// response is written before this returns.
    pub fn dispatch_incoming(&self, line: &str) -> Result<Dispatch> {
        let envelope = match codec::decode(line)? {
            Decoded::Message(envelope) => envelope,
            Decoded::NotAMessage => return Ok(Dispatch::NotAMessage),
        };

        let handler = self
            .handlers
            .get(&envelope.message_type)
            .ok_or_else(|| SimlinkError::UnhandledType(envelope.message_type.clone()))?;

        let response = match catch_unwind(AssertUnwindSafe(|| handler(&envelope))) {
            Ok(result) => result?,
            Err(_) => return Err(SimlinkError::HandlerPanicked(envelope.message_type)),
        };

        let Some(payload) = response else {
            return Ok(Dispatch::Handled { responded: false });
        };

        let reply = Envelope {
            message_type: envelope.message_type,
            payload,
            id: envelope.id,
        };
        let line = codec::encode_envelope(&reply)?;
        self.write_line(&line)?;
        debug!("Sent response: {}", line);

        Ok(Dispatch::Handled { responded: true })
    }

    /// Write one unsolicited event line. Safe from any thread; failures are
    /// logged and the event is dropped.
    pub fn emit<T: Serialize + ?Sized>(&self, event_name: &str, payload: &T) {
        let line = match codec::encode(event_name, payload) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode {} event: {}", event_name, e);
                return;
            }
        };

        match self.write_line(&line) {
            Ok(()) => debug!("Emitted: {}", line),
            Err(e) => error!("Failed to emit {} event: {}", event_name, e),
        }
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut out = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(line.as_bytes())
            .and_then(|()| out.write_all(b"\n"))
            .and_then(|()| out.flush())
            .map_err(|e| SimlinkError::Io(format!("Failed to write output: {}", e)))
    }
}
