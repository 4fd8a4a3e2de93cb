//! stdin input pump
//!
//! A dedicated blocking thread reads stdin line by line. Each line goes to
//! the gateway first; lines that are not JSON fall through to the command
//! console. One line is fully handled before the next read.

use crate::gateway::{Dispatch, Gateway};
use simlink_console::CommandResolver;
use simlink_core::{Result, SimlinkError};
use std::io::{BufRead, ErrorKind};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Name of the input pump thread
pub const INPUT_THREAD_NAME: &str = "InputThread";

/// Receives lines that are not gateway messages
pub trait FallbackHandler: Send + Sync {
    fn handle_line(&self, line: &str);
}

impl FallbackHandler for CommandResolver {
    fn handle_line(&self, line: &str) {
        self.resolve(line);
    }
}

/// Read `reader` until end of stream, dispatching every non-blank line.
///
/// Handler and decode failures are logged and the loop continues. Only a
/// read error other than invalid UTF-8 ends the loop early.
pub fn run<R: BufRead>(
    mut reader: R,
    gateway: &Gateway,
    fallback: &dyn FallbackHandler,
) -> Result<()> {
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!("Skipping input line that is not valid UTF-8");
                continue;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(SimlinkError::Io(format!("Failed to read input: {}", e)));
            }
        };

        if bytes_read == 0 {
            info!("Input closed (EOF)");
            break;
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() {
            continue;
        }

        debug!("Received: {}", trimmed);
        handle_line(trimmed, gateway, fallback);
    }

    Ok(())
}

/// Dispatch one line, falling back to the console for non-messages
pub fn handle_line(line: &str, gateway: &Gateway, fallback: &dyn FallbackHandler) {
    match gateway.dispatch_incoming(line) {
        Ok(Dispatch::NotAMessage) => fallback.handle_line(line),
        Ok(Dispatch::Handled { responded }) => {
            debug!("Handled message (responded: {})", responded);
        }
        Err(e @ (SimlinkError::HandlerFailed { .. } | SimlinkError::HandlerPanicked(_))) => {
            error!("{}", e);
        }
        Err(e) => warn!("Dropped line: {}", e),
    }
}

/// Start the input pump on its own thread, reading the process's stdin.
///
/// The returned receiver resolves when the pump stops, carrying the pump's
/// result. Nothing else in the process may read stdin.
pub fn spawn(
    gateway: Arc<Gateway>,
    fallback: Arc<dyn FallbackHandler>,
) -> Result<oneshot::Receiver<Result<()>>> {
    let (done_tx, done_rx) = oneshot::channel();

    std::thread::Builder::new()
        .name(INPUT_THREAD_NAME.to_string())
        .spawn(move || {
            info!("Input pump reading stdin");
            let stdin = std::io::stdin();
            let result = run(stdin.lock(), &gateway, fallback.as_ref());
            if let Err(e) = &result {
                error!("Input pump stopped: {}", e);
            }
            let _ = done_tx.send(result);
        })?;

    Ok(done_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Incoming;
    use crate::transport::MemorySink;
    use serde_json::json;
    use simlink_console::CommandHandler;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFallback {
        lines: Mutex<Vec<String>>,
    }

    impl FallbackHandler for RecordingFallback {
        fn handle_line(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }
    }

    fn discord_gateway(sink: &MemorySink, broadcasts: Arc<Mutex<Vec<String>>>) -> Gateway {
        let mut gateway = Gateway::new(sink.clone());
        gateway.register("DISCORD_MESSAGE", move |msg: &mut Incoming<String>| {
            broadcasts.lock().unwrap().push(msg.payload().clone());
            Ok(())
        });
        gateway.register("HELLO", |msg: &mut Incoming<serde_json::Value>| msg.respond("Data"));
        gateway
    }

    #[test]
    fn test_discord_message_reaches_handler_only() {
        let sink = MemorySink::new();
        let broadcasts = Arc::new(Mutex::new(Vec::new()));
        let gateway = discord_gateway(&sink, broadcasts.clone());
        let fallback = RecordingFallback::default();

        let input = Cursor::new("{\"type\":\"DISCORD_MESSAGE\",\"payload\":\"hello\"}\n");
        run(input, &gateway, &fallback).unwrap();

        assert_eq!(*broadcasts.lock().unwrap(), vec!["hello"]);
        assert!(fallback.lines.lock().unwrap().is_empty());
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_lines_routed_in_order() {
        let sink = MemorySink::new();
        let broadcasts = Arc::new(Mutex::new(Vec::new()));
        let gateway = discord_gateway(&sink, broadcasts.clone());
        let fallback = RecordingFallback::default();

        let input = Cursor::new(
            "status\r\n\
             \n\
             {\"type\":\"HELLO\",\"payload\":null}\n\
             {\"type\":\"UNKNOWN\",\"payload\":1}\n\
             {\"type\":\"DISCORD_MESSAGE\",\"payload\":{\"not\":\"a string\"}}\n\
             say hello there\n\
             {\"type\":\"DISCORD_MESSAGE\",\"payload\":\"last\"}",
        );
        run(input, &gateway, &fallback).unwrap();

        assert_eq!(
            *fallback.lines.lock().unwrap(),
            vec!["status", "say hello there"]
        );
        assert_eq!(*broadcasts.lock().unwrap(), vec!["last"]);
        assert_eq!(
            sink.json_lines(),
            vec![json!({"type": "HELLO", "payload": "Data"})]
        );
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let sink = MemorySink::new();
        let gateway = Gateway::new(sink.clone());
        let fallback = RecordingFallback::default();

        let mut bytes = vec![0xff, 0xfe, b'\n'];
        bytes.extend_from_slice(b"help\n");
        run(Cursor::new(bytes), &gateway, &fallback).unwrap();

        assert_eq!(*fallback.lines.lock().unwrap(), vec!["help"]);
    }

    #[test]
    fn test_empty_input_ends_quietly() {
        let sink = MemorySink::new();
        let gateway = Gateway::new(sink.clone());
        let fallback = RecordingFallback::default();

        run(Cursor::new(""), &gateway, &fallback).unwrap();
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn test_resolver_as_fallback() {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let mut handler = CommandHandler::new();
        let seen = ran.clone();
        handler
            .register("status", "", "", move |_| {
                seen.lock().unwrap().push("status");
                Ok(())
            })
            .unwrap();
        let resolver: Arc<dyn FallbackHandler> = Arc::new(CommandResolver::new(Arc::new(handler)));

        let sink = MemorySink::new();
        let gateway = Gateway::new(sink.clone());
        run(Cursor::new("status\nstatsu\n"), &gateway, resolver.as_ref()).unwrap();

        assert_eq!(*ran.lock().unwrap(), vec!["status"]);
        // console feedback goes to the log, never to the gateway stream
        assert!(sink.contents().is_empty());
    }
}
