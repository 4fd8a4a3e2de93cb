//! Line codec for the gateway protocol
//!
//! Every line on the wire is either one JSON envelope or a plain console
//! command. Format: `{"type": "MESSAGE_TYPE", "payload": ..., "id": ...}`
//! with `id` optional. An explicit `"id": null` counts as present and is
//! echoed back as `null`.

use crate::error::{Result, SimlinkError};
use serde::{Deserialize, Deserializer, Serialize};

/// The `{type, payload}` unit of the protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Case-sensitive tag selecting a handler
    #[serde(rename = "type")]
    pub message_type: String,
    /// Opaque payload, decoded lazily by the handler
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Correlation value echoed back on the response
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<serde_json::Value>,
}

impl Envelope {
    pub fn new(message_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
            id: None,
        }
    }
}

/// `Some` whenever the field appears, `null` included
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Outcome of decoding one inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A protocol envelope
    Message(Envelope),
    /// Not JSON at all; the line belongs to the command console
    NotAMessage,
}

/// Decode one line.
///
/// Only a syntactic JSON failure yields [`Decoded::NotAMessage`]. Valid JSON
/// that is not an envelope is an error and never reaches the console.
pub fn decode(line: &str) -> Result<Decoded> {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(_) => return Ok(Decoded::NotAMessage),
    };

    if !value.is_object() {
        return Err(SimlinkError::InvalidEnvelope(format!(
            "expected a JSON object, got {}",
            kind_of(&value)
        )));
    }

    let envelope: Envelope = serde_json::from_value(value)
        .map_err(|e| SimlinkError::InvalidEnvelope(e.to_string()))?;
    Ok(Decoded::Message(envelope))
}

/// Encode an outbound event as one line (no trailing newline)
pub fn encode<T: Serialize + ?Sized>(event_name: &str, payload: &T) -> Result<String> {
    #[derive(Serialize)]
    struct Outbound<'a, T: ?Sized> {
        #[serde(rename = "type")]
        message_type: &'a str,
        payload: &'a T,
    }

    Ok(serde_json::to_string(&Outbound {
        message_type: event_name,
        payload,
    })?)
}

/// Encode a full envelope as one line (no trailing newline)
pub fn encode_envelope(envelope: &Envelope) -> Result<String> {
    Ok(serde_json::to_string(envelope)?)
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_envelope() {
        let line = r#"{"type":"DISCORD_MESSAGE","payload":"hello"}"#;
        match decode(line).unwrap() {
            Decoded::Message(env) => {
                assert_eq!(env.message_type, "DISCORD_MESSAGE");
                assert_eq!(env.payload, json!("hello"));
                assert!(env.id.is_none());
            }
            Decoded::NotAMessage => panic!("expected a message"),
        }
    }

    #[test]
    fn test_plain_command_is_not_a_message() {
        for line in ["help", "status", "say hi there", "{broken", "map \"Ground Zero\""] {
            assert_eq!(decode(line).unwrap(), Decoded::NotAMessage, "line: {}", line);
        }
    }

    #[test]
    fn test_valid_json_without_type_is_error() {
        assert!(matches!(
            decode(r#"{"payload":1}"#),
            Err(SimlinkError::InvalidEnvelope(_))
        ));
        assert!(matches!(
            decode(r#"{"type":7,"payload":1}"#),
            Err(SimlinkError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_valid_json_scalar_is_error() {
        assert!(matches!(decode("42"), Err(SimlinkError::InvalidEnvelope(_))));
        assert!(matches!(decode("[1,2]"), Err(SimlinkError::InvalidEnvelope(_))));
    }

    #[test]
    fn test_missing_payload_is_null() {
        match decode(r#"{"type":"HELLO"}"#).unwrap() {
            Decoded::Message(env) => assert_eq!(env.payload, serde_json::Value::Null),
            Decoded::NotAMessage => panic!("expected a message"),
        }
    }

    #[test]
    fn test_payload_preserved_through_decode_encode() {
        let line = r#"{"type":"STATE","payload":{"players":["a","b"],"wave":12,"rules":{"pvp":false}},"id":"req-9"}"#;
        let env = match decode(line).unwrap() {
            Decoded::Message(env) => env,
            Decoded::NotAMessage => panic!("expected a message"),
        };
        let encoded = encode_envelope(&env).unwrap();

        let original: serde_json::Value = serde_json::from_str(line).unwrap();
        let reencoded: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(original, reencoded);
    }

    #[test]
    fn test_null_id_is_kept() {
        let line = r#"{"type":"HELLO","payload":{},"id":null}"#;
        let env = match decode(line).unwrap() {
            Decoded::Message(env) => env,
            Decoded::NotAMessage => panic!("expected a message"),
        };
        assert_eq!(env.id, Some(serde_json::Value::Null));

        let reencoded: serde_json::Value =
            serde_json::from_str(&encode_envelope(&env).unwrap()).unwrap();
        assert_eq!(reencoded["id"], serde_json::Value::Null);
        assert!(reencoded.as_object().unwrap().contains_key("id"));

        let env = match decode(r#"{"type":"HELLO"}"#).unwrap() {
            Decoded::Message(env) => env,
            Decoded::NotAMessage => panic!("expected a message"),
        };
        assert_eq!(env.id, None);
    }

    #[test]
    fn test_encode_event() {
        let line = encode("CHAT_MESSAGE", "[Alice] => hi").unwrap();
        assert_eq!(line, r#"{"type":"CHAT_MESSAGE","payload":"[Alice] => hi"}"#);
        assert!(!line.contains('\n'));
    }
}
