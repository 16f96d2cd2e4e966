//! Console events streamed back by the compile endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Output stream a console message was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stream {
    Stdout,
    Stderr,
    Debug,
    System,
    /// Missing or unrecognized stream name.
    #[default]
    Unknown,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
            Stream::Debug => "debug",
            Stream::System => "system",
            Stream::Unknown => "unknown",
        }
    }
}

/// Stream tag used for errors generated by the client itself.
pub const SYSERR_STREAM: &str = "syserr";

/// One entry of the run console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "WireEvent")]
pub enum ConsoleEvent {
    /// Output relayed from the compile backend.
    Output {
        stream: Stream,
        message: String,
        /// Source file that produced the output, if any.
        file: Option<String>,
        /// Nanoseconds since the Unix epoch.
        timestamp: Option<i64>,
    },

    /// Error raised locally by the client (connection, parse, timeout).
    SysErr { message: String },
}

impl ConsoleEvent {
    pub fn output(stream: Stream, message: impl Into<String>) -> Self {
        ConsoleEvent::Output {
            stream,
            message: message.into(),
            file: None,
            timestamp: None,
        }
    }

    pub fn syserr(message: impl Into<String>) -> Self {
        ConsoleEvent::SysErr {
            message: message.into(),
        }
    }

    /// Parse one line of the event stream.
    pub fn from_json_line(line: &[u8]) -> Result<Self, EventParseError> {
        let wire: WireEvent = serde_json::from_slice(line)?;
        Ok(wire.into())
    }

    /// Name of the stream, `syserr` for locally generated errors.
    pub fn stream_name(&self) -> &'static str {
        match self {
            ConsoleEvent::Output { stream, .. } => stream.as_str(),
            ConsoleEvent::SysErr { .. } => SYSERR_STREAM,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ConsoleEvent::Output { message, .. } | ConsoleEvent::SysErr { message } => message,
        }
    }

    pub fn file(&self) -> Option<&str> {
        match self {
            ConsoleEvent::Output { file, .. } => file.as_deref(),
            ConsoleEvent::SysErr { .. } => None,
        }
    }

    pub fn timestamp(&self) -> Option<i64> {
        match self {
            ConsoleEvent::Output { timestamp, .. } => *timestamp,
            ConsoleEvent::SysErr { .. } => None,
        }
    }

    pub fn is_syserr(&self) -> bool {
        matches!(self, ConsoleEvent::SysErr { .. })
    }
}

/// A line of the event stream that is not a JSON event.
#[derive(Debug, thiserror::Error)]
#[error("malformed event: {0}")]
pub struct EventParseError(#[from] serde_json::Error);

/// Event as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireEvent {
    #[serde(rename = "Stream", default)]
    stream: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "File", default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    /// Any JSON number; fractional values are truncated.
    #[serde(rename = "Timestamp", default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<Number>,
}

fn timestamp_nanos(number: &Number) -> Option<i64> {
    number
        .as_i64()
        .or_else(|| number.as_f64().map(|nanos| nanos as i64))
}

impl From<WireEvent> for ConsoleEvent {
    fn from(wire: WireEvent) -> Self {
        let stream = match wire.stream.as_deref() {
            Some("stdout") => Stream::Stdout,
            Some("stderr") => Stream::Stderr,
            Some("debug") => Stream::Debug,
            Some("system") => Stream::System,
            _ => Stream::Unknown,
        };
        // The backend writes zero values instead of omitting the fields.
        ConsoleEvent::Output {
            stream,
            message: wire.message.unwrap_or_default(),
            file: wire.file.filter(|f| !f.is_empty()),
            timestamp: wire
                .timestamp
                .as_ref()
                .and_then(timestamp_nanos)
                .filter(|t| *t != 0),
        }
    }
}

impl From<ConsoleEvent> for WireEvent {
    fn from(event: ConsoleEvent) -> Self {
        let stream = Some(event.stream_name().to_string());
        match event {
            ConsoleEvent::Output {
                message,
                file,
                timestamp,
                ..
            } => WireEvent {
                stream,
                message: Some(message),
                file,
                timestamp: timestamp.map(Number::from),
            },
            ConsoleEvent::SysErr { message } => WireEvent {
                stream,
                message: Some(message),
                file: None,
                timestamp: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_event() {
        let line = br#"{"Stream":"stderr","Message":"boom\n","File":"src/a.go","Timestamp":1433000000000000000}"#;
        let event = ConsoleEvent::from_json_line(line).unwrap();
        assert_eq!(
            event,
            ConsoleEvent::Output {
                stream: Stream::Stderr,
                message: "boom\n".to_string(),
                file: Some("src/a.go".to_string()),
                timestamp: Some(1_433_000_000_000_000_000),
            }
        );
    }

    #[test]
    fn test_parse_zero_values_as_absent() {
        let line = br#"{"Stream":"stdout","Message":"hi","File":"","Timestamp":0}"#;
        let event = ConsoleEvent::from_json_line(line).unwrap();
        assert_eq!(event.file(), None);
        assert_eq!(event.timestamp(), None);
    }

    #[test]
    fn test_parse_unknown_stream() {
        let event = ConsoleEvent::from_json_line(br#"{"a":"b"}"#).unwrap();
        assert_eq!(event, ConsoleEvent::output(Stream::Unknown, ""));

        // syserr is reserved for local errors
        let event = ConsoleEvent::from_json_line(br#"{"Stream":"syserr","Message":"x"}"#).unwrap();
        assert!(!event.is_syserr());
        assert_eq!(event.stream_name(), "unknown");
    }

    #[test]
    fn test_parse_float_timestamp() {
        let line = br#"{"Stream":"stdout","Message":"hi","Timestamp":1.4330000001e18}"#;
        let event = ConsoleEvent::from_json_line(line).unwrap();
        assert_eq!(event.timestamp(), Some(1_433_000_000_100_000_000));

        let line = br#"{"Stream":"stdout","Message":"hi","Timestamp":0.5}"#;
        assert_eq!(ConsoleEvent::from_json_line(line).unwrap().timestamp(), None);
    }

    #[test]
    fn test_parse_null_fields() {
        let line = br#"{"Stream":null,"Message":null,"File":null,"Timestamp":null}"#;
        let event = ConsoleEvent::from_json_line(line).unwrap();
        assert_eq!(event, ConsoleEvent::output(Stream::Unknown, ""));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(ConsoleEvent::from_json_line(br#"{ bad: "json""#).is_err());
    }

    #[test]
    fn test_serialize_syserr() {
        let json = serde_json::to_value(ConsoleEvent::syserr("Server response timed out.")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Stream": "syserr", "Message": "Server response timed out."})
        );
    }
}
