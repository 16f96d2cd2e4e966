//! Console event rendering for the terminal.

use std::fmt::{Display, Write};
use std::path::Path;

use chrono::{DateTime, Local, TimeZone};
use playground_api::{ConsoleEvent, Stream};

/// U+23CE RETURN SYMBOL, marks multi-line messages.
const MULTILINE_MARKER: char = '\u{23ce}';

/// Render one console event as terminal text, timestamps in local time.
pub fn format_event(event: &ConsoleEvent, timestamps: bool) -> String {
    format_event_in(event, timestamps, &Local)
}

pub fn format_event_in<Tz>(event: &ConsoleEvent, timestamps: bool, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut line = String::new();

    if timestamps {
        if let Some(nanos) = event.timestamp() {
            let time = DateTime::from_timestamp_nanos(nanos).with_timezone(tz);
            let _ = write!(line, "{} ", time.format("%-H:%M:%S%.3f"));
        }
    }

    if let Some(file) = event.file() {
        let name = Path::new(file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file);
        let _ = write!(line, "{name}: ");
    }

    if !matches!(event, ConsoleEvent::Output { stream: Stream::Stdout, .. }) {
        let _ = write!(line, "[{}] ", event.stream_name());
    }

    let message = event.message();
    if is_multiline(message) {
        line.push(MULTILINE_MARKER);
        line.push('\n');
    }
    // The line is printed with its own newline
    line.push_str(message.strip_suffix('\n').unwrap_or(message));
    line
}

/// A single trailing newline does not make a message multi-line.
fn is_multiline(message: &str) -> bool {
    let mut chars = message.chars();
    chars.next_back();
    chars.as_str().contains('\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_plain_stdout() {
        let event = ConsoleEvent::output(Stream::Stdout, "hello\n");
        assert_eq!(format_event_in(&event, true, &Utc), "hello");
    }

    #[test]
    fn test_file_and_timestamp() {
        let event = ConsoleEvent::Output {
            stream: Stream::Stdout,
            message: "Serving: fortune\n".to_string(),
            file: Some("src/server/server.go".to_string()),
            // 2015-06-01 09:05:07.123 UTC
            timestamp: Some(1_433_149_507_123_000_000),
        };
        assert_eq!(
            format_event_in(&event, true, &Utc),
            "9:05:07.123 server.go: Serving: fortune"
        );
        assert_eq!(
            format_event_in(&event, false, &Utc),
            "server.go: Serving: fortune"
        );
    }

    #[test]
    fn test_stream_tags() {
        let event = ConsoleEvent::output(Stream::Stderr, "oops");
        assert_eq!(format_event_in(&event, false, &Utc), "[stderr] oops");

        let event = ConsoleEvent::syserr("Server response timed out.");
        assert_eq!(
            format_event_in(&event, false, &Utc),
            "[syserr] Server response timed out."
        );
    }

    #[test]
    fn test_multiline_marker() {
        let event = ConsoleEvent::output(Stream::Stdout, "a\nb\n");
        assert_eq!(format_event_in(&event, false, &Utc), "\u{23ce}\na\nb");
    }

    #[test]
    fn test_is_multiline() {
        assert!(!is_multiline(""));
        assert!(!is_multiline("one\n"));
        assert!(is_multiline("one\ntwo"));
        assert!(is_multiline("\n\n"));
        assert!(!is_multiline("\n"));
    }
}
