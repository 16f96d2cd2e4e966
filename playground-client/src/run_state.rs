//! Run lifecycle state machine.
//!
//! `RunState` holds everything a run mutates and decides how each transport
//! event changes it. It performs no I/O: the client feeds it transport events
//! and publishes the [`RunUpdate`]s it queues.

use std::fmt;

use playground_api::{ConsoleEvent, Stream};

/// First console line of every run.
pub const RUNNING_MESSAGE: &str = "Running...";
pub const CONNECT_ERROR_MESSAGE: &str = "Error connecting to server.";
pub const PARSE_ERROR_MESSAGE: &str = "Error parsing server response.";
pub const TIMEOUT_MESSAGE: &str = "Server response timed out.";

/// Identifies one run attempt. Wraps at 2^31 - 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RunId(u32);

impl RunId {
    const MASK: u32 = 0x7fff_ffff;

    pub fn new(id: u32) -> Self {
        RunId(id & Self::MASK)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        RunId((self.0 + 1) & Self::MASK)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the current run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    /// Nothing has run since creation or the last reset.
    #[default]
    Idle,
    /// Request sent, waiting for response headers.
    Requesting,
    /// Response headers received, reading the body.
    Streaming,
    /// The last run ended (completed, failed, timed out or stopped).
    Finished,
}

/// What a transport should do after handing an event to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The event belongs to a run that is no longer current.
    Ignored,
    /// Keep reading.
    Continue,
    /// The run is over; release the transport.
    Ended,
}

impl Transition {
    pub fn is_done(self) -> bool {
        !matches!(self, Transition::Continue)
    }
}

/// Change notifications for subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunUpdate {
    /// A run started; the console was replaced by the events that follow.
    Started { run_id: RunId },
    /// Events appended to the console, in arrival order.
    Appended {
        run_id: RunId,
        events: Vec<ConsoleEvent>,
    },
    /// The run is no longer running.
    Finished { run_id: RunId },
    /// The console was cleared by a reset.
    Cleared,
}

/// Flags a renderer redraws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStatus {
    pub run_id: RunId,
    pub running: bool,
    pub has_run: bool,
    pub phase: RunPhase,
    pub event_count: usize,
}

#[derive(Debug, Default)]
pub struct RunState {
    run_id: RunId,
    running: bool,
    has_run: bool,
    phase: RunPhase,
    events: Vec<ConsoleEvent>,
    /// Bytes after the last newline seen, kept until the line completes.
    partial_line: Vec<u8>,
    outbox: Vec<RunUpdate>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_run(&self) -> bool {
        self.has_run
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn events(&self) -> &[ConsoleEvent] {
        &self.events
    }

    pub fn partial_line(&self) -> &[u8] {
        &self.partial_line
    }

    pub fn status(&self) -> RunStatus {
        RunStatus {
            run_id: self.run_id,
            running: self.running,
            has_run: self.has_run,
            phase: self.phase,
            event_count: self.events.len(),
        }
    }

    /// Whether callbacks issued for `run_id` may still take effect.
    pub fn is_current(&self, run_id: RunId) -> bool {
        self.run_id == run_id
    }

    /// Take the updates queued since the last drain.
    pub fn drain_updates(&mut self) -> Vec<RunUpdate> {
        std::mem::take(&mut self.outbox)
    }

    /// Begin a new run. Returns `None` without touching anything if a run is
    /// already active.
    pub fn start(&mut self) -> Option<RunId> {
        if self.running {
            tracing::debug!(run_id = %self.run_id, "already running");
            return None;
        }
        self.run_id = self.run_id.next();
        self.running = true;
        self.has_run = true;
        self.phase = RunPhase::Requesting;
        self.partial_line.clear();
        self.events.clear();
        self.outbox.push(RunUpdate::Started {
            run_id: self.run_id,
        });
        self.append(vec![ConsoleEvent::output(Stream::System, RUNNING_MESSAGE)]);
        Some(self.run_id)
    }

    /// Response headers arrived. A status other than 200 is reported but the
    /// body is still read.
    pub fn on_response(&mut self, run_id: RunId, status: u16) -> Transition {
        if !self.is_current(run_id) {
            return Transition::Ignored;
        }
        self.phase = RunPhase::Streaming;
        if status != 0 && status != 200 {
            self.append(vec![ConsoleEvent::syserr(format!("HTTP status {status}"))]);
        }
        Transition::Continue
    }

    /// A chunk of the response body arrived. Each complete line is one JSON
    /// event; a malformed line ends the run and drops the rest of the batch.
    pub fn on_chunk(&mut self, run_id: RunId, chunk: &[u8]) -> Transition {
        if !self.is_current(run_id) {
            return Transition::Ignored;
        }
        self.partial_line.extend_from_slice(chunk);
        let Some(last_newline) = self.partial_line.iter().rposition(|b| *b == b'\n') else {
            return Transition::Continue;
        };
        let rest = self.partial_line.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial_line, rest);

        let mut batch = Vec::new();
        let mut malformed = false;
        for line in complete.split(|b| *b == b'\n') {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }
            match ConsoleEvent::from_json_line(line) {
                Ok(event) => batch.push(event),
                Err(err) => {
                    tracing::error!(
                        %run_id,
                        line = %String::from_utf8_lossy(line),
                        "error parsing line: {}",
                        err
                    );
                    batch.push(ConsoleEvent::syserr(PARSE_ERROR_MESSAGE));
                    malformed = true;
                    break;
                }
            }
        }
        self.append(batch);

        if malformed {
            self.finish();
            Transition::Ended
        } else {
            Transition::Continue
        }
    }

    /// Connection-level failure.
    pub fn on_error(&mut self, run_id: RunId) -> Transition {
        if !self.is_current(run_id) {
            return Transition::Ignored;
        }
        self.append(vec![ConsoleEvent::syserr(CONNECT_ERROR_MESSAGE)]);
        self.finish();
        Transition::Ended
    }

    /// The response body ended. Leftover bytes mean the server closed
    /// mid-line.
    pub fn on_close(&mut self, run_id: RunId) -> Transition {
        if !self.is_current(run_id) {
            return Transition::Ignored;
        }
        let leftover = self.partial_line.trim_ascii();
        if !leftover.is_empty() {
            tracing::error!(
                %run_id,
                partial = %String::from_utf8_lossy(leftover),
                "connection closed without newline"
            );
            self.append(vec![ConsoleEvent::syserr(PARSE_ERROR_MESSAGE)]);
        }
        self.partial_line.clear();
        self.finish();
        Transition::Ended
    }

    /// The heartbeat watchdog fired.
    pub fn on_timeout(&mut self, run_id: RunId) -> Transition {
        if !self.is_current(run_id) {
            return Transition::Ignored;
        }
        self.append(vec![ConsoleEvent::syserr(TIMEOUT_MESSAGE)]);
        self.finish();
        Transition::Ended
    }

    /// Invalidate the current run. Events are kept.
    pub fn stop(&mut self) {
        let stopped = self.run_id;
        self.run_id = self.run_id.next();
        if self.running {
            self.running = false;
            self.phase = RunPhase::Finished;
            self.outbox.push(RunUpdate::Finished { run_id: stopped });
        }
    }

    /// Stop, then clear the console.
    pub fn reset(&mut self) {
        self.stop();
        self.events.clear();
        self.partial_line.clear();
        self.has_run = false;
        self.phase = RunPhase::Idle;
        self.outbox.push(RunUpdate::Cleared);
    }

    fn finish(&mut self) {
        tracing::debug!(run_id = %self.run_id, events = self.events.len(), "run ended");
        self.stop();
    }

    fn append(&mut self, events: Vec<ConsoleEvent>) {
        if events.is_empty() {
            return;
        }
        self.events.extend(events.iter().cloned());
        self.outbox.push(RunUpdate::Appended {
            run_id: self.run_id,
            events,
        });
    }
}
