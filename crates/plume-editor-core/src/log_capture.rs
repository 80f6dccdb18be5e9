//! Ring buffer capture of recent engine log events.
//!
//! Hosts attach [`LogCaptureLayer`] to their subscriber stack to keep the last
//! few engine events around for bug reports; tests use it to assert that a
//! failure was logged.

use std::collections::VecDeque;
use std::fmt::{self, Write as FmtWrite};
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Default number of entries kept.
pub const DEFAULT_CAPACITY: usize = 100;

/// Target prefix of every event the engine emits.
const CAPTURED_PREFIX: &str = "plume";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl fmt::Display for CapturedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", level_str(&self.level), self.target, self.message)
    }
}

type Buffer = Arc<Mutex<VecDeque<CapturedEvent>>>;

/// Handle to a capture buffer. Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct LogCapture {
    buffer: Buffer,
    capacity: usize,
    min_level: Level,
}

impl Default for LogCapture {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Level::DEBUG)
    }
}

impl LogCapture {
    pub fn new(capacity: usize, min_level: Level) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
            min_level,
        }
    }

    /// A layer writing into this buffer.
    pub fn layer(&self) -> LogCaptureLayer {
        LogCaptureLayer {
            capture: self.clone(),
        }
    }

    pub fn entries(&self) -> Vec<CapturedEvent> {
        match self.buffer.lock() {
            Ok(buf) => buf.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Whether any captured event at `level` mentions `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    /// All captured entries, one per line.
    pub fn dump(&self) -> String {
        self.entries()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&self) {
        match self.buffer.lock() {
            Ok(mut buf) => buf.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn push(&self, event: CapturedEvent) {
        // A panicking plugin can poison the lock while a log call is in flight.
        let mut buf = match self.buffer.lock() {
            Ok(buf) => buf,
            Err(poisoned) => poisoned.into_inner(),
        };
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(event);
    }
}

/// A tracing layer that keeps engine events in a [`LogCapture`] buffer.
pub struct LogCaptureLayer {
    capture: LogCapture,
}

impl<S: Subscriber> Layer<S> for LogCaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = metadata.level();
        let target = metadata.target();

        if !target.starts_with(CAPTURED_PREFIX) || *level > self.capture.min_level {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.capture.push(CapturedEvent {
            level: *level,
            target: target.to_owned(),
            message: visitor.finish(),
        });
    }
}

/// Collects an event's message and its other fields separately so the
/// message always comes first.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        let mut out = self.message;
        for field in self.fields {
            if !out.is_empty() {
                out.push_str(", ");
            }
            out.push_str(&field);
        }
        out
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

fn level_str(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_captures_engine_events_only() {
        let capture = LogCapture::new(2, Level::DEBUG);
        let subscriber = tracing_subscriber::registry().with(capture.layer());
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "plume::catalog", name = "bold", "first");
            tracing::warn!(target: "elsewhere", "ignored");
            tracing::trace!(target: "plume::mutate", "too quiet");
            tracing::error!(target: "plume::catalog", "second");
            tracing::info!(target: "plume::footnotes", "third");
        });

        let entries = capture.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].to_string(), "[ERROR] plume::catalog: second");
        assert!(capture.contains(Level::INFO, "third"));
        assert!(!capture.contains(Level::WARN, "first"));
    }

    #[test]
    fn test_fields_are_flattened() {
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.layer());
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(target: "plume::catalog", name = "bold", "failed");
        });
        assert_eq!(capture.dump(), "[ERROR] plume::catalog: failed, name=bold");
    }
}
