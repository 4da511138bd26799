use super::clock;
use super::sink::{LogCategory, LogSink};
use chrono::Utc;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Target used for console copies of access records. Those lines are
/// already on disk and must not be written twice.
pub const ACCESS_TARGET: &str = "reqtrail::access";

/// Copies `tracing` events into the log files as
/// `[timestamp] [LEVEL] message key=value ...` lines.
pub struct SinkLayer {
    sink: Arc<LogSink>,
    debug_to_file: bool,
}

impl SinkLayer {
    /// `debug_to_file` enables DEBUG/TRACE lines; INFO and above are always written.
    pub fn new(sink: Arc<LogSink>, debug_to_file: bool) -> Self {
        Self { sink, debug_to_file }
    }

    fn category(&self, level: &Level) -> Option<LogCategory> {
        match *level {
            Level::ERROR => Some(LogCategory::Error),
            Level::WARN | Level::INFO => Some(LogCategory::Application),
            _ if self.debug_to_file => Some(LogCategory::Application),
            _ => None,
        }
    }
}

impl<S: Subscriber> Layer<S> for SinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(ACCESS_TARGET) {
            return;
        }
        let Some(category) = self.category(metadata.level()) else {
            return;
        };

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let timestamp = clock::format_timestamp(Utc::now(), self.sink.options().utc_offset_hours);
        let line = format_event_line(&timestamp, metadata.level(), &visitor.message, &visitor.fields);
        self.sink.write(category, &line);
    }
}

pub fn format_event_line(timestamp: &str, level: &Level, message: &str, fields: &str) -> String {
    let mut line = format!("[{}] [{}] {}", timestamp, level, message);
    if !fields.is_empty() {
        line.push(' ');
        line.push_str(fields);
    }
    line
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field, format_args!("{}", value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            self.push_field(field, format_args!("{:?}", value));
        }
    }
}

impl LineVisitor {
    fn push_field(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", field.name(), value);
    }
}
