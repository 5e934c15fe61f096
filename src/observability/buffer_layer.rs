//! tracing layer that feeds the log buffer.

use std::fmt::Write as _;

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::log_buffer::{LogBuffer, LogEvent};

/// Captures every event into a [`LogBuffer`].
///
/// Stacked on top of the normal fmt layer:
///
/// ```ignore
/// let buffer = LogBuffer::new();
/// tracing_subscriber::registry()
///     .with(tracing_subscriber::fmt::layer())
///     .with(BufferLayer::new(buffer.clone()))
///     .init();
/// ```
pub struct BufferLayer {
    buffer: LogBuffer,
}

impl BufferLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S: Subscriber> Layer<S> for BufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(LogEvent {
            timestamp: Utc::now(),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.into_message(),
        });
    }
}

/// Collects the message field plus any extra fields as `key=value` pairs.
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    fields: String,
}

impl MessageVisitor {
    fn into_message(self) -> String {
        match (self.message, self.fields.is_empty()) {
            (Some(message), true) => message,
            (Some(message), false) => format!("{}{}", message, self.fields),
            (None, _) => self.fields.trim_start().to_string(),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::with_default;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_captures_message_and_fields() {
        let buffer = LogBuffer::new();
        let subscriber =
            tracing_subscriber::registry().with(BufferLayer::new(buffer.clone()));

        with_default(subscriber, || {
            tracing::info!(user = "alice", "logged in");
            tracing::warn!("plain warning");
        });

        let recent = buffer.recent(10, None);
        assert_eq!(recent.len(), 2);

        assert_eq!(recent[0].level, "INFO");
        assert!(recent[0].message.contains("logged in"));
        assert!(recent[0].message.contains("user=\"alice\""));

        assert_eq!(recent[1].level, "WARN");
        assert_eq!(recent[1].message, "plain warning");
    }
}
