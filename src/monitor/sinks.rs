//! Notification sinks.

use tracing::info;

use super::NotificationSink;
use crate::geofence::NotificationEvent;

/// Writes each notification as a log record.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&mut self, event: &NotificationEvent) {
        info!(
            geofence = %event.geofence_id,
            kind = %event.kind,
            "\u{1F514} {}",
            event.message()
        );
    }
}

/// Keeps notifications in memory until drained.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<NotificationEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[NotificationEvent] {
        &self.events
    }

    pub fn messages(&self) -> Vec<String> {
        self.events.iter().map(|e| e.message().to_string()).collect()
    }

    pub fn drain(&mut self) -> Vec<NotificationEvent> {
        std::mem::take(&mut self.events)
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&mut self, event: &NotificationEvent) {
        self.events.push(event.clone());
    }
}
