//! Outbound status events for a badge or indicator surface.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::session::SessionPhase;

/// Published after every successful apply or restore, including the ones
/// triggered by scroll and mutation timers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub visible_extent: f64,
    pub total_extent: f64,
    pub windowed: bool,
}

/// Payload of the `get-status` command and of successful apply/restore
/// responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Whether a content parent has been found for this session.
    pub available: bool,
    pub total_extent: f64,
    pub hidden_extent: f64,
    pub visible_extent: f64,
    pub hidden_count: usize,
    pub windowed: bool,
    pub session_id: String,
    pub phase: SessionPhase,
}

impl StatusReport {
    pub fn event(&self) -> StatusEvent {
        StatusEvent {
            visible_extent: self.visible_extent,
            total_extent: self.total_extent,
            windowed: self.windowed,
        }
    }
}

pub trait StatusSink: Send {
    fn publish(&mut self, event: StatusEvent);
}

/// Logs each event. Used when nothing else is listening.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn publish(&mut self, event: StatusEvent) {
        info!(
            visible_extent = event.visible_extent,
            total_extent = event.total_extent,
            windowed = event.windowed,
            "Status update"
        );
    }
}

/// Collects events in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct RecordingStatusSink {
    events: Arc<Mutex<Vec<StatusEvent>>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<StatusEvent> {
        self.events
            .lock()
            .ok()
            .and_then(|events| events.last().copied())
    }
}

impl StatusSink for RecordingStatusSink {
    fn publish(&mut self, event: StatusEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Forwards events over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelStatusSink {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelStatusSink {
    pub fn new(tx: mpsc::UnboundedSender<StatusEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl StatusSink for ChannelStatusSink {
    fn publish(&mut self, event: StatusEvent) {
        if self.tx.send(event).is_err() {
            debug!("Status receiver dropped; discarding event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(windowed: bool) -> StatusEvent {
        StatusEvent {
            visible_extent: 5000.0,
            total_extent: 15_000.0,
            windowed,
        }
    }

    #[test]
    fn recording_sink_clones_share_events() {
        let sink = RecordingStatusSink::new();
        let mut writer = sink.clone();
        writer.publish(event(true));
        writer.publish(event(false));

        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.last(), Some(event(false)));
    }

    #[test]
    fn channel_sink_tolerates_closed_receiver() {
        let (mut sink, mut rx) = ChannelStatusSink::channel();
        sink.publish(event(true));
        assert_eq!(rx.try_recv().ok(), Some(event(true)));

        drop(rx);
        sink.publish(event(false));
    }

    #[test]
    fn event_serializes_in_camel_case() {
        let value = serde_json::to_value(event(true)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"visibleExtent": 5000.0, "totalExtent": 15000.0, "windowed": true})
        );
    }
}
