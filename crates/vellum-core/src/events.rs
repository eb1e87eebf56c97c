use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Events leaving the render pipeline for the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    OpenViewer {
        rendered_markup: String,
        raw_source: String,
    },
    Notify {
        message: String,
        severity: Severity,
    },
    SendMessage {
        text: String,
    },
}

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<OutboundEvent>,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: OutboundEvent) {
        if self.tx.send(event).is_err() {
            debug!(target: "events", "No subscribers for outbound event");
        }
    }

    pub fn notify(&self, message: impl Into<String>, severity: Severity) {
        self.emit(OutboundEvent::Notify {
            message: message.into(),
            severity,
        });
    }
}
