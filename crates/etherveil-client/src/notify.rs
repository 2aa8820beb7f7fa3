//! Notification sinks.
//!
//! The orchestrator reports each lifecycle event exactly once; what the
//! sink does with it (toast, log line, channel to a UI task) is up to the
//! application.

use etherveil_types::VaultEvent;
use tokio::sync::mpsc;

/// Receives lifecycle events. Must not block.
pub trait NotificationSink: Send + Sync {
    fn report(&self, event: &VaultEvent);
}

/// Writes every event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn report(&self, event: &VaultEvent) {
        match event {
            VaultEvent::Submitted {
                record_id,
                operation,
            } => tracing::info!(
                record = %record_id,
                operation = %operation,
                "{}", event.title()
            ),
            VaultEvent::Confirmed { record_id } => {
                tracing::info!(record = %record_id, "{}", event.title());
            }
            VaultEvent::Failed { record_id, reason } => {
                tracing::warn!(record = %record_id, reason = %reason, "{}", event.title());
            }
        }
    }
}

/// Forwards events to an unbounded channel, typically read by a UI task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<VaultEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<VaultEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn report(&self, event: &VaultEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::debug!(record = %event.record_id(), "Notification receiver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherveil_types::{FailureReason, RecordId};

    #[test]
    fn channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.report(&VaultEvent::Confirmed {
            record_id: RecordId(1),
        });
        sink.report(&VaultEvent::Failed {
            record_id: RecordId(2),
            reason: FailureReason::DroppedOrTimedOut,
        });

        assert_eq!(rx.try_recv().unwrap().record_id(), RecordId(1));
        assert_eq!(rx.try_recv().unwrap().record_id(), RecordId(2));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_sink_survives_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.report(&VaultEvent::Confirmed {
            record_id: RecordId(1),
        });
    }
}
