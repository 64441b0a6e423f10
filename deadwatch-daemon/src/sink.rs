//! Delivery seams for pipeline events.
//!
//! The daemon does not talk to Discord itself; deployments plug their
//! own delivery behind these traits. The default [`TracingSink`] writes
//! every event to the structured log, which is also what keeps the
//! daemon useful when no external delivery is configured.

use std::future::Future;

use deadwatch_core::event::{PresenceEvent, ServerEvent};

/// Receives user-visible events (connections, world events, kills).
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, event: &ServerEvent) -> impl Future<Output = ()> + Send;
}

/// Receives recomputed server counts.
pub trait PresenceUpdater: Send + Sync {
    fn update_presence(&self, event: &PresenceEvent) -> impl Future<Output = ()> + Send;
}

/// Default sink: structured log lines, nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    async fn deliver(&self, event: &ServerEvent) {
        match event {
            ServerEvent::Connection(e) => {
                tracing::info!(
                    server = %e.server,
                    player = %e.player_name,
                    kind = %e.kind,
                    trace_id = %e.metadata.trace_id,
                    "connection event"
                );
            }
            ServerEvent::World(e) => {
                tracing::info!(
                    server = %e.server,
                    kind = %e.kind,
                    name = %e.name,
                    trace_id = %e.metadata.trace_id,
                    "world event"
                );
            }
            ServerEvent::Kill(e) => {
                tracing::info!(
                    server = %e.server,
                    kill = %e.record,
                    trace_id = %e.metadata.trace_id,
                    "kill event"
                );
            }
            // Presence updates flow through PresenceUpdater
            ServerEvent::Presence(e) => self.update_presence(e).await,
        }
    }
}

impl PresenceUpdater for TracingSink {
    async fn update_presence(&self, event: &PresenceEvent) {
        tracing::debug!(
            server = %event.server,
            label = %event.label(),
            trace_id = %event.metadata.trace_id,
            "presence update"
        );
    }
}

#[cfg(test)]
mod tests {
    use deadwatch_core::types::{ServerCounts, ServerKey};

    use super::*;

    #[tokio::test]
    async fn tracing_sink_handles_every_event_kind() {
        let sink = TracingSink;
        let key = ServerKey::new(1, "srv");

        let presence = PresenceEvent::new(
            key.clone(),
            "Server",
            ServerCounts::default(),
            "trace-1",
        );
        sink.deliver(&ServerEvent::Presence(presence)).await;

        let connection = deadwatch_core::event::ConnectionEvent::new(
            key,
            "abc",
            "Alice",
            deadwatch_core::event::ConnectionKind::Joined,
            "trace-2",
        );
        sink.deliver(&ServerEvent::Connection(connection)).await;
    }
}
