//! Incident notifications: event types, the `Notifier` seam and the console renderer.
#![allow(clippy::uninlined_format_args)]

/// Console rendering of incident events
pub mod console;
/// Events emitted by feed monitors
pub mod event;

pub use console::ConsoleNotifier;
pub use event::{EventKind, IncidentEvent};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

/// Receives incident events emitted by the monitors.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a single event. Delivery is best-effort and must not block for long.
    async fn notify(&self, event: &IncidentEvent);
}

/// Forward every event from `events` to `notifier` until all senders are dropped.
///
/// Returns the number of events delivered.
pub async fn dispatch<N>(mut events: mpsc::Receiver<IncidentEvent>, notifier: &N) -> usize
where
    N: Notifier + ?Sized,
{
    let mut delivered = 0;
    while let Some(event) = events.recv().await {
        notifier.notify(&event).await;
        delivered += 1;
    }
    debug!(delivered, "event channel closed, notifier stopping");
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use feed::Incident;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(EventKind, String)>>);

    #[async_trait]
    impl Notifier for Recorder {
        async fn notify(&self, event: &IncidentEvent) {
            self.0.lock().unwrap().push((event.kind, event.incident.id.clone()));
        }
    }

    fn event(kind: EventKind, id: &str) -> IncidentEvent {
        IncidentEvent {
            kind,
            incident: Incident {
                id: id.to_owned(),
                provider: "OpenAI".to_owned(),
                title: "t".to_owned(),
                status: "Investigating".to_owned(),
                components: vec![],
                detail: String::new(),
                link: String::new(),
                timestamp: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn dispatch_preserves_order_and_stops_on_close() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(event(EventKind::Historical, "INC-2")).await.unwrap();
        tx.send(event(EventKind::New, "INC-3")).await.unwrap();
        tx.send(event(EventKind::Updated, "INC-1")).await.unwrap();
        drop(tx);

        let recorder = Recorder::default();
        assert_eq!(dispatch(rx, &recorder).await, 3);

        let seen = recorder.0.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                (EventKind::Historical, "INC-2".to_owned()),
                (EventKind::New, "INC-3".to_owned()),
                (EventKind::Updated, "INC-1".to_owned()),
            ]
        );
    }
}
