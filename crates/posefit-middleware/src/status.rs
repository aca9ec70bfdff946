//! Status indicator bus.
//!
//! Uses [`tokio::sync::broadcast`] so every subscriber (CLI log, overlay
//! widget, tests) receives every [`StatusEvent`] without a slow subscriber
//! blocking the pose loop. Status updates are best-effort: publishing with no
//! subscriber is reported as an error the caller may ignore.

use posefit_types::{PoseError, StatusEvent};
use tokio::sync::broadcast;
use tracing::warn;

/// Number of buffered events before old ones are dropped for slow
/// subscribers.
const DEFAULT_CAPACITY: usize = 64;

/// Shared status bus. Clones share the same channel.
#[derive(Clone, Debug)]
pub struct StatusBus {
    sender: broadcast::Sender<StatusEvent>,
}

impl StatusBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish `event` and return the number of subscribers handed it.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::Channel`] when nobody is subscribed.
    pub fn publish(&self, event: StatusEvent) -> Result<usize, PoseError> {
        self.sender
            .send(event)
            .map_err(|e| PoseError::Channel(format!("status bus send error: {e}")))
    }

    pub fn subscribe(&self) -> StatusSubscriber {
        StatusSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receiving end of the [`StatusBus`].
pub struct StatusSubscriber {
    receiver: broadcast::Receiver<StatusEvent>,
}

impl StatusSubscriber {
    /// Wait for the next status event, skipping over any the subscriber
    /// missed by lagging. Returns `None` once the bus is closed.
    pub async fn recv(&mut self) -> Option<StatusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged_by = n, "status subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<StatusEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(lagged_by = n, "status subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posefit_types::{StatusLevel, TrackingState};

    fn make_event(message: &str) -> StatusEvent {
        StatusEvent::new(
            "posefit-middleware::test",
            StatusLevel::Good,
            message,
            TrackingState::default(),
        )
    }

    #[tokio::test]
    async fn publish_and_receive() -> Result<(), Box<dyn std::error::Error>> {
        let bus = StatusBus::default();
        let mut sub = bus.subscribe();

        let event = make_event("Pose detector ready");
        bus.publish(event.clone())?;

        let received = sub.recv().await.ok_or("no event received")?;
        assert_eq!(received.id, event.id);
        assert_eq!(received.message, "Pose detector ready");
        Ok(())
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() -> Result<(), Box<dyn std::error::Error>> {
        let bus = StatusBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let event = make_event("Tracking (85% confidence)");
        bus.publish(event.clone())?;

        assert_eq!(a.recv().await.ok_or("a")?.id, event.id);
        assert_eq!(b.recv().await.ok_or("b")?.id, event.id);
        Ok(())
    }

    #[test]
    fn publish_no_subscribers_returns_error() {
        let bus = StatusBus::default();
        assert!(matches!(
            bus.publish(make_event("nobody home")),
            Err(PoseError::Channel(_))
        ));
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_to_newest() {
        let bus = StatusBus::new(4);
        let mut slow = bus.subscribe();
        for i in 0..20 {
            let _ = bus.publish(make_event(&format!("event {i}")));
        }
        let first = slow.recv().await.unwrap();
        assert_eq!(first.message, "event 16");
    }

    #[test]
    fn try_recv_on_empty_bus() {
        let bus = StatusBus::default();
        let mut sub = bus.subscribe();
        assert!(sub.try_recv().is_none());
        bus.publish(make_event("x")).unwrap();
        assert_eq!(sub.try_recv().unwrap().message, "x");
    }
}
