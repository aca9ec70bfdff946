//! Single-writer transform publication.
//!
//! [`transform_channel`] returns exactly one [`TransformPublisher`] (not
//! `Clone`) and a [`TransformReader`] that can be cloned freely. Every
//! publish swaps in a complete [`TransformSnapshot`], so a reader can never
//! observe a half-written transform, and sequence numbers only grow.
//!
//! # Example
//!
//! ```rust
//! use posefit_middleware::publication::transform_channel;
//! use posefit_types::{ObjectTransform, Vec3};
//!
//! let (mut publisher, reader) = transform_channel(ObjectTransform::default());
//! assert_eq!(reader.latest().sequence, 0);
//!
//! let mut t = ObjectTransform::default();
//! t.position = Vec3::new(0.1, 0.2, -1.3);
//! publisher.publish(t);
//!
//! let snap = reader.latest();
//! assert_eq!(snap.sequence, 1);
//! assert_eq!(snap.transform.position, Vec3::new(0.1, 0.2, -1.3));
//! ```

use posefit_types::{ObjectTransform, PoseError};
use tokio::sync::watch;

/// One published placement of the garment model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSnapshot {
    pub transform: ObjectTransform,
    /// Publish counter; 0 for the initial value.
    pub sequence: u64,
}

/// Create the publication channel seeded with `initial`.
pub fn transform_channel(initial: ObjectTransform) -> (TransformPublisher, TransformReader) {
    let snapshot = TransformSnapshot {
        transform: initial,
        sequence: 0,
    };
    let (tx, rx) = watch::channel(snapshot);
    (
        TransformPublisher {
            sender: tx,
            current: snapshot,
        },
        TransformReader { receiver: rx },
    )
}

/// The sole writer of the rendered transform.
#[derive(Debug)]
pub struct TransformPublisher {
    sender: watch::Sender<TransformSnapshot>,
    current: TransformSnapshot,
}

impl TransformPublisher {
    /// Publish `transform` as the next snapshot and return its sequence
    /// number. Succeeds whether or not any reader is alive.
    pub fn publish(&mut self, transform: ObjectTransform) -> u64 {
        self.current = TransformSnapshot {
            transform,
            sequence: self.current.sequence + 1,
        };
        self.sender.send_replace(self.current);
        self.current.sequence
    }

    /// The last transform this publisher wrote.
    pub fn current(&self) -> &ObjectTransform {
        &self.current.transform
    }

    pub fn sequence(&self) -> u64 {
        self.current.sequence
    }

    /// An additional reader on this channel.
    pub fn reader(&self) -> TransformReader {
        TransformReader {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Read side of the publication channel.
#[derive(Debug, Clone)]
pub struct TransformReader {
    receiver: watch::Receiver<TransformSnapshot>,
}

impl TransformReader {
    /// Copy of the most recently published snapshot. Never blocks on the
    /// writer for longer than the copy itself.
    pub fn latest(&self) -> TransformSnapshot {
        *self.receiver.borrow()
    }

    /// Wait for a snapshot newer than the last one this reader saw.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::Channel`] once the publisher has been dropped.
    pub async fn changed(&mut self) -> Result<TransformSnapshot, PoseError> {
        self.receiver
            .changed()
            .await
            .map_err(|e| PoseError::Channel(format!("transform publisher gone: {e}")))?;
        Ok(*self.receiver.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posefit_types::Vec3;

    fn at(x: f32) -> ObjectTransform {
        ObjectTransform {
            position: Vec3::new(x, x, x),
            ..ObjectTransform::default()
        }
    }

    #[test]
    fn sequence_increments_per_publish() {
        let (mut publisher, reader) = transform_channel(ObjectTransform::default());
        assert_eq!(publisher.publish(at(1.0)), 1);
        assert_eq!(publisher.publish(at(2.0)), 2);
        assert_eq!(reader.latest().sequence, 2);
        assert_eq!(publisher.current().position.x, 2.0);
    }

    #[test]
    fn publish_without_readers_still_updates_current() {
        let (mut publisher, reader) = transform_channel(ObjectTransform::default());
        drop(reader);
        publisher.publish(at(5.0));
        assert_eq!(publisher.sequence(), 1);
        assert_eq!(publisher.reader().latest().transform.position.x, 5.0);
    }

    #[tokio::test]
    async fn changed_wakes_on_publish() {
        let (mut publisher, mut reader) = transform_channel(ObjectTransform::default());
        let waiter = tokio::spawn(async move { reader.changed().await });
        tokio::task::yield_now().await;
        publisher.publish(at(3.0));
        let snap = waiter.await.unwrap().unwrap();
        assert_eq!(snap.sequence, 1);
    }

    #[tokio::test]
    async fn changed_errors_when_publisher_dropped() {
        let (publisher, mut reader) = transform_channel(ObjectTransform::default());
        drop(publisher);
        assert!(matches!(reader.changed().await, Err(PoseError::Channel(_))));
    }

    #[tokio::test]
    async fn concurrent_reader_sees_whole_monotonic_snapshots() {
        let (mut publisher, reader) = transform_channel(ObjectTransform::default());
        let observer = tokio::spawn(async move {
            let mut last = 0;
            for _ in 0..500 {
                let snap = reader.latest();
                assert!(snap.sequence >= last);
                // Every published transform has all three components equal.
                let p = snap.transform.position;
                assert!(p.x == p.y && p.y == p.z);
                last = snap.sequence;
                tokio::task::yield_now().await;
            }
            last
        });
        for i in 1..=500 {
            publisher.publish(at(i as f32));
            tokio::task::yield_now().await;
        }
        let last = observer.await.unwrap();
        assert!(last <= 500);
    }
}
