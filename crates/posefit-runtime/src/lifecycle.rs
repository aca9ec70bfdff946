//! Loop lifecycle: stop signalling and task handles.
//!
//! A [`StopSignal`] is a latch built on [`tokio::sync::watch`]: once
//! triggered it stays triggered, triggering again is a no-op, and every loop
//! holding a receiver observes it between iterations. It is `Send + Sync`,
//! so it can also be fired from a non-async context such as a Ctrl-C
//! handler thread.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use posefit_types::PoseError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Idempotent, cloneable stop latch.
#[derive(Debug, Clone)]
pub struct StopSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request a stop. Returns `true` only for the call that flipped the
    /// latch.
    pub fn trigger(&self) -> bool {
        let was = self.sender.send_replace(true);
        if !was {
            debug!("stop requested");
        }
        !was
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Shortest period a loop will tick at, whatever rate it is asked for.
pub const MIN_TICK_PERIOD: Duration = Duration::from_micros(100);

/// Tick period for `rate_hz`. A non-positive or non-finite rate falls back
/// to `fallback_hz`; the result is never shorter than [`MIN_TICK_PERIOD`].
pub fn tick_period(rate_hz: f32, fallback_hz: f32) -> Duration {
    let rate = if rate_hz.is_finite() && rate_hz > 0.0 {
        rate_hz
    } else {
        fallback_hz
    };
    Duration::try_from_secs_f32(1.0 / rate)
        .unwrap_or(MIN_TICK_PERIOD)
        .max(MIN_TICK_PERIOD)
}

/// Resolve once `stop` is latched (or its sender is gone).
pub async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|triggered| *triggered).await;
}

/// A spawned loop plus the signal that stops it.
#[derive(Debug)]
pub struct LoopHandle<T> {
    name: &'static str,
    signal: StopSignal,
    task: JoinHandle<T>,
}

impl<T: Send + 'static> LoopHandle<T> {
    /// Spawn `run` on the current runtime. `run` receives its stop receiver.
    pub fn spawn<F, Fut>(name: &'static str, signal: StopSignal, run: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let task = tokio::spawn(run(signal.subscribe()));
        Self { name, signal, task }
    }

    /// Ask the loop to stop. Safe to call any number of times.
    pub fn stop(&self) {
        self.signal.trigger();
    }

    pub fn signal(&self) -> &StopSignal {
        &self.signal
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit and return its result.
    ///
    /// # Errors
    ///
    /// [`PoseError::Channel`] if the loop task panicked or was aborted.
    pub async fn join(self) -> Result<T, PoseError> {
        self.task
            .await
            .map_err(|e| PoseError::Channel(format!("{} task failed: {e}", self.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_idempotent() {
        let signal = StopSignal::new();
        assert!(!signal.is_triggered());
        assert!(signal.trigger());
        assert!(!signal.trigger());
        assert!(signal.is_triggered());
    }

    #[test]
    fn tick_period_follows_rate() {
        let fifty = Duration::from_secs_f32(1.0 / 50.0);
        assert_eq!(tick_period(50.0, 60.0), fifty);
        assert_eq!(tick_period(0.0, 50.0), fifty);
        assert_eq!(tick_period(-3.0, 50.0), fifty);
        assert_eq!(tick_period(f32::NAN, 50.0), fifty);
    }

    #[test]
    fn tick_period_never_rounds_to_zero() {
        assert_eq!(tick_period(1e10, 60.0), MIN_TICK_PERIOD);
        assert_eq!(tick_period(f32::MAX, 60.0), MIN_TICK_PERIOD);
        assert!(tick_period(1e10, 60.0) > Duration::ZERO);
    }

    #[tokio::test]
    async fn late_subscriber_sees_latched_stop() {
        let signal = StopSignal::new();
        signal.trigger();
        let mut rx = signal.subscribe();
        stopped(&mut rx).await;
    }

    #[tokio::test]
    async fn handle_stops_and_joins() {
        let handle = LoopHandle::spawn("counter", StopSignal::new(), |mut stop| async move {
            let mut n = 0u32;
            loop {
                tokio::select! {
                    _ = stopped(&mut stop) => break,
                    _ = tokio::task::yield_now() => n += 1,
                }
            }
            n
        });
        tokio::task::yield_now().await;
        handle.stop();
        handle.stop();
        let _count = handle.join().await.unwrap();
    }

    #[tokio::test]
    async fn clones_share_the_latch() {
        let signal = StopSignal::new();
        let other = signal.clone();
        let mut rx = signal.subscribe();
        other.trigger();
        stopped(&mut rx).await;
        assert!(signal.is_triggered());
    }
}
