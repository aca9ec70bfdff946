//! [`RenderLoop`] – draws the latest published transform at display rate.
//!
//! The render loop never waits on detection: every tick it reads whatever
//! [`TransformReader::latest`] holds and hands it to the [`Renderer`]. Draw
//! failures are logged and the loop carries on.

use std::time::Duration;

use posefit_hal::Renderer;
use posefit_middleware::TransformReader;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::lifecycle::{stopped, tick_period};

const DEFAULT_RATE_HZ: f32 = 60.0;

pub struct RenderLoop {
    renderer: Box<dyn Renderer>,
    reader: TransformReader,
    period: Duration,
}

impl RenderLoop {
    /// A non-positive or non-finite `rate_hz` falls back to 60 Hz.
    pub fn new(renderer: Box<dyn Renderer>, reader: TransformReader, rate_hz: f32) -> Self {
        Self {
            renderer,
            reader,
            period: tick_period(rate_hz, DEFAULT_RATE_HZ),
        }
    }

    /// Draw the current snapshot once.
    pub fn frame(&mut self) -> bool {
        let snapshot = self.reader.latest();
        match self.renderer.draw(&snapshot.transform) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, sequence = snapshot.sequence, "draw failed");
                false
            }
        }
    }

    /// Run until `stop` is latched, then release the renderer. Returns the
    /// number of successful draws.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> u64 {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_us = self.period.as_micros() as u64, "render loop started");

        let mut draws = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut stop) => break,
                _ = interval.tick() => {
                    if self.frame() {
                        draws += 1;
                    }
                }
            }
        }

        self.renderer.release();
        debug!("renderer released");
        info!(draws, "render loop stopped");
        draws
    }
}
