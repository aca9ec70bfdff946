//! [`PoseHistory`] – bounded ring of recent smoothed poses.
//!
//! Keeps the last *N* smoothed [`PoseMetrics`] the pose loop applied, oldest
//! first, so that motion can be extrapolated across short detection gaps.
//!
//! # Example
//!
//! ```rust
//! use posefit_runtime::history::PoseHistory;
//! # use posefit_types::PoseMetrics;
//! # let m = |x: f32| PoseMetrics { shoulder_width_px: 1.0, torso_height_px: 1.0,
//! #     shoulder_angle_rad: 0.0, center_x: x, center_y: 0.0, confidence: 1.0, depth: 1.0 };
//!
//! let mut history = PoseHistory::new(2);
//! history.push(m(1.0));
//! history.push(m(2.0));
//! history.push(m(3.0)); // evicts the oldest
//!
//! assert_eq!(history.len(), 2);
//! assert_eq!(history.latest().unwrap().center_x, 3.0);
//! ```

use std::collections::VecDeque;

use posefit_types::PoseMetrics;

pub struct PoseHistory {
    capacity: usize,
    entries: VecDeque<PoseMetrics>,
}

impl PoseHistory {
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, metrics: PoseMetrics) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(metrics);
    }

    pub fn latest(&self) -> Option<&PoseMetrics> {
        self.entries.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &PoseMetrics> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(x: f32) -> PoseMetrics {
        PoseMetrics {
            shoulder_width_px: 200.0,
            torso_height_px: 215.0,
            shoulder_angle_rad: 0.0,
            center_x: x,
            center_y: 185.0,
            confidence: 0.85,
            depth: 1.3,
        }
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut h = PoseHistory::new(5);
        for i in 0..8 {
            h.push(m(i as f32));
        }
        assert_eq!(h.len(), 5);
        let xs: Vec<f32> = h.iter().map(|p| p.center_x).collect();
        assert_eq!(xs, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn clear_empties() {
        let mut h = PoseHistory::new(3);
        h.push(m(1.0));
        h.clear();
        assert!(h.is_empty());
        assert!(h.latest().is_none());
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut h = PoseHistory::new(0);
        h.push(m(1.0));
        h.push(m(2.0));
        assert_eq!(h.capacity(), 1);
        assert_eq!(h.latest().unwrap().center_x, 2.0);
    }
}
