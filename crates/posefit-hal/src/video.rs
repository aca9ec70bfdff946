//! Video feed seam.

use posefit_types::FrameSize;

/// One captured frame of the video feed.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub size: FrameSize,
    /// Monotonic capture counter.
    pub sequence: u64,
    /// Raw pixel data (e.g. RGBA8). May be empty for synthetic feeds.
    pub data: Vec<u8>,
}

/// A live video feed, owned by the pose loop.
pub trait FrameSource: Send {
    /// Frame dimensions, or `None` until the feed's metadata has loaded.
    fn frame_size(&self) -> Option<FrameSize>;

    /// Grab the most recent frame, or `None` if none is available yet.
    fn current_frame(&mut self) -> Option<VideoFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StillFeed {
        sequence: u64,
    }

    impl FrameSource for StillFeed {
        fn frame_size(&self) -> Option<FrameSize> {
            Some(FrameSize::new(2, 2))
        }

        fn current_frame(&mut self) -> Option<VideoFrame> {
            self.sequence += 1;
            Some(VideoFrame {
                size: FrameSize::new(2, 2),
                sequence: self.sequence,
                data: vec![0u8; 2 * 2 * 4],
            })
        }
    }

    #[test]
    fn still_feed_counts_frames() {
        let mut feed = StillFeed { sequence: 0 };
        assert_eq!(feed.frame_size(), Some(FrameSize::new(2, 2)));
        feed.current_frame();
        let frame = feed.current_frame().unwrap();
        assert_eq!(frame.sequence, 2);
        assert_eq!(frame.data.len(), 16);
    }
}
