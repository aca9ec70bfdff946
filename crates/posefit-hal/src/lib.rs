//! `posefit-hal` – collaborator seams
//!
//! The engine never touches a camera, a neural network or a GPU directly. It
//! talks to four traits, and ships simulated implementations of each so the
//! whole pipeline runs headless in tests and CI.
//!
//! # Modules
//!
//! - [`detector`] – [`Detector`][detector::Detector]: async keypoint
//!   estimation with an explicit dispose step, plus [`RawKeypoint`][detector::RawKeypoint]
//!   parsing at the seam.
//! - [`video`] – [`FrameSource`][video::FrameSource] and [`VideoFrame`][video::VideoFrame].
//! - [`scene`] – [`Scene`][scene::Scene] (camera + model bounds) and
//!   [`Renderer`][scene::Renderer].
//! - [`sim`] – in-process simulated detector, video feed, scene and renderer.

pub mod detector;
pub mod scene;
pub mod sim;
pub mod video;

pub use detector::{Detector, RawKeypoint};
pub use scene::{Renderer, Scene};
pub use video::{FrameSource, VideoFrame};
