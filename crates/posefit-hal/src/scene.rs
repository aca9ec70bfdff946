//! Scene and renderer seams.

use std::sync::Arc;

use posefit_perception::projection::Camera;
use posefit_types::{ObjectTransform, PoseError, Vec3};

/// The 3-D scene hosting the garment model.
///
/// Shared between the loops, hence `Send + Sync`. Both accessors return
/// `None` until the corresponding resource has loaded.
pub trait Scene: Send + Sync {
    fn camera(&self) -> Option<Arc<dyn Camera>>;

    /// Model-space bounding-box size of the garment.
    fn model_size(&self) -> Option<Vec3>;
}

/// Draws the garment model. Owned by the render loop.
pub trait Renderer: Send {
    /// Draw one frame with the model placed at `transform`.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::Renderer`] if the frame could not be presented.
    fn draw(&mut self, transform: &ObjectTransform) -> Result<(), PoseError>;

    /// Release GPU resources. Called once when the render loop stops.
    fn release(&mut self);
}
