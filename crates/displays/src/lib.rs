//! Scene displays: the dynamic elements of the viewer.
//!
//! A display owns its configuration, subscribes to whatever topics it needs
//! and implements the [`SceneNode`] sync/async protocol. 3D output goes into
//! the frame's `RenderList`; 2D output (plots, marker labels) goes through
//! the [`Painter`] seam.

pub mod interactive;
pub mod marker;
pub mod paint;
pub mod plot;
pub mod registry;

use vantage_render::{CameraBlock, SceneNode};

pub use interactive::{
    InteractiveMarkerArray, InteractiveMarkerDisplay, InteractiveMarkerDisplayConfig,
    InteractivePoseDisplay, PoseDisplayConfig,
};
pub use marker::MeshSource;
pub use paint::Painter;
pub use plot::{PlotDisplay, PlotDisplayConfig, PlotStyle};
pub use registry::{DisplayContext, DisplayRegistry};

/// A display plugs into the generic lifecycle: it is created by kind through
/// the [`DisplayRegistry`], refreshed after configuration edits and driven
/// through the sync/async phases every frame.
pub trait Display: SceneNode {
    fn name(&self) -> &str;

    /// Reapplies presentation invariants after a configuration edit (e.g.
    /// the trailing blank row of the plot topic list).
    fn refresh(&self) {}

    /// 2D overlay output on the paint thread. Reads snapshots only, like
    /// [`SceneNode::render_async`].
    fn paint(&self, painter: &mut dyn Painter, camera: &CameraBlock) {
        let _ = (painter, camera);
    }
}
