//! Message schema types shared by every vantage crate.
//!
//! Producers (network callbacks, playback, the demo source) publish these on
//! the topic bus; displays consume them. The dynamic [`Value`] tree plus
//! [`MessageQuery`] cover messages whose shape is only known at runtime.

pub mod geometry;
pub mod interactive;
pub mod marker;
pub mod value;

pub use geometry::{ColorRgba, PointStamped, Pose, PoseStamped};
pub use interactive::{
    InteractionMode, InteractiveMarker, InteractiveMarkerControl, InteractiveMarkerFeedback,
    InteractiveMarkerInit, InteractiveMarkerPose, InteractiveMarkerUpdate,
};
pub use marker::{Marker, MarkerKind};
pub use value::{MessageQuery, QueryError, Value};
