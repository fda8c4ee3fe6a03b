//! Interactive marker wire messages.
//!
//! An interactive-marker server publishes a full set once (`init`) and
//! incremental changes afterwards (`update`); clients answer user
//! manipulation with `feedback` messages.

use glam::DQuat;
use serde::{Deserialize, Serialize};

use crate::geometry::Pose;
use crate::marker::Marker;

/// How a control reacts to pointer interaction.
///
/// Closed set; the wire carries a raw byte which is decoded with
/// [`InteractionMode::from_wire`] where messages enter the scene layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionMode {
    None,
    MoveAxis,
    MovePlane,
    RotateAxis,
    MoveRotate,
    Move3d,
    Rotate3d,
    Menu,
}

impl InteractionMode {
    /// Decodes the wire byte. Out-of-range values degrade to `None` so a
    /// malformed message renders but never interacts.
    pub fn from_wire(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::MoveAxis,
            2 => Self::MovePlane,
            3 => Self::RotateAxis,
            4 => Self::MoveRotate,
            5 => Self::Move3d,
            6 => Self::Rotate3d,
            7 => Self::Menu,
            other => {
                tracing::debug!(mode = other, "unknown interaction mode, treating as none");
                Self::None
            }
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Self::None => 0,
            Self::MoveAxis => 1,
            Self::MovePlane => 2,
            Self::RotateAxis => 3,
            Self::MoveRotate => 4,
            Self::Move3d => 5,
            Self::Rotate3d => 6,
            Self::Menu => 7,
        }
    }
}

/// One control of an interactive marker: a set of visualization primitives
/// plus the interaction it grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveMarkerControl {
    pub name: String,
    /// Raw interaction mode byte as sent by the server.
    pub interaction_mode: u8,
    /// Orientation of the control's interaction axis/plane relative to the
    /// marker. The x axis is the move axis and the plane/rotation normal.
    pub orientation: DQuat,
    pub markers: Vec<Marker>,
}

/// A remotely-defined, user-manipulable widget composed of controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveMarker {
    /// Unique key within its server's marker set.
    pub name: String,
    pub description: String,
    pub pose: Pose,
    /// Uniform size multiplier applied to all controls.
    pub scale: f64,
    pub controls: Vec<InteractiveMarkerControl>,
}

/// Pose-only update for an existing marker; controls are untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveMarkerPose {
    pub name: String,
    pub pose: Pose,
}

/// Full replacement of a server's marker set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InteractiveMarkerInit {
    pub markers: Vec<InteractiveMarker>,
}

/// Incremental change to a marker set: upserts, pose updates and erasures.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InteractiveMarkerUpdate {
    /// Markers to insert, replacing any existing marker of the same name.
    pub markers: Vec<InteractiveMarker>,
    /// Pose-only mutations of existing markers.
    pub poses: Vec<InteractiveMarkerPose>,
    /// Names to remove. Unknown names are ignored.
    pub erases: Vec<String>,
}

/// Result of a completed user manipulation, sent back to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveMarkerFeedback {
    pub marker_name: String,
    pub control_name: String,
    /// Reference frame of `pose`; filled in by the publishing display.
    pub frame: String,
    pub pose: Pose,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_mode_round_trips() {
        for raw in 0u8..=7 {
            assert_eq!(InteractionMode::from_wire(raw).to_wire(), raw);
        }
    }

    #[test]
    fn unknown_interaction_mode_degrades_to_none() {
        assert_eq!(InteractionMode::from_wire(8), InteractionMode::None);
        assert_eq!(InteractionMode::from_wire(255), InteractionMode::None);
    }
}
