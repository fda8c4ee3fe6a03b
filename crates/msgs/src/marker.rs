//! Visualization marker primitives.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::geometry::{ColorRgba, Pose};

/// Primitive shape of a visualization marker.
///
/// The mesh for each kind is owned by the external resource system; displays
/// only reference it by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    Cube,
    Sphere,
    Cylinder,
    Arrow,
}

/// One visualization primitive: shape, local pose, extents and color.
///
/// `scale` holds the full extents along each local axis, so a unit primitive
/// mesh scaled by `scale` fills the marker's bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub pose: Pose,
    pub scale: DVec3,
    pub color: ColorRgba,
}

impl Marker {
    pub fn new(kind: MarkerKind) -> Self {
        Self {
            kind,
            pose: Pose::IDENTITY,
            scale: DVec3::ONE,
            color: ColorRgba::WHITE,
        }
    }
}
