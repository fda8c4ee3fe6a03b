//! Geometric primitives carried inside messages.

use glam::{DMat4, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Straight-alpha RGBA color, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl Default for ColorRgba {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Rigid pose: position + orientation, double precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: DVec3,
    pub orientation: DQuat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        orientation: DQuat::IDENTITY,
    };

    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            orientation: DQuat::IDENTITY,
        }
    }

    /// Pose as a homogeneous transform.
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.orientation, self.position)
    }

    /// Pose combined with a uniform scale, as a homogeneous transform.
    pub fn to_scaled_matrix(&self, scale: DVec3) -> DMat4 {
        DMat4::from_scale_rotation_translation(scale, self.orientation, self.position)
    }

    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.orientation * p + self.position
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A single position in a named reference frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStamped {
    pub frame: String,
    pub point: DVec3,
}

/// A full pose in a named reference frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub frame: String,
    pub pose: Pose,
}
