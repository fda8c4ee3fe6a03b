//! Interface to the external 2D painting layer.
//!
//! Displays paint through this trait on the paint thread; the viewer backs
//! it with egui. Coordinates are pixels with the origin at the top left of
//! the display's paint area.

use glam::{DVec3, Mat4, Vec2};
use vantage_msgs::ColorRgba;
use vantage_render::CameraBlock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub color: ColorRgba,
}

impl Stroke {
    pub fn new(width: f32, color: ColorRgba) -> Self {
        Self { width, color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Center,
    LeftCenter,
    RightCenter,
    CenterTop,
    CenterBottom,
}

/// Immediate-mode painting operations, implemented by the window layer.
pub trait Painter {
    /// Size of the paint area in pixels.
    fn extent(&self) -> Vec2;

    fn fill_rect(&mut self, min: Vec2, max: Vec2, color: ColorRgba);

    fn stroke_rect(&mut self, min: Vec2, max: Vec2, stroke: Stroke);

    fn line(&mut self, from: Vec2, to: Vec2, stroke: Stroke);

    fn polyline(&mut self, points: &[Vec2], stroke: Stroke);

    fn text(&mut self, pos: Vec2, anchor: TextAnchor, text: &str, size: f32, color: ColorRgba);
}

/// Projects a world point to pixel coordinates within `viewport`. Points at
/// or behind the camera plane project to `None`.
pub fn project(camera: &CameraBlock, viewport: Vec2, world: DVec3) -> Option<Vec2> {
    let view = Mat4::from_cols_array_2d(&camera.view);
    let projection = Mat4::from_cols_array_2d(&camera.projection);
    let clip = projection * view * world.as_vec3().extend(1.0);
    if clip.w <= 1e-6 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vec2::new(
        (ndc.x * 0.5 + 0.5) * viewport.x,
        (1.0 - (ndc.y * 0.5 + 0.5)) * viewport.y,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn looking_down_z() -> CameraBlock {
        CameraBlock {
            view: Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y)
                .to_cols_array_2d(),
            projection: Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0)
                .to_cols_array_2d(),
        }
    }

    #[test]
    fn center_point_projects_to_viewport_center() {
        let camera = looking_down_z();
        let px = project(&camera, Vec2::new(200.0, 200.0), DVec3::ZERO).unwrap();
        assert!((px - Vec2::new(100.0, 100.0)).length() < 1e-3);
    }

    #[test]
    fn points_behind_camera_do_not_project() {
        let camera = looking_down_z();
        assert!(project(&camera, Vec2::new(200.0, 200.0), DVec3::new(0.0, 0.0, 10.0)).is_none());
    }
}
