//! Orbit camera and pointer-to-world-ray unprojection.

use glam::{DMat4, DVec3, Mat4};
use vantage_render::{CameraBlock, Ray};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Y-up orbit camera around a scene target.
#[derive(Debug, Clone)]
pub struct Camera {
    pub target: DVec3,
    pub radius: f64,
    pub azimuth_rad: f64,
    pub elevation_rad: f64,
    pub proj: Mat4,
    position: DVec3,
}

impl Camera {
    pub fn new(target: DVec3, radius: f64, proj: Mat4) -> Self {
        let mut camera = Self {
            target,
            radius,
            azimuth_rad: 45f64.to_radians(),
            elevation_rad: 25f64.to_radians(),
            proj,
            position: DVec3::ZERO,
        };
        camera.update();
        camera
    }

    /// Recomputes the camera position from the orbital parameters. Call
    /// after changing any of them.
    pub fn update(&mut self) {
        let (sin_az, cos_az) = self.azimuth_rad.sin_cos();
        let (sin_el, cos_el) = self.elevation_rad.sin_cos();
        let offset = DVec3::new(cos_el * sin_az, sin_el, cos_el * cos_az) * self.radius;
        self.position = self.target + offset;
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(
            self.position.as_vec3(),
            self.target.as_vec3(),
            glam::Vec3::Y,
        )
    }

    pub fn block(&self) -> CameraBlock {
        CameraBlock {
            view: self.view().to_cols_array_2d(),
            projection: self.proj.to_cols_array_2d(),
        }
    }

    /// World ray under the cursor, for marker hit-testing.
    pub fn screen_ray(&self, cursor: (f64, f64), viewport: (f64, f64)) -> Ray {
        let ndc_x = 2.0 * cursor.0 / viewport.0.max(1.0) - 1.0;
        let ndc_y = 1.0 - 2.0 * cursor.1 / viewport.1.max(1.0);
        let inverse = (self.proj.as_dmat4() * self.view().as_dmat4()).inverse();
        // Any depth inside the frustum works; the direction is what matters.
        let world = inverse.project_point3(DVec3::new(ndc_x, ndc_y, 0.5));
        Ray::new(self.position, world - self.position)
    }
}

pub struct CameraController {
    orbiting: bool,
    last_cursor: Option<(f64, f64)>,
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            orbiting: false,
            last_cursor: None,
        }
    }

    /// Feeds window events into the orbit/zoom state. Events consumed by
    /// egui or by marker interaction must not reach this.
    pub fn handle_event(&mut self, event: &WindowEvent, camera: &mut Camera) {
        match event {
            WindowEvent::MouseInput { button, state, .. } => {
                if *button == MouseButton::Left {
                    self.orbiting = *state == ElementState::Pressed;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved((position.x, position.y), camera);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y as f64,
                    MouseScrollDelta::PixelDelta(pos) => pos.y / 120.0,
                };
                camera.radius = (camera.radius * 1.1f64.powf(-scroll)).clamp(0.5, 500.0);
                camera.update();
            }
            _ => {}
        }
    }

    pub fn stop_orbit(&mut self) {
        self.orbiting = false;
    }

    fn cursor_moved(&mut self, cursor: (f64, f64), camera: &mut Camera) {
        if let (Some(last), true) = (self.last_cursor, self.orbiting) {
            let dx = (cursor.0 - last.0) * 0.005;
            let dy = (cursor.1 - last.1) * 0.005;
            camera.azimuth_rad -= dx;
            camera.elevation_rad = (camera.elevation_rad + dy)
                .clamp((-86f64).to_radians(), 86f64.to_radians());
            camera.update();
        }
        self.last_cursor = Some(cursor);
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(
            DVec3::ZERO,
            10.0,
            Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 1000.0),
        )
    }

    #[test]
    fn center_cursor_ray_passes_through_the_target() {
        let camera = camera();
        let ray = camera.screen_ray((400.0, 300.0), (800.0, 600.0));
        // Distance from the target to the ray must be ~zero.
        let to_target = camera.target - ray.origin;
        let closest = ray.point_at(to_target.dot(ray.direction));
        assert!((closest - camera.target).length() < 1e-3);
    }

    #[test]
    fn orbit_preserves_the_radius() {
        let mut camera = camera();
        let mut controller = CameraController::new();
        controller.handle_event(
            &WindowEvent::MouseInput {
                device_id: unsafe { winit::event::DeviceId::dummy() },
                state: ElementState::Pressed,
                button: MouseButton::Left,
            },
            &mut camera,
        );
        controller.cursor_moved((0.0, 0.0), &mut camera);
        controller.cursor_moved((50.0, 20.0), &mut camera);
        assert!(((camera.position() - camera.target).length() - camera.radius).abs() < 1e-9);
    }
}
