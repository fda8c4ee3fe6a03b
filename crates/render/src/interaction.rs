//! Pointer interaction primitives.
//!
//! The window layer turns pointer events into world-space rays; scene
//! elements hit-test and drag against them. All math is double precision to
//! match message poses.

use glam::DVec3;

/// World-space ray with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn point_at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray of the nearest intersection with a sphere, if
    /// the ray hits it in front of the origin.
    pub fn intersect_sphere(&self, center: DVec3, radius: f64) -> Option<f64> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        let t = -b - sqrt_disc;
        if t >= 0.0 {
            Some(t)
        } else {
            let t = -b + sqrt_disc;
            (t >= 0.0).then_some(t)
        }
    }

    /// Intersection with the plane through `point` with normal `normal`.
    pub fn intersect_plane(&self, point: DVec3, normal: DVec3) -> Option<DVec3> {
        let denom = self.direction.dot(normal);
        if denom.abs() < 1e-9 {
            return None;
        }
        let t = (point - self.origin).dot(normal) / denom;
        (t >= 0.0).then(|| self.point_at(t))
    }

    /// Parameter along the line `anchor + s * axis` of the point closest to
    /// this ray. `axis` must be normalized. Returns `None` when the ray and
    /// the line are (near) parallel.
    pub fn closest_line_param(&self, anchor: DVec3, axis: DVec3) -> Option<f64> {
        let w = self.origin - anchor;
        let b = axis.dot(self.direction);
        let d = axis.dot(w);
        let e = self.direction.dot(w);
        let denom = 1.0 - b * b;
        if denom.abs() < 1e-9 {
            return None;
        }
        Some((d - b * e) / denom)
    }
}

/// Phase of a pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Begin,
    Move,
    End,
}

/// One pointer event, already unprojected into the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    pub phase: PointerPhase,
    pub ray: Ray,
}

impl Interaction {
    pub fn new(phase: PointerPhase, ray: Ray) -> Self {
        Self { phase, ray }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_intersection_from_outside() {
        let ray = Ray::new(DVec3::new(0.0, 0.0, -5.0), DVec3::Z);
        let t = ray.intersect_sphere(DVec3::ZERO, 1.0).unwrap();
        assert!((t - 4.0).abs() < 1e-9);
    }

    #[test]
    fn sphere_miss_and_behind() {
        let ray = Ray::new(DVec3::new(0.0, 3.0, -5.0), DVec3::Z);
        assert!(ray.intersect_sphere(DVec3::ZERO, 1.0).is_none());

        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::Z);
        assert!(ray.intersect_sphere(DVec3::ZERO, 1.0).is_none());
    }

    #[test]
    fn plane_intersection() {
        let ray = Ray::new(DVec3::new(1.0, 1.0, 5.0), -DVec3::Z);
        let hit = ray.intersect_plane(DVec3::ZERO, DVec3::Z).unwrap();
        assert!((hit - DVec3::new(1.0, 1.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn closest_line_param_tracks_ray() {
        // Line along X through origin; ray pointing down onto x = 2.
        let ray = Ray::new(DVec3::new(2.0, 0.0, 5.0), -DVec3::Z);
        let s = ray.closest_line_param(DVec3::ZERO, DVec3::X).unwrap();
        assert!((s - 2.0).abs() < 1e-9);

        // Parallel configuration has no unique answer.
        let ray = Ray::new(DVec3::new(0.0, 1.0, 0.0), DVec3::X);
        assert!(ray.closest_line_param(DVec3::ZERO, DVec3::X).is_none());
    }
}
