use crate::core::math::transform::TransformFactory;
use nalgebra::{Matrix4, Point3, Vector3};

const MIN_DISTANCE: f32 = 0.5;
const MAX_PITCH: f32 = 1.5;

/// Perspective camera with cached view and projection matrices.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov_y_rad: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,

    view_matrix: Matrix4<f32>,
    projection_matrix: Matrix4<f32>,
}

impl Camera {
    pub fn new_perspective(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov_y_rad: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mut cam = Self {
            position,
            target,
            up,
            fov_y_rad,
            aspect_ratio,
            near,
            far,
            view_matrix: Matrix4::identity(),
            projection_matrix: Matrix4::identity(),
        };
        cam.update_matrices();
        cam
    }

    pub fn update_matrices(&mut self) {
        self.view_matrix = TransformFactory::view(&self.position, &self.target, &self.up);
        self.projection_matrix =
            TransformFactory::perspective(self.aspect_ratio, self.fov_y_rad, self.near, self.far);
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 && aspect_ratio != self.aspect_ratio {
            self.aspect_ratio = aspect_ratio;
            self.update_matrices();
        }
    }

    /// Rotates the eye around the target. Pitch is clamped short of the poles.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        let offset = self.position - self.target;
        let radius = offset.norm();
        if radius < f32::EPSILON {
            return;
        }
        let yaw = offset.z.atan2(offset.x) + delta_yaw;
        let pitch = ((offset.y / radius).clamp(-1.0, 1.0).asin() + delta_pitch)
            .clamp(-MAX_PITCH, MAX_PITCH);

        let (sp, cp) = pitch.sin_cos();
        let (sy, cy) = yaw.sin_cos();
        self.position = self.target + Vector3::new(cp * cy, sp, cp * sy) * radius;
        self.update_matrices();
    }

    /// Moves the eye towards (positive) or away from the target.
    pub fn zoom(&mut self, amount: f32) {
        let offset = self.position - self.target;
        let distance = (offset.norm() - amount).max(MIN_DISTANCE);
        self.position = self.target + offset.normalize() * distance;
        self.update_matrices();
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.view_matrix
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix * self.view_matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> Camera {
        Camera::new_perspective(
            Point3::new(0.0, 2.0, 8.0),
            Point3::new(0.0, 1.0, 0.0),
            Vector3::y(),
            60f32.to_radians(),
            16.0 / 9.0,
            0.1,
            100.0,
        )
    }

    #[test]
    fn orbit_keeps_distance() {
        let mut cam = camera();
        let before = (cam.position - cam.target).norm();
        cam.orbit(0.7, 0.2);
        assert_relative_eq!((cam.position - cam.target).norm(), before, epsilon = 1e-4);
        cam.orbit(0.0, 10.0);
        assert!((cam.position - cam.target).normalize().y < 1.0);
    }

    #[test]
    fn zoom_stops_short_of_target() {
        let mut cam = camera();
        cam.zoom(100.0);
        assert_relative_eq!((cam.position - cam.target).norm(), MIN_DISTANCE, epsilon = 1e-5);
    }
}
