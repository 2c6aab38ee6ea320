use crate::scene::camera::Camera;

/// Ignore pointer jitter below this many pixels.
const DRAG_THRESHOLD: f32 = 0.5;
/// egui reports scroll in points; one notch is roughly this many.
const POINTS_PER_NOTCH: f32 = 50.0;

/// Turns pointer drags into orbits around the camera target and scrolling
/// into dolly moves.
#[derive(Debug, Clone)]
pub struct OrbitController {
    /// Radians per dragged pixel.
    pub orbit_sensitivity: f32,
    /// World units per scroll notch.
    pub zoom_speed: f32,
}

impl OrbitController {
    pub fn new(orbit_sensitivity: f32, zoom_speed: f32) -> Self {
        Self {
            orbit_sensitivity,
            zoom_speed,
        }
    }

    /// Applies one frame of input. Returns true when the camera moved.
    pub fn apply(&self, camera: &mut Camera, drag: [f32; 2], scroll: f32) -> bool {
        let mut moved = false;
        if drag[0].abs() + drag[1].abs() >= DRAG_THRESHOLD {
            camera.orbit(drag[0] * self.orbit_sensitivity, drag[1] * self.orbit_sensitivity);
            moved = true;
        }
        if scroll.abs() > 0.1 {
            camera.zoom(scroll / POINTS_PER_NOTCH * self.zoom_speed);
            moved = true;
        }
        moved
    }

    /// Reads drag and scroll from the image widget's response.
    pub fn handle(
        &self,
        response: &egui::Response,
        ctx: &egui::Context,
        camera: &mut Camera,
    ) -> bool {
        let drag = if response.dragged() {
            let d = response.drag_delta();
            [d.x, d.y]
        } else {
            [0.0, 0.0]
        };
        let scroll = if response.hovered() {
            ctx.input(|i| i.smooth_scroll_delta.y)
        } else {
            0.0
        };
        self.apply(camera, drag, scroll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn camera() -> Camera {
        Camera::new_perspective(
            Point3::new(0.0, 1.0, 5.0),
            Point3::origin(),
            Vector3::y(),
            1.0,
            1.0,
            0.1,
            50.0,
        )
    }

    #[test]
    fn tiny_drags_are_ignored() {
        let controller = OrbitController::new(0.01, 0.5);
        let mut cam = camera();
        assert!(!controller.apply(&mut cam, [0.1, 0.1], 0.0));
        assert_eq!(cam.position, camera().position);
    }

    #[test]
    fn scrolling_up_moves_closer() {
        let controller = OrbitController::new(0.01, 0.5);
        let mut cam = camera();
        let before = (cam.position - cam.target).norm();
        assert!(controller.apply(&mut cam, [0.0, 0.0], POINTS_PER_NOTCH));
        assert_relative_eq!((cam.position - cam.target).norm(), before - 0.5, epsilon = 1e-4);
    }
}
