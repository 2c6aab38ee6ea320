use nalgebra::{Matrix4, Point2, Point3, Vector3, Vector4};

/// Builds the right-handed matrices used by the camera, the placements and
/// the light-space transform. Clip space follows the OpenGL convention
/// (NDC z in [-1, 1]).
pub struct TransformFactory;

#[rustfmt::skip]
impl TransformFactory {
    pub fn rotation_x(angle_rad: f32) -> Matrix4<f32> {
        let (s, c) = angle_rad.sin_cos();
        Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, c,   -s,  0.0,
            0.0, s,   c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn rotation_y(angle_rad: f32) -> Matrix4<f32> {
        let (s, c) = angle_rad.sin_cos();
        Matrix4::new(
            c,   0.0, s,   0.0,
            0.0, 1.0, 0.0, 0.0,
            -s,  0.0, c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn rotation_z(angle_rad: f32) -> Matrix4<f32> {
        let (s, c) = angle_rad.sin_cos();
        Matrix4::new(
            c,   -s,  0.0, 0.0,
            s,   c,   0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn translation(offset: &Vector3<f32>) -> Matrix4<f32> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(offset);
        m
    }

    pub fn scaling_nonuniform(scale: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(scale)
    }

    /// Translation * Rx * Ry * Rz * Scale, with Euler angles in degrees.
    pub fn placement(
        position: &Vector3<f32>,
        rotation_deg: &Vector3<f32>,
        scale: &Vector3<f32>,
    ) -> Matrix4<f32> {
        Self::translation(position)
            * Self::rotation_x(rotation_deg.x.to_radians())
            * Self::rotation_y(rotation_deg.y.to_radians())
            * Self::rotation_z(rotation_deg.z.to_radians())
            * Self::scaling_nonuniform(scale)
    }

    /// Look-at view matrix. The camera looks down its local -Z.
    pub fn view(eye: &Point3<f32>, target: &Point3<f32>, up: &Vector3<f32>) -> Matrix4<f32> {
        let back = (eye - target).normalize();
        let right = up.cross(&back).normalize();
        let true_up = back.cross(&right);

        let rotation = Matrix4::new(
            right.x,   right.y,   right.z,   0.0,
            true_up.x, true_up.y, true_up.z, 0.0,
            back.x,    back.y,    back.z,    0.0,
            0.0,       0.0,       0.0,       1.0,
        );
        rotation * Self::translation(&-eye.coords)
    }

    pub fn perspective(aspect_ratio: f32, fov_y_rad: f32, near: f32, far: f32) -> Matrix4<f32> {
        let focal = 1.0 / (fov_y_rad * 0.5).tan();
        let depth = near - far;

        Matrix4::new(
            focal / aspect_ratio, 0.0,   0.0,                  0.0,
            0.0,                  focal, 0.0,                  0.0,
            0.0,                  0.0,   (far + near) / depth, 2.0 * far * near / depth,
            0.0,                  0.0,   -1.0,                 0.0,
        )
    }

    pub fn orthographic(
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Matrix4<f32> {
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;

        Matrix4::new(
            2.0 / width, 0.0,          0.0,          -(right + left) / width,
            0.0,         2.0 / height, 0.0,          -(top + bottom) / height,
            0.0,         0.0,          -2.0 / depth, -(far + near) / depth,
            0.0,         0.0,          0.0,          1.0,
        )
    }
}

/// Rotates `v` about the unit `axis` (Rodrigues).
pub fn rotate_about_axis(v: &Vector3<f32>, axis: &Vector3<f32>, angle_rad: f32) -> Vector3<f32> {
    let (s, c) = angle_rad.sin_cos();
    v * c + axis.cross(v) * s + axis * axis.dot(v) * (1.0 - c)
}

/// Applies a homogeneous matrix to a point, including the w divide.
pub fn transform_point(m: &Matrix4<f32>, p: &Point3<f32>) -> Point3<f32> {
    apply_perspective_division(&(m * p.to_homogeneous()))
}

/// Clip space -> NDC.
#[inline]
pub fn apply_perspective_division(clip: &Vector4<f32>) -> Point3<f32> {
    if clip.w.abs() > 1e-6 {
        Point3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
    } else {
        Point3::origin()
    }
}

/// NDC -> pixel coordinates. Screen Y grows downward.
#[inline]
pub fn ndc_to_screen(ndc_x: f32, ndc_y: f32, width: f32, height: f32) -> Point2<f32> {
    Point2::new((ndc_x + 1.0) * 0.5 * width, (1.0 - ndc_y) * 0.5 * height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn view_moves_eye_to_origin_looking_down_negative_z() {
        let eye = Point3::new(3.0, 2.0, 5.0);
        let target = Point3::new(3.0, 2.0, 0.0);
        let view = TransformFactory::view(&eye, &target, &Vector3::y());
        assert_relative_eq!(transform_point(&view, &eye), Point3::origin(), epsilon = 1e-5);
        assert_relative_eq!(
            transform_point(&view, &target),
            Point3::new(0.0, 0.0, -5.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn projections_map_near_and_far_to_unit_depth() {
        let persp = TransformFactory::perspective(1.0, 90f32.to_radians(), 0.5, 10.0);
        assert_relative_eq!(
            transform_point(&persp, &Point3::new(0.0, 0.0, -0.5)).z,
            -1.0,
            epsilon = 1e-5
        );
        assert_relative_eq!(
            transform_point(&persp, &Point3::new(0.0, 0.0, -10.0)).z,
            1.0,
            epsilon = 1e-4
        );

        let ortho = TransformFactory::orthographic(-2.0, 2.0, -2.0, 2.0, 1.0, 19.0);
        assert_relative_eq!(
            transform_point(&ortho, &Point3::new(2.0, -2.0, -1.0)),
            Point3::new(1.0, -1.0, -1.0),
            epsilon = 1e-5
        );
        assert_relative_eq!(
            transform_point(&ortho, &Point3::new(0.0, 0.0, -19.0)).z,
            1.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn rodrigues_quarter_turn() {
        let r = rotate_about_axis(&Vector3::x(), &Vector3::y(), std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(r, -Vector3::z(), epsilon = 1e-6);
        let m = TransformFactory::rotation_y(std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(
            transform_point(&m, &Point3::new(1.0, 0.0, 0.0)),
            Point3::new(0.0, 0.0, -1.0),
            epsilon = 1e-6
        );
    }
}
