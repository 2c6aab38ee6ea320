use crate::core::math::transform::TransformFactory;
use nalgebra::{Matrix4, Vector3};

/// Which scene-owned geometry a placement draws, by index into the owning `Scene`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawableRef {
    Model(usize),
    /// Each plant part carries its own material; the placement material is ignored.
    Plant(usize),
}

/// One placed instance of scene geometry.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub drawable: DrawableRef,
    pub transform: Matrix4<f32>,
    pub material: String,
    pub casts_shadow: bool,
}

impl SceneObject {
    pub fn new(
        name: impl Into<String>,
        drawable: DrawableRef,
        transform: Matrix4<f32>,
        material: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            drawable,
            transform,
            material: material.into(),
            casts_shadow: true,
        }
    }

    pub fn placed(
        name: impl Into<String>,
        drawable: DrawableRef,
        position: [f32; 3],
        rotation_deg: [f32; 3],
        scale: [f32; 3],
        material: impl Into<String>,
    ) -> Self {
        let transform = TransformFactory::placement(
            &Vector3::from(position),
            &Vector3::from(rotation_deg),
            &Vector3::from(scale),
        );
        Self::new(name, drawable, transform, material)
    }

    pub fn with_shadow(mut self, casts_shadow: bool) -> Self {
        self.casts_shadow = casts_shadow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::transform::transform_point;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn placement_scales_then_moves() {
        let obj = SceneObject::placed(
            "desk",
            DrawableRef::Model(0),
            [1.0, 0.0, -2.0],
            [0.0; 3],
            [2.0; 3],
            "oak",
        );
        let p = transform_point(&obj.transform, &Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p, Point3::new(3.0, 2.0, 0.0), epsilon = 1e-5);
        assert!(obj.casts_shadow);
        assert!(!obj.with_shadow(false).casts_shadow);
    }
}
