use crate::pipeline::shadow_map::LightKind;
use nalgebra::{Point3, Vector3};

/// Constant, linear and quadratic falloff used by the ceiling lamps.
pub const DEFAULT_ATTENUATION: (f32, f32, f32) = (1.0, 0.09, 0.032);

/// A light source in the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    /// Infinitely far away (the sun). `direction` is the way the light travels.
    Directional {
        direction: Vector3<f32>,
        color: Vector3<f32>,
        intensity: f32,
    },
    /// Radiates in all directions from `position`.
    Point {
        position: Point3<f32>,
        color: Vector3<f32>,
        intensity: f32,
        /// (constant, linear, quadratic)
        attenuation: (f32, f32, f32),
    },
}

impl Light {
    pub fn new_directional(direction: Vector3<f32>, color: Vector3<f32>, intensity: f32) -> Self {
        Self::Directional {
            direction: direction
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(|| -Vector3::y()),
            color,
            intensity,
        }
    }

    pub fn new_point(position: Point3<f32>, color: Vector3<f32>, intensity: f32) -> Self {
        Self::Point {
            position,
            color,
            intensity,
            attenuation: DEFAULT_ATTENUATION,
        }
    }

    pub fn with_attenuation(self, constant: f32, linear: f32, quadratic: f32) -> Self {
        match self {
            Light::Point {
                position,
                color,
                intensity,
                ..
            } => Light::Point {
                position,
                color,
                intensity,
                attenuation: (constant, linear, quadratic),
            },
            other => other,
        }
    }

    pub fn kind(&self) -> LightKind {
        match self {
            Light::Directional { .. } => LightKind::Directional,
            Light::Point { .. } => LightKind::Point,
        }
    }

    /// Where a shadow camera for this light sits. Directional lights have no
    /// position, the shadow map derives one from its target.
    pub fn position(&self) -> Point3<f32> {
        match self {
            Light::Directional { .. } => Point3::origin(),
            Light::Point { position, .. } => *position,
        }
    }

    /// Direction of travel. Point lights shine straight down for shadowing,
    /// matching ceiling fixtures.
    pub fn direction(&self) -> Vector3<f32> {
        match self {
            Light::Directional { direction, .. } => *direction,
            Light::Point { .. } => -Vector3::y(),
        }
    }

    /// Unit vector from `surface_point` towards the light.
    pub fn direction_to_light(&self, surface_point: &Point3<f32>) -> Vector3<f32> {
        match self {
            Light::Directional { direction, .. } => -direction,
            Light::Point { position, .. } => (position - surface_point)
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vector3::y),
        }
    }

    /// Radiance arriving at `surface_point`, attenuated for point lights.
    pub fn radiance(&self, surface_point: &Point3<f32>) -> Vector3<f32> {
        match self {
            Light::Directional {
                color, intensity, ..
            } => color * *intensity,

            Light::Point {
                position,
                color,
                intensity,
                attenuation,
            } => {
                let distance = (position - surface_point).norm();
                let (c, l, q) = attenuation;
                let falloff = 1.0 / (c + l * distance + q * distance * distance).max(1e-4);
                color * *intensity * falloff
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_light_falls_off_with_distance() {
        let lamp = Light::new_point(Point3::new(0.0, 4.8, 0.0), Vector3::repeat(1.0), 50.0);
        let near = lamp.radiance(&Point3::new(0.0, 3.8, 0.0));
        let far = lamp.radiance(&Point3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(near.x, 50.0 / (1.0 + 0.09 + 0.032), epsilon = 1e-4);
        assert!(far.x < near.x);
        assert_relative_eq!(
            lamp.direction_to_light(&Point3::origin()),
            Vector3::y(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn directional_light_is_normalized_and_uniform() {
        let sun = Light::new_directional(Vector3::new(0.0, -2.0, 0.0), Vector3::repeat(1.0), 3.0);
        assert_eq!(sun.kind(), LightKind::Directional);
        assert_relative_eq!(sun.direction(), -Vector3::y(), epsilon = 1e-6);
        assert_eq!(
            sun.radiance(&Point3::origin()),
            sun.radiance(&Point3::new(100.0, 0.0, 0.0))
        );
    }

    #[test]
    fn attenuation_only_applies_to_points() {
        let lamp = Light::new_point(Point3::origin(), Vector3::repeat(1.0), 1.0)
            .with_attenuation(1.0, 0.0, 0.0);
        assert_relative_eq!(lamp.radiance(&Point3::new(10.0, 0.0, 0.0)).x, 1.0);
        let sun = Light::new_directional(-Vector3::y(), Vector3::repeat(1.0), 1.0);
        assert_eq!(sun.clone().with_attenuation(1.0, 0.0, 0.0), sun);
    }
}
