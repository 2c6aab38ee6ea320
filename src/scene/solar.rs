use nalgebra::Vector3;
use std::f32::consts::PI;

/// Hour at which the sun crosses the horizon in the morning.
pub const SUNRISE: f32 = 6.0;
/// Hour at which the sun crosses the horizon in the evening.
pub const SUNSET: f32 = 18.0;
const NOON: f32 = 12.0;
const DEGREES_PER_HOUR: f32 = 15.0;

/// Time-of-day lighting model. Every method is a pure function of the hour.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarModel {
    pub max_elevation_deg: f32,
    /// Elevation used for the whole night (below the horizon).
    pub night_elevation_deg: f32,
    pub day_color: Vector3<f32>,
    pub day_intensity: f32,
    pub night_color: Vector3<f32>,
    pub night_intensity: f32,
    pub noon_sky: Vector3<f32>,
    pub midnight_sky: Vector3<f32>,
}

impl Default for SolarModel {
    fn default() -> Self {
        Self {
            max_elevation_deg: 60.0,
            night_elevation_deg: -10.0,
            day_color: Vector3::new(1.0, 0.98, 0.95),
            day_intensity: 3.0,
            night_color: Vector3::new(0.25, 0.30, 0.55),
            night_intensity: 0.05,
            noon_sky: Vector3::new(0.7, 0.85, 0.95),
            midnight_sky: Vector3::new(0.02, 0.03, 0.08),
        }
    }
}

/// Wraps any hour into [0, 24).
pub fn wrap_hour(hour: f32) -> f32 {
    let h = hour.rem_euclid(24.0);
    // rem_euclid can round up to exactly 24.0 for tiny negative inputs.
    if h >= 24.0 { 0.0 } else { h }
}

/// 0 at noon, +/-15 degrees per hour away from it.
pub fn sun_azimuth_deg(hour: f32) -> f32 {
    (wrap_hour(hour) - NOON) * DEGREES_PER_HOUR
}

/// Trapezoidal day weight: ramps up over [6, 8), holds over [8, 16),
/// ramps down over [16, 18), zero at night.
pub fn day_factor(hour: f32) -> f32 {
    let h = wrap_hour(hour);
    match h {
        h if (SUNRISE..8.0).contains(&h) => (h - SUNRISE) / 2.0,
        h if (8.0..16.0).contains(&h) => 1.0,
        h if (16.0..SUNSET).contains(&h) => (SUNSET - h) / 2.0,
        _ => 0.0,
    }
}

impl SolarModel {
    /// Half-sine arc between sunrise and sunset, fixed below the horizon otherwise.
    pub fn sun_elevation_deg(&self, hour: f32) -> f32 {
        let h = wrap_hour(hour);
        if (SUNRISE..=SUNSET).contains(&h) {
            let arc = ((h - SUNRISE) / (SUNSET - SUNRISE) * PI).sin().max(0.0);
            self.max_elevation_deg * arc
        } else {
            self.night_elevation_deg
        }
    }

    /// Unit vector along which sunlight travels (from the sun into the
    /// scene). At azimuth 0 the sun stands over +X.
    pub fn sun_direction(&self, hour: f32) -> Vector3<f32> {
        let elevation = self.sun_elevation_deg(hour).to_radians();
        let azimuth = sun_azimuth_deg(hour).to_radians();
        let (sin_el, cos_el) = elevation.sin_cos();
        let (sin_az, cos_az) = azimuth.sin_cos();
        let towards_sun = Vector3::new(cos_el * cos_az, sin_el, -cos_el * sin_az);
        -towards_sun.normalize()
    }

    pub fn is_daytime(&self, hour: f32) -> bool {
        self.sun_elevation_deg(hour) > 0.0
    }

    pub fn sun_color_and_intensity(&self, hour: f32) -> (Vector3<f32>, f32) {
        let t = day_factor(hour);
        let color = self.night_color.lerp(&self.day_color, t);
        let intensity = self.night_intensity * (1.0 - t) + self.day_intensity * t;
        (color, intensity)
    }

    /// Cosine blend between the midnight and noon sky colours.
    pub fn background_color(&self, hour: f32) -> Vector3<f32> {
        let phase = (wrap_hour(hour) - NOON) / 24.0 * 2.0 * PI;
        let brightness = ((phase.cos() + 1.0) * 0.5).clamp(0.0, 1.0);
        self.midnight_sky.lerp(&self.noon_sky, brightness)
    }
}
