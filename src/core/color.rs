use nalgebra::Vector3;

/// ACES filmic curve (Narkowicz fit). Maps HDR radiance into [0, 1].
pub fn aces_tone_mapping(color: Vector3<f32>) -> Vector3<f32> {
    const A: f32 = 2.51;
    const B: f32 = 0.03;
    const C: f32 = 2.43;
    const D: f32 = 0.59;
    const E: f32 = 0.14;

    color.map(|x| ((x * (A * x + B)) / (x * (C * x + D) + E)).clamp(0.0, 1.0))
}

/// Gamma 2.2 encode, applied after tone mapping.
pub fn linear_to_srgb(color: Vector3<f32>) -> Vector3<f32> {
    color.map(|x| x.max(0.0).powf(1.0 / 2.2))
}

/// Gamma 2.2 decode for sRGB-tagged texels.
#[inline]
pub fn srgb_to_linear(channel: f32) -> f32 {
    channel.max(0.0).powf(2.2)
}

/// Quantizes a unit float the way 8-bit texture uploads do.
#[inline]
pub fn unit_to_u8(x: f32) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_to_u8_rounds_and_clamps() {
        assert_eq!(unit_to_u8(-0.5), 0);
        assert_eq!(unit_to_u8(0.5), 128);
        assert_eq!(unit_to_u8(0.78), 199);
        assert_eq!(unit_to_u8(3.0), 255);
    }

    #[test]
    fn aces_stays_in_unit_range() {
        let mapped = aces_tone_mapping(Vector3::new(0.0, 1.0, 100.0));
        assert!(mapped.iter().all(|c| (0.0..=1.0).contains(c)));
        assert!(mapped.z > mapped.y);
    }
}
