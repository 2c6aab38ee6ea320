use crate::core::color::srgb_to_linear;
use crate::error::{RenderError, Result};
use log::info;
use nalgebra::Vector4;
use std::path::Path;

/// How stored bytes map to shading values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Gamma-encoded colour data (albedo). Decoded to linear at load.
    Srgb,
    /// Raw data (normal, metallic, roughness, AO).
    Linear,
}

/// A decoded RGBA texture. Texel rows are stored bottom-up so that
/// `v = 0` addresses the first row.
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    texels: Vec<Vector4<f32>>,
}

impl Texture {
    /// Decodes an image file. Grey, RGB and RGBA sources are all expanded to RGBA.
    pub fn load<P: AsRef<Path>>(path: P, color_space: ColorSpace) -> Result<Self> {
        let path_ref = path.as_ref();
        let img = image::open(path_ref).map_err(|source| RenderError::Texture {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let channels = img.color().channel_count();
        let rgba = img.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();

        info!(
            "Loaded texture: {:?} ({}x{}, {} channel(s))",
            path_ref, width, height, channels
        );

        Ok(Self::from_rgba8(width, height, rgba.as_raw(), color_space))
    }

    /// A 1x1 texture holding `rgba`.
    pub fn solid(rgba: [u8; 4], color_space: ColorSpace) -> Self {
        Self::from_rgba8(1, 1, &rgba, color_space)
    }

    /// `bytes` is tightly packed RGBA8, bottom row first.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8], color_space: ColorSpace) -> Self {
        let decode = |b: u8| {
            let x = b as f32 / 255.0;
            match color_space {
                ColorSpace::Srgb => srgb_to_linear(x),
                ColorSpace::Linear => x,
            }
        };
        let mut texels = bytes
            .chunks_exact(4)
            .map(|p| Vector4::new(decode(p[0]), decode(p[1]), decode(p[2]), p[3] as f32 / 255.0))
            .collect::<Vec<_>>();

        let width = width.max(1);
        let height = height.max(1);
        texels.resize((width * height) as usize, Vector4::new(1.0, 1.0, 1.0, 1.0));
        Self {
            width,
            height,
            color_space,
            texels,
        }
    }

    /// Bilinear sample with repeat wrapping.
    pub fn sample(&self, u: f32, v: f32) -> Vector4<f32> {
        if self.texels.len() == 1 {
            return self.texels[0];
        }
        let x = u.rem_euclid(1.0) * self.width as f32 - 0.5;
        let y = v.rem_euclid(1.0) * self.height as f32 - 0.5;

        let x0 = x.floor() as i64;
        let y0 = y.floor() as i64;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let c00 = self.texel_wrapped(x0, y0);
        let c10 = self.texel_wrapped(x0 + 1, y0);
        let c01 = self.texel_wrapped(x0, y0 + 1);
        let c11 = self.texel_wrapped(x0 + 1, y0 + 1);

        let bottom = c00 * (1.0 - fx) + c10 * fx;
        let top = c01 * (1.0 - fx) + c11 * fx;
        bottom * (1.0 - fy) + top * fy
    }

    fn texel_wrapped(&self, x: i64, y: i64) -> Vector4<f32> {
        let xw = x.rem_euclid(self.width as i64) as usize;
        let yw = y.rem_euclid(self.height as i64) as usize;
        self.texels[yw * self.width as usize + xw]
    }
}
