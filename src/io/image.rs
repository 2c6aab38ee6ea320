use crate::error::{RenderError, Result};
use image::error::{ParameterError, ParameterErrorKind};
use image::{ImageError, RgbaImage};
use log::info;
use std::fs;
use std::path::Path;

/// Writes tightly packed RGBA8 rows (top row first) to an image file; the
/// format follows the extension. Missing parent directories are created.
pub fn save_rgba<P: AsRef<Path>>(
    path: P,
    width: usize,
    height: usize,
    rgba: Vec<u8>,
) -> Result<()> {
    let path = path.as_ref();
    let write_error = |source| RenderError::ImageWrite {
        path: path.to_path_buf(),
        source,
    };

    let image = RgbaImage::from_raw(width as u32, height as u32, rgba).ok_or_else(|| {
        write_error(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        )))
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| RenderError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    image.save(path).map_err(write_error)?;
    info!("Saved {}x{} image to {:?}", width, height, path);
    Ok(())
}
