use crate::core::color::{aces_tone_mapping, linear_to_srgb, unit_to_u8};
use crate::core::framebuffer::FrameBuffer;
use crate::error::Result;
use crate::io::config::RenderConfig;
use crate::pipeline::renderer::Renderer;
use crate::pipeline::shadow_map::ShadowMap;
use crate::scene::camera::Camera;
use crate::scene::context::Scene;
use log::debug;
use rayon::prelude::*;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// Timings and counters for one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub shadow_time: Duration,
    pub color_time: Duration,
    pub triangles: usize,
    pub culled: usize,
    pub fragments: usize,
}

/// Lighting for `hour`, then the depth pass (when `shadow_map` is given),
/// then the colour pass. The colour pass only ever sees a finished depth texture.
pub fn render_frame(
    scene: &mut Scene,
    hour: f32,
    camera: &Camera,
    renderer: &mut Renderer,
    shadow_map: Option<&mut ShadowMap>,
) -> Result<FrameStats> {
    let mut stats = FrameStats::default();
    scene.update_lighting(hour);

    let shadow_start = Instant::now();
    let shadow = match shadow_map {
        Some(map) => Some(scene.render_shadow_pass(map)?),
        None => None,
    };
    stats.shadow_time = shadow_start.elapsed();

    let color_start = Instant::now();
    scene.render_color_pass(renderer, camera, shadow.as_ref());
    stats.color_time = color_start.elapsed();

    let raster = &renderer.rasterizer.stats;
    stats.triangles = raster.triangles.load(Ordering::Relaxed);
    stats.culled = raster.culled.load(Ordering::Relaxed);
    stats.fragments = raster.fragments.load(Ordering::Relaxed);

    debug!(
        "Frame at {:.2}h: shadow {:.2?}, colour {:.2?}, {} triangles ({} culled), {} fragments",
        scene.lighting().hour,
        stats.shadow_time,
        stats.color_time,
        stats.triangles,
        stats.culled,
        stats.fragments
    );
    Ok(stats)
}

/// Exposure -> optional ACES -> gamma, packed as RGBA8 rows, top row first.
pub fn post_process_to_rgba(framebuffer: &FrameBuffer, render: &RenderConfig) -> Vec<u8> {
    let width = framebuffer.width;
    let mut buffer = vec![0u8; width * framebuffer.height * 4];
    if width == 0 {
        return buffer;
    }

    buffer
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let Some(color) = framebuffer.get_pixel(x, y) else {
                    continue;
                };
                let exposed = color * render.exposure;
                let mapped = if render.aces {
                    aces_tone_mapping(exposed)
                } else {
                    exposed
                };
                let srgb = linear_to_srgb(mapped);
                pixel.copy_from_slice(&[
                    unit_to_u8(srgb.x),
                    unit_to_u8(srgb.y),
                    unit_to_u8(srgb.z),
                    255,
                ]);
            }
        });
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn post_process_packs_opaque_rgba() {
        let mut fb = FrameBuffer::new(2, 1, 1);
        fb.clear(Vector3::new(1.0, 0.0, 0.0), f32::INFINITY);
        let render = RenderConfig {
            aces: false,
            ..RenderConfig::default()
        };
        let rgba = post_process_to_rgba(&fb, &render);
        assert_eq!(rgba, vec![255, 0, 0, 255, 255, 0, 0, 255]);

        let darker = post_process_to_rgba(
            &fb,
            &RenderConfig {
                exposure: 0.25,
                ..render
            },
        );
        assert!(darker[0] < 255 && darker[0] > 0);
    }
}
