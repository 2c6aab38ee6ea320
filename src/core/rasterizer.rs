use crate::core::framebuffer::FrameBuffer;
use crate::core::math::interpolation::{
    TriangleSetup, is_inside_triangle, perspective_correct_barycentric,
};
use crate::core::math::transform::{apply_perspective_division, ndc_to_screen};
use crate::core::pipeline::Shader;
use crate::pipeline::renderer::TextureUnits;
use nalgebra::{Point2, Vector3, Vector4};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Which winding gets discarded. Front faces are counter-clockwise in NDC.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default)]
pub enum CullMode {
    #[default]
    Back,
    Front,
    None,
}

/// Per-frame counters, reset by `Rasterizer::reset_stats`.
#[derive(Debug, Default)]
pub struct RasterStats {
    pub triangles: AtomicUsize,
    pub culled: AtomicUsize,
    pub fragments: AtomicUsize,
}

/// Scan-converts clip-space triangles into a `FrameBuffer`.
#[derive(Debug, Default)]
pub struct Rasterizer {
    pub cull_mode: CullMode,
    pub stats: RasterStats,
}

type ClipVertex<V> = (Vector4<f32>, V);

/// Clip planes as (axis, sign): inside when `sign * p[axis] <= p.w`.
const CLIP_PLANES: [(usize, f32); 6] = [
    (0, 1.0),
    (0, -1.0),
    (1, 1.0),
    (1, -1.0),
    (2, 1.0),
    (2, -1.0),
];

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cull_mode(&mut self, mode: CullMode) {
        self.cull_mode = mode;
    }

    pub fn reset_stats(&self) {
        self.stats.triangles.store(0, Ordering::Relaxed);
        self.stats.culled.store(0, Ordering::Relaxed);
        self.stats.fragments.store(0, Ordering::Relaxed);
    }

    /// Clips the triangle against the view volume (Sutherland-Hodgman in
    /// homogeneous space), fans the remaining polygon and rasterizes each piece.
    pub fn rasterize_triangle<S: Shader>(
        &self,
        framebuffer: &FrameBuffer,
        shader: &S,
        clip_coords: &[Vector4<f32>; 3],
        varyings: &[S::Varying; 3],
        units: &TextureUnits,
    ) {
        self.stats.triangles.fetch_add(1, Ordering::Relaxed);

        let mut polygon: Vec<ClipVertex<S::Varying>> = Vec::with_capacity(12);
        let mut scratch: Vec<ClipVertex<S::Varying>> = Vec::with_capacity(12);
        polygon.extend(clip_coords.iter().copied().zip(varyings.iter().copied()));

        let fully_inside = clip_coords.iter().all(|c| {
            CLIP_PLANES
                .iter()
                .all(|&(axis, sign)| sign * c[axis] <= c.w)
        });

        if !fully_inside {
            for &(axis, sign) in &CLIP_PLANES {
                clip_against_plane(&polygon, &mut scratch, axis, sign);
                std::mem::swap(&mut polygon, &mut scratch);
                if polygon.len() < 3 {
                    return;
                }
            }
        }

        let anchor = polygon[0];
        for pair in polygon[1..].windows(2) {
            self.rasterize_clipped(
                framebuffer,
                shader,
                &[anchor.0, pair[0].0, pair[1].0],
                &[anchor.1, pair[0].1, pair[1].1],
                units,
            );
        }
    }

    fn rasterize_clipped<S: Shader>(
        &self,
        framebuffer: &FrameBuffer,
        shader: &S,
        clip: &[Vector4<f32>; 3],
        varyings: &[S::Varying; 3],
        units: &TextureUnits,
    ) {
        let width = framebuffer.buffer_width as f32;
        let height = framebuffer.buffer_height as f32;

        if clip.iter().any(|c| c.w.abs() < 1e-6) {
            return;
        }
        let screen = clip.map(|c| {
            let ndc = apply_perspective_division(&c);
            ndc_to_screen(ndc.x, ndc.y, width, height)
        });
        let w = clip.map(|c| c.w);
        let ndc_z = Vector3::new(clip[0].z / w[0], clip[1].z / w[1], clip[2].z / w[2]);

        let Some(setup) = TriangleSetup::new(screen[0], screen[1], screen[2]) else {
            return;
        };
        let discard = match self.cull_mode {
            CullMode::Back => setup.signed_area_x2 >= 0.0,
            CullMode::Front => setup.signed_area_x2 <= 0.0,
            CullMode::None => false,
        };
        if discard {
            self.stats.culled.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let Some((x0, y0, x1, y1)) = pixel_bounds(&screen, framebuffer) else {
            return;
        };

        (y0..=y1).into_par_iter().for_each(|y| {
            let mut written = 0usize;
            for x in x0..=x1 {
                let center = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
                let bary = setup.barycentric(center);
                if !is_inside_triangle(bary) {
                    continue;
                }
                // NDC depth is affine in screen space, so it uses the raw weights.
                let depth = bary.dot(&ndc_z) * 0.5 + 0.5;
                if framebuffer.depth_test_and_update(x, y, depth) {
                    written += 1;
                    if !framebuffer.has_color {
                        continue;
                    }
                    let Some(pc) = perspective_correct_barycentric(bary, w) else {
                        continue;
                    };
                    let varying = varyings[0] * pc.x + varyings[1] * pc.y + varyings[2] * pc.z;
                    framebuffer.set_pixel_safe(x, y, shader.fragment(varying, units));
                }
            }
            if written > 0 {
                self.stats.fragments.fetch_add(written, Ordering::Relaxed);
            }
        });
    }
}

fn clip_against_plane<V: Copy + std::ops::Add<Output = V> + std::ops::Mul<f32, Output = V>>(
    input: &[ClipVertex<V>],
    output: &mut Vec<ClipVertex<V>>,
    axis: usize,
    sign: f32,
) {
    output.clear();
    let Some(&last) = input.last() else {
        return;
    };

    let distance = |p: &Vector4<f32>| p.w - sign * p[axis];
    let mut prev = last;
    let mut prev_d = distance(&prev.0);

    for &curr in input {
        let curr_d = distance(&curr.0);
        let crosses = (prev_d >= 0.0) != (curr_d >= 0.0);
        if crosses {
            let t = prev_d / (prev_d - curr_d);
            if t.is_finite() {
                output.push((
                    prev.0 + (curr.0 - prev.0) * t,
                    prev.1 * (1.0 - t) + curr.1 * t,
                ));
            }
        }
        if curr_d >= 0.0 {
            output.push(curr);
        }
        prev = curr;
        prev_d = curr_d;
    }
}

/// Inclusive pixel range covered by the triangle, clamped to the target.
fn pixel_bounds(
    screen: &[Point2<f32>; 3],
    framebuffer: &FrameBuffer,
) -> Option<(usize, usize, usize, usize)> {
    let min_x = screen.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor() as i64;
    let min_y = screen.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor() as i64;
    let max_x = screen.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil() as i64;
    let max_y = screen.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil() as i64;

    let limit_x = framebuffer.buffer_width as i64 - 1;
    let limit_y = framebuffer.buffer_height as i64 - 1;
    if max_x < 0 || max_y < 0 || min_x > limit_x || min_y > limit_y {
        return None;
    }
    Some((
        min_x.max(0) as usize,
        min_y.max(0) as usize,
        max_x.min(limit_x) as usize,
        max_y.min(limit_y) as usize,
    ))
}
