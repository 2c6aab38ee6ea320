//! Depth-only render target plus light-space transform for one shadow caster.
//!
//! A pass runs `begin_shadow_pass` -> `draw`* -> `end_shadow_pass`; the
//! resulting `DepthTexture` is immutable and is what the colour pass samples.

use crate::core::math::transform::TransformFactory;
use crate::core::rasterizer::CullMode;
use crate::error::{RenderError, Result};
use crate::pipeline::renderer::Renderer;
use crate::pipeline::shaders::shadow::ShadowShader;
use crate::scene::drawable::Drawable;
use log::{debug, info, warn};
use nalgebra::{Matrix4, Point3, Vector3};
use std::sync::Arc;

/// Depth stored where nothing was drawn, and returned outside the map.
pub const FAR_DEPTH: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSettings {
    /// Edge length of the square depth target, in texels.
    pub resolution: usize,
    pub bias: f32,
    /// Eye distance for directional lights is `range / 2`; far plane for point lights.
    pub range: f32,
    /// Half width/height of the directional orthographic box.
    pub ortho_half_extent: f32,
    /// Half depth of the directional box, centred on the target.
    pub depth_half_range: f32,
    pub point_fov_deg: f32,
    /// PCF kernel radius in texels (0 = single tap).
    pub pcf_radius: i32,
    /// Scene point a directional light looks at.
    pub target: Point3<f32>,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            resolution: 2048,
            bias: 0.005,
            range: 20.0,
            ortho_half_extent: 8.0,
            depth_half_range: 9.0,
            point_fov_deg: 90.0,
            pcf_radius: 1,
            target: Point3::origin(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    /// Single-face perspective approximation, no cube map.
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowState {
    Idle,
    CapturingDepth,
}

/// Resolved depth of a finished pass, values in [0, 1].
#[derive(Debug, Clone)]
pub struct DepthTexture {
    size: usize,
    data: Vec<f32>,
}

impl DepthTexture {
    pub fn cleared(size: usize) -> Self {
        Self::filled(size, FAR_DEPTH)
    }

    pub fn filled(size: usize, depth: f32) -> Self {
        Self {
            size,
            data: vec![depth; size * size],
        }
    }

    fn from_depths(size: usize, mut data: Vec<f32>) -> Self {
        data.resize(size * size, FAR_DEPTH);
        for d in data.iter_mut() {
            if !d.is_finite() || *d > FAR_DEPTH {
                *d = FAR_DEPTH;
            }
        }
        Self { size, data }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Texel lookup; anything outside the map reads as fully lit.
    #[inline]
    pub fn texel(&self, x: i64, y: i64) -> f32 {
        let n = self.size as i64;
        if x < 0 || y < 0 || x >= n || y >= n {
            return FAR_DEPTH;
        }
        self.data[(y * n + x) as usize]
    }

    /// Texel coordinates of a light-space UV. `v` grows upward like NDC y,
    /// while rows are stored top-down.
    #[inline]
    pub fn texel_coords(&self, u: f32, v: f32) -> (i64, i64) {
        let n = self.size as f32;
        ((u * n).floor() as i64, ((1.0 - v) * n).floor() as i64)
    }

    /// Nearest sample with a white border outside [0, 1]^2.
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return FAR_DEPTH;
        }
        let (x, y) = self.texel_coords(u, v);
        let last = self.size as i64 - 1;
        self.texel(x.min(last), y.min(last))
    }
}

/// Projection x view for a light. Directional lights look at
/// `settings.target` from half the range away, with a depth window centred
/// on the target; point lights use a perspective frustum along `direction`.
pub fn light_space_matrix(
    settings: &ShadowSettings,
    position: &Point3<f32>,
    direction: &Vector3<f32>,
    kind: LightKind,
) -> Matrix4<f32> {
    let dir = direction
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(|| -Vector3::y());
    let up = if dir.y.abs() > 0.9 {
        Vector3::z()
    } else {
        Vector3::y()
    };

    match kind {
        LightKind::Directional => {
            let distance = settings.range * 0.5;
            let eye = settings.target - dir * distance;
            let near = (distance - settings.depth_half_range).max(0.1);
            let far = (distance + settings.depth_half_range).max(near + 0.1);
            let e = settings.ortho_half_extent;
            let view = TransformFactory::view(&eye, &settings.target, &up);
            TransformFactory::orthographic(-e, e, -e, e, near, far) * view
        }
        LightKind::Point => {
            let view = TransformFactory::view(position, &(position + dir), &up);
            let far = settings.range.max(0.2);
            let fov = settings.point_fov_deg.to_radians();
            let proj = TransformFactory::perspective(1.0, fov, 0.1, far);
            proj * view
        }
    }
}

/// Owns the shadow depth target and its light-space transform.
pub struct ShadowMap {
    settings: ShadowSettings,
    renderer: Renderer,
    texture: Arc<DepthTexture>,
    light_space: Matrix4<f32>,
    state: ShadowState,
    allocations: usize,
}

impl ShadowMap {
    pub fn new(settings: &ShadowSettings) -> Self {
        let settings = ShadowSettings {
            resolution: settings.resolution.max(1),
            ..settings.clone()
        };
        let size = settings.resolution;
        info!("Shadow map: allocated {}x{} depth target", size, size);
        Self {
            renderer: Renderer::depth_only(size),
            texture: Arc::new(DepthTexture::cleared(size)),
            light_space: Matrix4::identity(),
            state: ShadowState::Idle,
            allocations: 1,
            settings,
        }
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    pub fn state(&self) -> ShadowState {
        self.state
    }

    pub fn resolution(&self) -> usize {
        self.settings.resolution
    }

    /// How many depth targets have been created over this map's lifetime.
    pub fn allocation_count(&self) -> usize {
        self.allocations
    }

    pub fn bias(&self) -> f32 {
        self.settings.bias
    }

    pub fn pcf_radius(&self) -> i32 {
        self.settings.pcf_radius
    }

    /// Transform used by the most recent pass.
    pub fn light_space_matrix(&self) -> Matrix4<f32> {
        self.light_space
    }

    /// Depth from the most recent completed pass.
    pub fn depth_texture(&self) -> Arc<DepthTexture> {
        Arc::clone(&self.texture)
    }

    /// Computes the light transform, clears depth and switches to front-face
    /// culling until `end_shadow_pass`.
    pub fn begin_shadow_pass(
        &mut self,
        position: Point3<f32>,
        direction: Vector3<f32>,
        kind: LightKind,
    ) -> Result<()> {
        if self.state == ShadowState::CapturingDepth {
            return Err(RenderError::ShadowPassState("begin called while already capturing"));
        }
        self.light_space = light_space_matrix(&self.settings, &position, &direction, kind);
        self.renderer.framebuffer.clear_depth(FAR_DEPTH);
        self.renderer.rasterizer.reset_stats();
        self.renderer.rasterizer.set_cull_mode(CullMode::Front);
        self.state = ShadowState::CapturingDepth;
        Ok(())
    }

    pub fn draw<D: Drawable + ?Sized>(&mut self, drawable: &D, model: &Matrix4<f32>) -> Result<()> {
        if self.state != ShadowState::CapturingDepth {
            return Err(RenderError::ShadowPassState("draw called outside a shadow pass"));
        }
        let shader = ShadowShader::new(&self.light_space, model);
        self.renderer.draw(drawable, &shader);
        Ok(())
    }

    /// Resolves the depth target into a new texture and restores back-face culling.
    pub fn end_shadow_pass(&mut self) -> Result<Arc<DepthTexture>> {
        if self.state != ShadowState::CapturingDepth {
            return Err(RenderError::ShadowPassState("end called without a matching begin"));
        }
        let size = self.settings.resolution;
        let depths = self.renderer.framebuffer.depth_snapshot();
        self.texture = Arc::new(DepthTexture::from_depths(size, depths));
        self.renderer.rasterizer.set_cull_mode(CullMode::Back);
        self.state = ShadowState::Idle;

        debug!(
            "Shadow pass: {} triangles, {} culled",
            self.renderer
                .rasterizer
                .stats
                .triangles
                .load(std::sync::atomic::Ordering::Relaxed),
            self.renderer
                .rasterizer
                .stats
                .culled
                .load(std::sync::atomic::Ordering::Relaxed),
        );
        Ok(Arc::clone(&self.texture))
    }

    /// Reallocates the target at `resolution`. Returns false when nothing
    /// changed (same size, or a pass is in progress).
    pub fn set_resolution(&mut self, resolution: usize) -> bool {
        let resolution = resolution.max(1);
        if resolution == self.settings.resolution {
            return false;
        }
        if self.state == ShadowState::CapturingDepth {
            warn!("Shadow map: cannot resize during a shadow pass");
            return false;
        }
        // The old target and texture drop here.
        self.renderer = Renderer::depth_only(resolution);
        self.texture = Arc::new(DepthTexture::cleared(resolution));
        self.settings.resolution = resolution;
        self.allocations += 1;
        info!("Shadow map: reallocated at {}x{}", resolution, resolution);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::transform::transform_point;
    use crate::scene::procedural::MeshBuilder;
    use approx::assert_abs_diff_eq;

    #[test]
    fn straight_down_light_keeps_origin_in_view() {
        let settings = ShadowSettings::default();
        let m = light_space_matrix(
            &settings,
            &Point3::origin(),
            &-Vector3::y(),
            LightKind::Directional,
        );
        let p = transform_point(&m, &Point3::origin());
        assert!(p.iter().all(|c| c.is_finite() && (-1.0..=1.0).contains(c)));
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn slanted_light_covers_room_corners() {
        let settings = ShadowSettings::default();
        let dir = Vector3::new(-0.5, -0.8, 0.2);
        let m = light_space_matrix(&settings, &Point3::origin(), &dir, LightKind::Directional);
        for corner in [Point3::new(-5.0, 0.0, -5.0), Point3::new(5.0, 2.0, 5.0)] {
            let p = transform_point(&m, &corner);
            assert!(p.iter().all(|c| (-1.0..=1.0).contains(c)), "{corner:?} -> {p:?}");
        }
    }

    #[test]
    fn point_light_sees_what_is_in_front_of_it() {
        let settings = ShadowSettings::default();
        let pos = Point3::new(0.0, 4.8, 0.0);
        let m = light_space_matrix(&settings, &pos, &-Vector3::y(), LightKind::Point);
        let p = transform_point(&m, &Point3::new(0.5, 0.0, 0.5));
        assert!(p.iter().all(|c| (-1.0..=1.0).contains(c)));
    }

    #[test]
    fn resize_is_idempotent_and_exact() {
        let mut map = ShadowMap::new(&ShadowSettings {
            resolution: 64,
            ..ShadowSettings::default()
        });
        assert_eq!(map.allocation_count(), 1);
        assert!(!map.set_resolution(64));
        assert!(!map.set_resolution(64));
        assert_eq!(map.allocation_count(), 1);

        assert!(map.set_resolution(128));
        assert_eq!(map.resolution(), 128);
        assert_eq!(map.depth_texture().size(), 128);
        assert_eq!(map.allocation_count(), 2);
        assert!(!map.set_resolution(128));
        assert_eq!(map.allocation_count(), 2);
    }

    #[test]
    fn pass_order_is_enforced() {
        let mut map = ShadowMap::new(&ShadowSettings {
            resolution: 16,
            ..ShadowSettings::default()
        });
        let mesh = MeshBuilder::new().build();
        assert!(map.end_shadow_pass().is_err());
        assert!(map.draw(&mesh, &Matrix4::identity()).is_err());

        map.begin_shadow_pass(Point3::origin(), -Vector3::y(), LightKind::Directional)
            .unwrap();
        assert_eq!(map.state(), ShadowState::CapturingDepth);
        assert!(map
            .begin_shadow_pass(Point3::origin(), -Vector3::y(), LightKind::Directional)
            .is_err());
        assert!(!map.set_resolution(32));
        map.end_shadow_pass().unwrap();
        assert_eq!(map.state(), ShadowState::Idle);
    }

    #[test]
    fn box_under_the_sun_writes_its_far_side() {
        let mut map = ShadowMap::new(&ShadowSettings {
            resolution: 32,
            ..ShadowSettings::default()
        });
        let mut builder = MeshBuilder::new();
        builder.cuboid(Point3::origin(), Vector3::repeat(0.5));
        let cube = builder.build();

        map.begin_shadow_pass(Point3::origin(), -Vector3::y(), LightKind::Directional)
            .unwrap();
        map.draw(&cube, &Matrix4::identity()).unwrap();
        let depth = map.end_shadow_pass().unwrap();

        // Front faces are culled, so the bottom face at y = -0.5 is stored:
        // view depth 10.5 inside the [1, 19] window.
        let expected = ((10.5 - 1.0) / 18.0) as f32;
        assert_abs_diff_eq!(depth.sample(0.5, 0.5), expected, epsilon = 1e-3);
        assert_abs_diff_eq!(depth.sample(0.02, 0.02), FAR_DEPTH);
        assert_abs_diff_eq!(depth.sample(1.5, 0.5), FAR_DEPTH);
        assert_abs_diff_eq!(depth.texel(-1, 0), FAR_DEPTH);
    }
}
