use crate::error::Result;
use crate::io::config::Config;
use crate::io::image::save_rgba;
use crate::pipeline::passes::{FrameStats, post_process_to_rgba, render_frame};
use crate::pipeline::renderer::Renderer;
use crate::pipeline::shadow_map::ShadowMap;
use crate::scene::camera::Camera;
use crate::scene::context::Scene;
use crate::scene::loader::{build_camera, build_scene};
use crate::scene::solar::wrap_hour;
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Virtual time of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    pub hour: f32,
    /// Virtual hours per real second.
    pub speed: f32,
    pub paused: bool,
}

impl Clock {
    pub fn advance(&mut self, dt_seconds: f32) {
        if !self.paused {
            self.hour = wrap_hour(self.hour + self.speed * dt_seconds);
        }
    }
}

/// All per-run state, passed explicitly to the drivers.
pub struct AppContext {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub scene: Scene,
    pub renderer: Renderer,
    pub shadow_map: ShadowMap,
    pub camera: Camera,
    pub clock: Clock,
}

impl AppContext {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Result<Self> {
        let base_dir = config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let scene = build_scene(&config, &base_dir)?;
        let render = &config.render;
        let mut renderer = Renderer::new(render.width, render.height, render.samples);
        renderer.rasterizer.set_cull_mode(render.cull_mode());
        let shadow_map = ShadowMap::new(&config.shadow.settings());
        let camera = build_camera(&config);
        let clock = Clock {
            hour: wrap_hour(config.time.initial_hour()),
            speed: config.time.speed,
            paused: config.time.paused,
        };

        Ok(Self {
            config,
            config_path,
            scene,
            renderer,
            shadow_map,
            camera,
            clock,
        })
    }

    /// Replaces everything with a context built from the file at `path`.
    pub fn reload(&mut self, path: &Path) -> Result<()> {
        let config = Config::load(path)?;
        *self = Self::new(config, Some(path.to_path_buf()))?;
        info!("Reloaded configuration from {:?}", path);
        Ok(())
    }

    pub fn render(&mut self) -> Result<FrameStats> {
        let shadow_map = self.config.shadow.enabled.then_some(&mut self.shadow_map);
        render_frame(
            &mut self.scene,
            self.clock.hour,
            &self.camera,
            &mut self.renderer,
            shadow_map,
        )
    }

    pub fn frame_rgba(&self) -> Vec<u8> {
        post_process_to_rgba(&self.renderer.framebuffer, &self.config.render)
    }

    /// Returns true when the shadow target was reallocated.
    pub fn set_shadow_resolution(&mut self, resolution: usize) -> bool {
        let changed = self.shadow_map.set_resolution(resolution);
        if changed {
            self.config.shadow.resolution = resolution;
        }
        changed
    }
}

/// Renders one frame at the configured hour and writes it to `render.output`.
pub fn run_headless(mut context: AppContext) -> Result<()> {
    info!(
        "Rendering {}x{} at {:.2}h (shadow map {}x{})",
        context.renderer.width(),
        context.renderer.height(),
        context.clock.hour,
        context.shadow_map.resolution(),
        context.shadow_map.resolution()
    );
    let start = Instant::now();
    let stats = context.render()?;
    info!(
        "Render completed in {:.2?} ({} triangles, {} fragments)",
        start.elapsed(),
        stats.triangles,
        stats.fragments
    );

    let rgba = context.frame_rgba();
    save_rgba(
        &context.config.render.output,
        context.renderer.width(),
        context.renderer.height(),
        rgba,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_wraps_and_pauses() {
        let mut clock = Clock {
            hour: 23.5,
            speed: 1.0,
            paused: false,
        };
        clock.advance(1.0);
        assert!((clock.hour - 0.5).abs() < 1e-5);
        clock.paused = true;
        clock.advance(5.0);
        assert!((clock.hour - 0.5).abs() < 1e-5);
    }

    #[test]
    fn shadow_resolution_changes_are_tracked() {
        let mut config = Config::default();
        config.render.width = 16;
        config.render.height = 9;
        config.shadow.resolution = 32;
        config.plants.clear();
        let mut context = AppContext::new(config, None).unwrap();

        assert!(!context.set_shadow_resolution(32));
        assert!(context.set_shadow_resolution(64));
        assert_eq!(context.config.shadow.resolution, 64);
        assert_eq!(context.shadow_map.allocation_count(), 2);
    }
}
