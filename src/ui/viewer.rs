use crate::app::AppContext;
use crate::ui::input::OrbitController;
use egui::{Color32, ColorImage, RichText, TextureHandle, TextureOptions, Vec2};
use log::{error, info};
use native_dialog::FileDialogBuilder;
use std::time::Instant;

const SHADOW_RESOLUTIONS: [usize; 3] = [1024, 2048, 4096];

/// Interactive window: time-of-day controls on the left, the live frame in
/// the centre.
pub struct ViewerApp {
    context: AppContext,
    controller: OrbitController,
    frame: Option<TextureHandle>,
    needs_render: bool,
    last_tick: Instant,
    last_frame_ms: f32,
    status_message: String,
}

impl ViewerApp {
    pub fn new(context: AppContext, cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let camera = &context.config.camera;
        let controller = OrbitController::new(camera.orbit_sensitivity, camera.zoom_speed);
        Self {
            context,
            controller,
            frame: None,
            needs_render: true,
            last_tick: Instant::now(),
            last_frame_ms: 0.0,
            status_message: String::new(),
        }
    }

    fn render_frame(&mut self, ctx: &egui::Context) {
        let start = Instant::now();
        if let Err(e) = self.context.render() {
            error!("Frame failed: {e}");
            self.status_message = format!("Frame failed: {e}");
            return;
        }
        let image = ColorImage::from_rgba_unmultiplied(
            [self.context.renderer.width(), self.context.renderer.height()],
            &self.context.frame_rgba(),
        );
        match &mut self.frame {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => self.frame = Some(ctx.load_texture("frame", image, TextureOptions::LINEAR)),
        }
        self.last_frame_ms = start.elapsed().as_secs_f32() * 1000.0;
        self.needs_render = false;
    }

    fn select_config_file(&mut self) {
        let result = FileDialogBuilder::default()
            .set_title("Open scene configuration")
            .add_filter("TOML", ["toml"])
            .open_single_file()
            .show();

        match result {
            Ok(Some(path)) => match self.context.reload(&path) {
                Ok(()) => {
                    let camera = &self.context.config.camera;
                    self.controller =
                        OrbitController::new(camera.orbit_sensitivity, camera.zoom_speed);
                    self.status_message = format!("Loaded {}", path.display());
                    self.needs_render = true;
                }
                Err(e) => self.status_message = format!("Cannot load {}: {e}", path.display()),
            },
            Ok(None) => {}
            Err(e) => self.status_message = format!("File dialog failed: {e}"),
        }
    }

    fn draw_side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Time of day");
        let clock = &mut self.context.clock;
        if ui
            .add(egui::Slider::new(&mut clock.hour, 0.0..=23.99).text("hour"))
            .changed()
        {
            self.needs_render = true;
        }
        ui.horizontal(|ui| {
            let label = if clock.paused { "Play" } else { "Pause" };
            if ui.button(label).clicked() {
                clock.paused = !clock.paused;
            }
            ui.add(egui::Slider::new(&mut clock.speed, 0.0..=4.0).text("h/s"));
        });

        let lighting = self.context.scene.lighting();
        ui.label(format!(
            "Sun {} the horizon, caster: {}",
            if lighting.daytime { "above" } else { "below" },
            if self.context.scene.shadow_light().1 == 0 { "sun" } else { "lamp" }
        ));

        ui.separator();
        ui.heading("Shadows");
        if ui
            .checkbox(&mut self.context.config.shadow.enabled, "enabled")
            .changed()
        {
            self.needs_render = true;
        }
        let current = self.context.shadow_map.resolution();
        let mut selected = current;
        egui::ComboBox::from_label("resolution")
            .selected_text(format!("{current}"))
            .show_ui(ui, |ui| {
                for size in SHADOW_RESOLUTIONS {
                    ui.selectable_value(&mut selected, size, format!("{size}"));
                }
            });
        if selected != current && self.context.set_shadow_resolution(selected) {
            info!("Shadow resolution set to {selected}");
            self.needs_render = true;
        }
        ui.label(format!(
            "Depth targets allocated: {}",
            self.context.shadow_map.allocation_count()
        ));

        ui.separator();
        ui.heading("Image");
        if ui
            .add(
                egui::Slider::new(&mut self.context.config.render.exposure, 0.1..=4.0)
                    .text("exposure"),
            )
            .changed()
        {
            self.needs_render = true;
        }
        if ui.checkbox(&mut self.context.config.render.aces, "ACES").changed() {
            self.needs_render = true;
        }

        ui.separator();
        if ui.button("Open config...").clicked() {
            self.select_config_file();
        }
        ui.label(format!("Frame: {:.1} ms", self.last_frame_ms));
        if !self.status_message.is_empty() {
            ui.label(RichText::new(&self.status_message).color(Color32::LIGHT_YELLOW));
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let dt = (now - self.last_tick).as_secs_f32();
        self.last_tick = now;
        if !self.context.clock.paused {
            self.context.clock.advance(dt);
            self.needs_render = true;
        }

        egui::SidePanel::left("controls")
            .min_width(260.0)
            .resizable(false)
            .show(ctx, |ui| self.draw_side_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(texture) = &self.frame else {
                ui.label(RichText::new("Rendering...").color(Color32::GRAY));
                return;
            };
            let available = ui.available_size();
            let renderer = &self.context.renderer;
            let aspect = renderer.width() as f32 / renderer.height().max(1) as f32;
            let width = available.x.min(available.y * aspect);
            let response = ui.add(
                egui::Image::new(texture)
                    .fit_to_exact_size(Vec2::new(width, width / aspect))
                    .sense(egui::Sense::click_and_drag()),
            );
            if self.controller.handle(&response, ctx, &mut self.context.camera) {
                self.needs_render = true;
            }
        });

        if self.needs_render {
            self.render_frame(ctx);
        }
        if !self.context.clock.paused {
            ctx.request_repaint();
        }
    }
}

pub fn start_viewer(context: AppContext) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 760.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Reading Room",
        options,
        Box::new(|cc| Ok(Box::new(ViewerApp::new(context, cc)))),
    )
}
