use clap::Parser;
use log::{error, info};
use reading_room::app::{AppContext, run_headless};
use reading_room::io::config::Config;
use reading_room::ui::viewer::start_viewer;
use std::path::PathBuf;

/// Software-rendered reading room with a time-of-day sun.
#[derive(Parser, Debug)]
#[command(name = "reading-room", version, about)]
struct Cli {
    /// Scene configuration (TOML). The built-in room is used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Render one frame to a PNG instead of opening the viewer.
    #[arg(long)]
    headless: bool,

    /// Output image for headless mode.
    #[arg(short, long, value_name = "PNG")]
    output: Option<String>,

    /// Hour of day in [0, 24).
    #[arg(long)]
    hour: Option<f32>,

    /// Shadow map edge length in texels.
    #[arg(long, value_name = "TEXELS")]
    shadow_resolution: Option<u32>,

    /// Fan-triangulate OBJ polygons instead of keeping the first triangle.
    #[arg(long)]
    triangulate: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.render.output = output.clone();
        }
        if let Some(hour) = self.hour {
            config.time.hour = Some(hour);
        }
        if let Some(resolution) = self.shadow_resolution {
            config.shadow.resolution = resolution as usize;
        }
        if self.triangulate {
            config.obj.triangulate_polygons = true;
        }
    }
}

/// Info by default with the GUI stack capped at Warn; `RUST_LOG` directives
/// are applied last so they override both.
fn logger_builder(env_filters: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .filter_module("eframe", log::LevelFilter::Warn)
        .filter_module("egui_glow", log::LevelFilter::Warn)
        .filter_module("egui_winit", log::LevelFilter::Warn)
        .filter_module("winit", log::LevelFilter::Warn)
        .format_timestamp(None)
        .format_level(true);
    if let Some(filters) = env_filters {
        builder.parse_filters(filters);
    }
    builder
}

fn main() -> Result<(), String> {
    let env_filters = std::env::var(env_logger::DEFAULT_FILTER_ENV).ok();
    logger_builder(env_filters.as_deref()).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration {:?}", path);
            Config::load(path).map_err(|e| {
                error!("{e}");
                format!("cannot load configuration: {e}")
            })?
        }
        None => {
            info!("Using the built-in reading room");
            Config::default()
        }
    };
    cli.apply_overrides(&mut config);

    let context = AppContext::new(config, cli.config.clone()).map_err(|e| {
        error!("{e}");
        format!("cannot build scene: {e}")
    })?;

    if cli.headless {
        return run_headless(context).map_err(|e| {
            error!("{e}");
            format!("headless render failed: {e}")
        });
    }

    start_viewer(context).map_err(|e| {
        error!("Viewer failed: {e}");
        format!("viewer failed: {e}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn info_is_the_default_level() {
        assert_eq!(logger_builder(None).build().filter(), LevelFilter::Info);
    }

    #[test]
    fn rust_log_can_raise_the_level() {
        let logger = logger_builder(Some("debug")).build();
        assert_eq!(logger.filter(), LevelFilter::Debug);

        let frame_timing = log::Record::builder()
            .level(log::Level::Debug)
            .target("reading_room::pipeline::passes")
            .build();
        assert!(log::Log::enabled(&logger, frame_timing.metadata()));

        let gui_noise = log::Metadata::builder()
            .level(log::Level::Info)
            .target("winit::platform")
            .build();
        assert!(!log::Log::enabled(&logger, &gui_noise));
    }
}
