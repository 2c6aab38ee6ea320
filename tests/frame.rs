use reading_room::app::{AppContext, run_headless};
use reading_room::io::config::Config;
use reading_room::pipeline::shadow_map::ShadowState;
use reading_room::scene::context::SUN_LIGHT_INDEX;
use std::fs;

const SMALL_ROOM: &str = r#"
[render]
width = 96
height = 64
samples = 1

[camera]
position = [0.0, 3.0, 6.0]
target = [0.0, 0.5, 0.0]

[time]
hour = 12.0
paused = true

[shadow]
resolution = 128
caster = "auto"
lamp = 0

[[lamps]]
position = [0.0, 4.0, 0.0]
intensity = 20.0

[[objects]]
name = "floor"
material = "floor"
position = [0.0, -0.05, 0.0]
scale = [8.0, 0.1, 8.0]

[[objects]]
name = "column"
material = "metal"
position = [0.0, 1.0, 0.0]
scale = [1.0, 2.0, 1.0]

[[plants]]
seed = 5
position = [1.8, 0.0, 1.0]
"#;

fn small_room() -> AppContext {
    let config = Config::from_toml_str(SMALL_ROOM).unwrap();
    AppContext::new(config, None).unwrap()
}

fn luminance_sum(context: &AppContext) -> f32 {
    let fb = &context.renderer.framebuffer;
    let mut sum = 0.0;
    for y in 0..fb.height {
        for x in 0..fb.width {
            let c = fb.get_pixel(x, y).unwrap();
            sum += c.x + c.y + c.z;
        }
    }
    sum
}

#[test]
fn noon_frame_fills_depth_and_colour() {
    let mut context = small_room();
    let stats = context.render().unwrap();

    assert!(stats.triangles > 0);
    assert!(stats.fragments > 0);
    assert_eq!(context.shadow_map.state(), ShadowState::Idle);

    let depth = context.shadow_map.depth_texture();
    let size = depth.size() as i64;
    let mut covered = 0;
    for y in 0..size {
        for x in 0..size {
            let d = depth.texel(x, y);
            assert!((0.0..=1.0).contains(&d));
            if d < 1.0 {
                covered += 1;
            }
        }
    }
    assert!(covered > 0);

    let lighting = context.scene.lighting();
    assert!(lighting.daytime);
    assert_eq!(context.scene.shadow_light().1, SUN_LIGHT_INDEX);

    // The floor fills most of the view, so most pixels are not sky.
    let sky = lighting.sky;
    let fb = &context.renderer.framebuffer;
    let mut geometry = 0;
    for y in 0..fb.height {
        for x in 0..fb.width {
            if (fb.get_pixel(x, y).unwrap() - sky).norm() > 1e-3 {
                geometry += 1;
            }
        }
    }
    assert!(geometry > fb.width * fb.height / 4);
}

#[test]
fn shadows_only_darken() {
    let mut context = small_room();
    context.render().unwrap();
    let shadowed = luminance_sum(&context);

    context.config.shadow.enabled = false;
    context.render().unwrap();
    let unshadowed = luminance_sum(&context);

    assert!(shadowed < unshadowed);
}

#[test]
fn night_hands_the_shadow_to_the_lamp() {
    let mut context = small_room();
    context.clock.hour = 0.5;
    context.render().unwrap();

    let lighting = context.scene.lighting();
    assert!(!lighting.daytime);
    assert_eq!(context.scene.shadow_light().1, 1);
    assert!(lighting.sky.norm() < 0.2);
}

#[test]
fn headless_run_writes_the_png() {
    let dir = std::env::temp_dir().join(format!("reading_room_frame_{}", std::process::id()));
    let output = dir.join("frame.png");

    let mut config = Config::from_toml_str(SMALL_ROOM).unwrap();
    config.render.output = output.to_string_lossy().into_owned();
    let context = AppContext::new(config, None).unwrap();
    run_headless(context).unwrap();

    let image = image::open(&output).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (96, 64));
    assert!(image.pixels().all(|p| p.0[3] == 255));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn bundled_scene_config_parses() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/scene.toml");
    let config = Config::load(&path).unwrap();
    assert_eq!(config.time.hour, Some(17.0));
    assert!(config.obj.triangulate_polygons);
    assert!(config.materials.iter().any(|m| m.name == "walnut"));
    assert_eq!(
        config
            .objects
            .iter()
            .filter(|o| o.path.as_deref() == Some("models/bookcase.obj"))
            .count(),
        3
    );
}
