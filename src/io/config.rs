use crate::core::rasterizer::CullMode;
use crate::error::{RenderError, Result};
use crate::pipeline::shadow_map::ShadowSettings;
use crate::scene::light::DEFAULT_ATTENUATION;
use crate::scene::solar::SolarModel;
use chrono::Timelike;
use log::warn;
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Everything a run needs. An empty TOML file deserializes to `Config::default()`,
/// which is the built-in reading room.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub solar: SolarConfig,
    #[serde(default)]
    pub shadow: ShadowConfig,
    #[serde(default)]
    pub obj: ObjConfig,
    #[serde(default = "default_lamps")]
    pub lamps: Vec<LampConfig>,
    #[serde(default = "default_materials")]
    pub materials: Vec<MaterialConfig>,
    #[serde(default = "default_objects")]
    pub objects: Vec<ObjectConfig>,
    #[serde(default = "default_plants")]
    pub plants: Vec<PlantConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            camera: CameraConfig::default(),
            time: TimeConfig::default(),
            solar: SolarConfig::default(),
            shadow: ShadowConfig::default(),
            obj: ObjConfig::default(),
            lamps: default_lamps(),
            materials: default_materials(),
            objects: default_objects(),
            plants: default_plants(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RenderError::Config(e.to_string()))
    }
}

// --- [render] ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    /// SSAA factor per axis.
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_exposure")]
    pub exposure: f32,
    #[serde(default = "default_ambient")]
    pub ambient: [f32; 3],
    #[serde(default = "default_true")]
    pub aces: bool,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_cull_mode")]
    pub cull_mode: String, // "back", "front", "none"
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            samples: default_samples(),
            exposure: default_exposure(),
            ambient: default_ambient(),
            aces: true,
            output: default_output(),
            cull_mode: default_cull_mode(),
        }
    }
}

impl RenderConfig {
    pub fn cull_mode(&self) -> CullMode {
        match self.cull_mode.as_str() {
            "back" => CullMode::Back,
            "front" => CullMode::Front,
            "none" => CullMode::None,
            other => {
                warn!("Unknown cull mode '{}', using back-face culling", other);
                CullMode::Back
            }
        }
    }
}

fn default_width() -> usize {
    960
}
fn default_height() -> usize {
    540
}
fn default_samples() -> usize {
    1
}
fn default_exposure() -> f32 {
    1.0
}
fn default_ambient() -> [f32; 3] {
    [0.03, 0.03, 0.035]
}
fn default_output() -> String {
    "reading_room.png".to_string()
}
fn default_cull_mode() -> String {
    "back".to_string()
}
fn default_true() -> bool {
    true
}
fn default_one() -> f32 {
    1.0
}

// --- [camera] ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_position")]
    pub position: [f32; 3],
    #[serde(default = "default_camera_target")]
    pub target: [f32; 3],
    #[serde(default = "default_up")]
    pub up: [f32; 3],
    /// Vertical field of view in degrees.
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// Radians per dragged pixel.
    #[serde(default = "default_orbit_sensitivity")]
    pub orbit_sensitivity: f32,
    /// World units per scroll notch.
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: default_camera_position(),
            target: default_camera_target(),
            up: default_up(),
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
            orbit_sensitivity: default_orbit_sensitivity(),
            zoom_speed: default_zoom_speed(),
        }
    }
}

fn default_camera_position() -> [f32; 3] {
    [-1.5, 2.6, 7.0]
}
fn default_camera_target() -> [f32; 3] {
    [0.5, 1.0, 0.0]
}
fn default_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}
fn default_fov() -> f32 {
    60.0
}
fn default_near() -> f32 {
    0.1
}
fn default_far() -> f32 {
    100.0
}
fn default_orbit_sensitivity() -> f32 {
    0.01
}
fn default_zoom_speed() -> f32 {
    0.5
}

// --- [time] ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeConfig {
    /// Starting hour; the local wall-clock hour when absent.
    #[serde(default)]
    pub hour: Option<f32>,
    /// Virtual hours per real second while playing.
    #[serde(default = "default_time_speed")]
    pub speed: f32,
    #[serde(default)]
    pub paused: bool,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            hour: None,
            speed: default_time_speed(),
            paused: false,
        }
    }
}

impl TimeConfig {
    pub fn initial_hour(&self) -> f32 {
        self.hour.unwrap_or_else(|| {
            let now = chrono::Local::now();
            now.hour() as f32 + now.minute() as f32 / 60.0
        })
    }
}

fn default_time_speed() -> f32 {
    0.5
}

// --- [solar] ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SolarConfig {
    #[serde(default = "default_max_elevation")]
    pub max_elevation: f32,
    #[serde(default = "default_night_elevation")]
    pub night_elevation: f32,
    #[serde(default = "default_day_color")]
    pub day_color: [f32; 3],
    #[serde(default = "default_day_intensity")]
    pub day_intensity: f32,
    #[serde(default = "default_night_color")]
    pub night_color: [f32; 3],
    #[serde(default = "default_night_intensity")]
    pub night_intensity: f32,
    #[serde(default = "default_noon_sky")]
    pub noon_sky: [f32; 3],
    #[serde(default = "default_midnight_sky")]
    pub midnight_sky: [f32; 3],
    /// How far from the shadow target the sun is reported to sit.
    #[serde(default = "default_sun_distance")]
    pub sun_distance: f32,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            max_elevation: default_max_elevation(),
            night_elevation: default_night_elevation(),
            day_color: default_day_color(),
            day_intensity: default_day_intensity(),
            night_color: default_night_color(),
            night_intensity: default_night_intensity(),
            noon_sky: default_noon_sky(),
            midnight_sky: default_midnight_sky(),
            sun_distance: default_sun_distance(),
        }
    }
}

impl SolarConfig {
    pub fn model(&self) -> SolarModel {
        SolarModel {
            max_elevation_deg: self.max_elevation,
            night_elevation_deg: self.night_elevation,
            day_color: Vector3::from(self.day_color),
            day_intensity: self.day_intensity,
            night_color: Vector3::from(self.night_color),
            night_intensity: self.night_intensity,
            noon_sky: Vector3::from(self.noon_sky),
            midnight_sky: Vector3::from(self.midnight_sky),
        }
    }
}

fn default_max_elevation() -> f32 {
    60.0
}
fn default_night_elevation() -> f32 {
    -10.0
}
fn default_day_color() -> [f32; 3] {
    [1.0, 0.98, 0.95]
}
fn default_day_intensity() -> f32 {
    3.0
}
fn default_night_color() -> [f32; 3] {
    [0.25, 0.30, 0.55]
}
fn default_night_intensity() -> f32 {
    0.05
}
fn default_noon_sky() -> [f32; 3] {
    [0.7, 0.85, 0.95]
}
fn default_midnight_sky() -> [f32; 3] {
    [0.02, 0.03, 0.08]
}
fn default_sun_distance() -> f32 {
    10.0
}

// --- [shadow] ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShadowConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_shadow_resolution")]
    pub resolution: usize,
    #[serde(default = "default_shadow_bias")]
    pub bias: f32,
    #[serde(default = "default_shadow_range")]
    pub range: f32,
    #[serde(default = "default_ortho_half_extent")]
    pub ortho_half_extent: f32,
    #[serde(default = "default_depth_half_range")]
    pub depth_half_range: f32,
    #[serde(default = "default_point_fov")]
    pub point_fov: f32,
    #[serde(default = "default_pcf_radius")]
    pub pcf_radius: i32,
    #[serde(default)]
    pub target: [f32; 3],
    /// "sun", "lamp" or "auto".
    #[serde(default = "default_caster")]
    pub caster: String,
    /// Lamp used by the "lamp" and "auto" casters.
    #[serde(default)]
    pub lamp: usize,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resolution: default_shadow_resolution(),
            bias: default_shadow_bias(),
            range: default_shadow_range(),
            ortho_half_extent: default_ortho_half_extent(),
            depth_half_range: default_depth_half_range(),
            point_fov: default_point_fov(),
            pcf_radius: default_pcf_radius(),
            target: [0.0; 3],
            caster: default_caster(),
            lamp: 0,
        }
    }
}

impl ShadowConfig {
    pub fn settings(&self) -> ShadowSettings {
        ShadowSettings {
            resolution: self.resolution,
            bias: self.bias,
            range: self.range,
            ortho_half_extent: self.ortho_half_extent,
            depth_half_range: self.depth_half_range,
            point_fov_deg: self.point_fov,
            pcf_radius: self.pcf_radius,
            target: Point3::from(self.target),
        }
    }
}

fn default_shadow_resolution() -> usize {
    2048
}
fn default_shadow_bias() -> f32 {
    0.005
}
fn default_shadow_range() -> f32 {
    20.0
}
fn default_ortho_half_extent() -> f32 {
    8.0
}
fn default_depth_half_range() -> f32 {
    9.0
}
fn default_point_fov() -> f32 {
    90.0
}
fn default_pcf_radius() -> i32 {
    1
}
fn default_caster() -> String {
    "auto".to_string()
}

// --- [obj] ---

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ObjConfig {
    /// Fan-triangulate polygons instead of keeping only their first three corners.
    #[serde(default)]
    pub triangulate_polygons: bool,
}

// --- [[lamps]] ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LampConfig {
    pub position: [f32; 3],
    #[serde(default = "default_lamp_color")]
    pub color: [f32; 3],
    pub intensity: f32,
    #[serde(default = "default_attenuation")]
    pub attenuation: [f32; 3],
}

fn default_lamp_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}
fn default_attenuation() -> [f32; 3] {
    let (c, l, q) = DEFAULT_ATTENUATION;
    [c, l, q]
}

const LAMP_HEIGHT: f32 = 4.8;

fn lamp(x: f32, z: f32, color: [f32; 3], intensity: f32) -> LampConfig {
    LampConfig {
        position: [x, LAMP_HEIGHT, z],
        color,
        intensity,
        attenuation: default_attenuation(),
    }
}

fn default_lamps() -> Vec<LampConfig> {
    vec![
        lamp(0.0, 0.0, [1.0, 0.95, 0.85], 50.0),
        lamp(-5.0, 0.0, [1.0, 0.98, 0.9], 40.0),
        lamp(5.0, 0.0, [1.0, 0.98, 0.9], 40.0),
        lamp(0.0, -4.0, [0.95, 0.98, 1.0], 35.0),
        lamp(0.0, 4.0, [0.9, 0.95, 1.0], 30.0),
        lamp(6.0, 6.0, [0.85, 0.9, 1.0], 25.0),
    ]
}

// --- [[materials]] ---

/// A named PBR material: five texture files when `dir` and `stem` are given,
/// otherwise a solid colour built from the scalar fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MaterialConfig {
    pub name: String,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub stem: Option<String>,
    /// sRGB.
    #[serde(default = "default_albedo")]
    pub albedo: [f32; 3],
    #[serde(default)]
    pub metallic: f32,
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    #[serde(default = "default_one")]
    pub ao: f32,
    /// The roughness channel holds gloss.
    #[serde(default)]
    pub gloss: bool,
}

fn default_albedo() -> [f32; 3] {
    [0.8, 0.8, 0.8]
}
fn default_roughness() -> f32 {
    0.6
}

fn solid(
    name: &str,
    albedo: [f32; 3],
    metallic: f32,
    roughness: f32,
    gloss: bool,
) -> MaterialConfig {
    MaterialConfig {
        name: name.to_string(),
        dir: None,
        stem: None,
        albedo,
        metallic,
        roughness,
        ao: 1.0,
        gloss,
    }
}

fn default_materials() -> Vec<MaterialConfig> {
    vec![
        solid("floor", [0.55, 0.38, 0.24], 0.0, 0.55, false),
        // Stored as gloss, so 0.35 reads back as roughness 0.65.
        solid("tile", [0.86, 0.85, 0.82], 0.0, 0.35, true),
        solid("oak", [0.62, 0.45, 0.28], 0.0, 0.45, false),
        solid("metal", [0.62, 0.64, 0.66], 1.0, 0.35, false),
    ]
}

// --- [[objects]] ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// OBJ file. Without one the object is a unit cube sized by `scale`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_object_material")]
    pub material: String,
    #[serde(default)]
    pub position: [f32; 3],
    /// Euler angles in degrees.
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    #[serde(default = "default_true")]
    pub casts_shadow: bool,
}

fn default_object_material() -> String {
    "default".to_string()
}
fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

const ROOM_SIZE: f32 = 15.0;
const WALL_HEIGHT: f32 = 5.0;
const WALL_THICKNESS: f32 = 0.2;
const FLOOR_THICKNESS: f32 = 0.1;
const FRAME_THICKNESS: f32 = 0.05;

fn slab(
    name: &str,
    position: [f32; 3],
    size: [f32; 3],
    material: &str,
    casts_shadow: bool,
) -> ObjectConfig {
    ObjectConfig {
        name: Some(name.to_string()),
        path: None,
        material: material.to_string(),
        position,
        rotation: [0.0; 3],
        scale: size,
        casts_shadow,
    }
}

fn default_objects() -> Vec<ObjectConfig> {
    let half = ROOM_SIZE * 0.5;
    let floor_top = FLOOR_THICKNESS * 0.5;
    let wall_y = floor_top + WALL_HEIGHT * 0.5;
    let wall_offset = half + WALL_THICKNESS * 0.5;
    let side_wall = [WALL_THICKNESS, WALL_HEIGHT, ROOM_SIZE];
    let end_wall = [ROOM_SIZE, WALL_HEIGHT, WALL_THICKNESS];

    let mut objects = vec![
        slab("floor", [0.0, 0.0, 0.0], [ROOM_SIZE, FLOOR_THICKNESS, ROOM_SIZE], "floor", false),
        slab(
            "ceiling",
            [0.0, WALL_HEIGHT + FLOOR_THICKNESS, 0.0],
            [ROOM_SIZE, FLOOR_THICKNESS, ROOM_SIZE],
            "tile",
            true,
        ),
        slab("wall_left", [-wall_offset, wall_y, 0.0], side_wall, "tile", true),
        slab("wall_back", [0.0, wall_y, -wall_offset], end_wall, "tile", true),
        slab("wall_front", [0.0, wall_y, wall_offset], end_wall, "tile", true),
    ];

    // The +X side is an open window: only its metal frame is solid.
    let frame_x = half + FRAME_THICKNESS * 0.5;
    objects.push(slab(
        "window_sill",
        [frame_x, floor_top + FRAME_THICKNESS * 0.5, 0.0],
        [FRAME_THICKNESS, FRAME_THICKNESS, ROOM_SIZE],
        "metal",
        true,
    ));
    objects.push(slab(
        "window_head",
        [frame_x, floor_top + WALL_HEIGHT - FRAME_THICKNESS * 0.5, 0.0],
        [FRAME_THICKNESS, FRAME_THICKNESS, ROOM_SIZE],
        "metal",
        true,
    ));
    for (i, z) in [-(half - FRAME_THICKNESS * 0.5), 0.0, half - FRAME_THICKNESS * 0.5]
        .into_iter()
        .enumerate()
    {
        objects.push(slab(
            &format!("window_mullion_{i}"),
            [frame_x, wall_y, z],
            [FRAME_THICKNESS, WALL_HEIGHT, FRAME_THICKNESS],
            "metal",
            true,
        ));
    }

    // Reading tables: three rows of four, top plus pedestal.
    for row in 0..3 {
        for t in 0..4 {
            let x = -5.0 + row as f32 * 4.0;
            let z = -5.0 + t as f32 * 2.6 + 1.25;
            objects.push(slab(
                &format!("table_{row}_{t}_top"),
                [x, floor_top + 0.75, z],
                [1.6, 0.06, 1.0],
                "oak",
                true,
            ));
            objects.push(slab(
                &format!("table_{row}_{t}_leg"),
                [x, floor_top + 0.36, z],
                [0.12, 0.72, 0.12],
                "metal",
                true,
            ));
        }
    }
    objects
}

// --- [[plants]] ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlantConfig {
    pub seed: u64,
    /// Base of the pot; y defaults to the floor surface.
    #[serde(default)]
    pub position: [f32; 3],
    /// Rotation about +Y in degrees.
    #[serde(default)]
    pub yaw: f32,
    #[serde(default = "default_plant_scale")]
    pub scale: f32,
}

fn default_plant_scale() -> f32 {
    2.0
}

fn default_plants() -> Vec<PlantConfig> {
    let floor_top = FLOOR_THICKNESS * 0.5;
    [
        (-6.0, -5.5, 25.0),
        (-6.0, 0.0, -10.0),
        (-6.0, 5.5, 55.0),
        (6.0, -5.5, -35.0),
        (6.0, 0.0, 15.0),
        (4.2, 4.2, -60.0),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (x, z, yaw))| PlantConfig {
        seed: 1000 + i as u64,
        position: [x, floor_top, z],
        yaw,
        scale: default_plant_scale(),
    })
    .collect()
}
