use crate::error::{RenderError, Result};
use crate::pipeline::renderer::Renderer;
use crate::pipeline::shaders::pbr::{PbrShader, ShadowInput};
use crate::pipeline::shadow_map::ShadowMap;
use crate::scene::camera::Camera;
use crate::scene::drawable::Drawable;
use crate::scene::light::Light;
use crate::scene::material::{MaterialTable, PbrTextureMaterial};
use crate::scene::model::Model;
use crate::scene::plant::PottedPlant;
use crate::scene::scene_object::{DrawableRef, SceneObject};
use crate::scene::solar::{SolarModel, wrap_hour};
use log::{debug, warn};
use nalgebra::{Matrix4, Point3, Vector3};

/// Index of the sun in `Scene::lights`; lamps follow it.
pub const SUN_LIGHT_INDEX: usize = 0;

/// Which light renders into the single shadow map each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowCaster {
    Sun,
    Lamp(usize),
    /// The sun while it is above the horizon, otherwise `lamp`.
    Auto { lamp: usize },
}

impl ShadowCaster {
    pub fn parse(name: &str, lamp: usize) -> Result<Self> {
        match name {
            "sun" => Ok(ShadowCaster::Sun),
            "lamp" => Ok(ShadowCaster::Lamp(lamp)),
            "auto" => Ok(ShadowCaster::Auto { lamp }),
            other => Err(RenderError::Config(format!(
                "unknown shadow caster '{other}' (expected sun, lamp or auto)"
            ))),
        }
    }
}

/// Sun state derived from the hour.
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub hour: f32,
    pub sun: Light,
    /// Nominal sun position, `sun_distance` back along the light direction.
    pub sun_position: Point3<f32>,
    pub sky: Vector3<f32>,
    pub daytime: bool,
}

/// Owns all scene geometry, materials and lights, and drives the depth and
/// colour passes.
pub struct Scene {
    pub models: Vec<Model>,
    pub plants: Vec<PottedPlant>,
    pub materials: MaterialTable,
    pub objects: Vec<SceneObject>,
    pub lamps: Vec<Light>,
    pub solar: SolarModel,
    pub caster: ShadowCaster,
    pub ambient: Vector3<f32>,
    pub sun_distance: f32,
    lighting: Lighting,
}

impl Scene {
    pub fn new(solar: SolarModel) -> Self {
        let mut scene = Self {
            models: Vec::new(),
            plants: Vec::new(),
            materials: MaterialTable::new(),
            objects: Vec::new(),
            lamps: Vec::new(),
            caster: ShadowCaster::Auto { lamp: 0 },
            ambient: Vector3::repeat(0.03),
            sun_distance: 10.0,
            lighting: Lighting {
                hour: 12.0,
                sun: Light::new_directional(-Vector3::y(), Vector3::repeat(1.0), 1.0),
                sun_position: Point3::origin(),
                sky: Vector3::zeros(),
                daytime: true,
            },
            solar,
        };
        scene.update_lighting(12.0);
        scene
    }

    pub fn add_model(&mut self, model: Model) -> DrawableRef {
        self.models.push(model);
        DrawableRef::Model(self.models.len() - 1)
    }

    pub fn add_plant(&mut self, plant: PottedPlant) -> DrawableRef {
        self.plants.push(plant);
        DrawableRef::Plant(self.plants.len() - 1)
    }

    pub fn place(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn drawable(&self, reference: DrawableRef) -> Option<&dyn Drawable> {
        match reference {
            DrawableRef::Model(i) => self.models.get(i).map(|m| m as &dyn Drawable),
            DrawableRef::Plant(i) => self.plants.get(i).map(|p| p as &dyn Drawable),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.objects
            .iter()
            .filter_map(|o| self.drawable(o.drawable))
            .map(|d| d.triangle_count())
            .sum()
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    /// Recomputes the sun and sky for `hour` (wrapped into [0, 24)).
    pub fn update_lighting(&mut self, hour: f32) {
        let hour = wrap_hour(hour);
        let direction = self.solar.sun_direction(hour);
        let (color, intensity) = self.solar.sun_color_and_intensity(hour);
        self.lighting = Lighting {
            hour,
            sun: Light::new_directional(direction, color, intensity),
            sun_position: Point3::origin() - direction * self.sun_distance,
            sky: self.solar.background_color(hour),
            daytime: self.solar.is_daytime(hour),
        };
    }

    /// Sun first, then the lamps in order.
    pub fn lights(&self) -> Vec<Light> {
        std::iter::once(self.lighting.sun.clone())
            .chain(self.lamps.iter().cloned())
            .collect()
    }

    /// Resolves the caster policy against the current lighting. Returns the
    /// light and its index in `lights()`.
    pub fn shadow_light(&self) -> (Light, usize) {
        let lamp = match self.caster {
            ShadowCaster::Sun => None,
            ShadowCaster::Lamp(i) => Some(i),
            ShadowCaster::Auto { lamp } if !self.lighting.daytime => Some(lamp),
            ShadowCaster::Auto { .. } => None,
        };
        match lamp.map(|i| (i, self.lamps.get(i))) {
            Some((i, Some(light))) => (light.clone(), i + 1),
            Some((i, None)) => {
                debug!("Shadow caster lamp {} does not exist, using the sun", i);
                (self.lighting.sun.clone(), SUN_LIGHT_INDEX)
            }
            None => (self.lighting.sun.clone(), SUN_LIGHT_INDEX),
        }
    }

    /// Unknown names were already reported when the scene was built.
    fn material(&self, name: &str) -> &PbrTextureMaterial {
        self.materials
            .get(name)
            .unwrap_or_else(|| self.materials.default_material())
    }

    /// Renders every shadow-casting placement into `shadow_map` from the
    /// selected caster's point of view.
    pub fn render_shadow_pass(&self, shadow_map: &mut ShadowMap) -> Result<ShadowInput> {
        let (light, light_index) = self.shadow_light();
        shadow_map.begin_shadow_pass(light.position(), light.direction(), light.kind())?;

        for object in self.objects.iter().filter(|o| o.casts_shadow) {
            let Some(drawable) = self.drawable(object.drawable) else {
                continue;
            };
            shadow_map.draw(drawable, &object.transform)?;
        }

        let depth = shadow_map.end_shadow_pass()?;
        Ok(ShadowInput {
            depth,
            light_space: shadow_map.light_space_matrix(),
            bias: shadow_map.bias(),
            pcf_radius: shadow_map.pcf_radius(),
            light_index,
        })
    }

    /// Clears to the sky colour and shades every placement. Materials are
    /// bound per draw; plants bind one material per part.
    pub fn render_color_pass(
        &self,
        renderer: &mut Renderer,
        camera: &Camera,
        shadow: Option<&ShadowInput>,
    ) {
        renderer.clear(self.lighting.sky);

        let mut shader = PbrShader::new(
            Matrix4::identity(),
            camera.view_matrix(),
            camera.projection_matrix(),
            camera.position,
        );
        shader.lights = self.lights();
        shader.ambient_light = self.ambient;
        shader.shadow = shadow.cloned();

        for object in &self.objects {
            shader.set_model(object.transform);
            match object.drawable {
                DrawableRef::Model(i) => {
                    let Some(model) = self.models.get(i) else {
                        warn!("Placement '{}' refers to missing model {}", object.name, i);
                        continue;
                    };
                    renderer.draw_with_material(model, self.material(&object.material), &shader);
                }
                DrawableRef::Plant(i) => {
                    let Some(plant) = self.plants.get(i) else {
                        warn!("Placement '{}' refers to missing plant {}", object.name, i);
                        continue;
                    };
                    for (mesh, material) in plant.parts() {
                        renderer.draw_with_material(mesh, material, &shader);
                    }
                }
            }
        }
        renderer.units.unbind_all();
    }
}
