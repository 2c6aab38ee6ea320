use crate::error::Result;
use crate::io::config::{Config, MaterialConfig};
use crate::io::obj_loader::ObjLoadOptions;
use crate::scene::camera::Camera;
use crate::scene::context::{Scene, ShadowCaster};
use crate::scene::light::Light;
use crate::scene::material::{MaterialPaths, MaterialTable, PbrTextureMaterial};
use crate::scene::model::Model;
use crate::scene::plant::create_potted_plant;
use crate::scene::procedural::MeshBuilder;
use crate::scene::scene_object::{DrawableRef, SceneObject};
use log::{info, warn};
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

pub fn build_camera(config: &Config) -> Camera {
    let c = &config.camera;
    let aspect_ratio = config.render.width.max(1) as f32 / config.render.height.max(1) as f32;
    Camera::new_perspective(
        Point3::from(c.position),
        Point3::from(c.target),
        Vector3::from(c.up),
        c.fov.to_radians(),
        aspect_ratio,
        c.near,
        c.far,
    )
}

pub fn build_lamps(config: &Config) -> Vec<Light> {
    config
        .lamps
        .iter()
        .map(|l| {
            let [c, lin, q] = l.attenuation;
            Light::new_point(Point3::from(l.position), Vector3::from(l.color), l.intensity)
                .with_attenuation(c, lin, q)
        })
        .collect()
}

fn build_material(entry: &MaterialConfig, base_dir: &Path) -> PbrTextureMaterial {
    match (&entry.dir, &entry.stem) {
        (Some(dir), Some(stem)) => {
            PbrTextureMaterial::load(&MaterialPaths::poliigon(base_dir.join(dir), stem))
                .with_gloss_map(entry.gloss)
        }
        (dir, stem) => {
            if dir.is_some() != stem.is_some() {
                warn!(
                    "Material '{}' needs both dir and stem for textures, using a solid colour",
                    entry.name
                );
            }
            PbrTextureMaterial::solid(entry.albedo, entry.metallic, entry.roughness, entry.ao)
                .with_gloss_map(entry.gloss)
        }
    }
}

pub fn build_materials(config: &Config, base_dir: &Path) -> MaterialTable {
    let mut table = MaterialTable::new();
    for entry in &config.materials {
        if table.insert(entry.name.clone(), build_material(entry, base_dir)).is_some() {
            warn!("Material '{}' defined twice, keeping the last one", entry.name);
        }
    }
    table
}

/// Loads every asset the config names and places it. Relative paths resolve
/// against `base_dir`. Missing files leave empty models behind rather than
/// failing; only an invalid shadow caster is an error.
pub fn build_scene(config: &Config, base_dir: &Path) -> Result<Scene> {
    let start = Instant::now();
    let mut scene = Scene::new(config.solar.model());
    scene.caster = ShadowCaster::parse(&config.shadow.caster, config.shadow.lamp)?;
    scene.ambient = Vector3::from(config.render.ambient);
    scene.sun_distance = config.solar.sun_distance;
    scene.lamps = build_lamps(config);
    scene.materials = build_materials(config, base_dir);

    let options = ObjLoadOptions {
        triangulate_polygons: config.obj.triangulate_polygons,
    };
    let mut loaded: HashMap<String, DrawableRef> = HashMap::new();
    let mut unit_cube: Option<DrawableRef> = None;

    for (i, entry) in config.objects.iter().enumerate() {
        let drawable = match &entry.path {
            Some(path) => *loaded
                .entry(path.clone())
                .or_insert_with(|| scene.add_model(Model::load(base_dir.join(path), &options))),
            None => *unit_cube.get_or_insert_with(|| {
                let mut builder = MeshBuilder::new();
                builder.cuboid(Point3::origin(), Vector3::repeat(0.5));
                scene.add_model(Model::from_mesh(builder.build()))
            }),
        };

        if !scene.materials.contains(&entry.material) {
            warn!(
                "Object {} uses unknown material '{}', drawing it with the default",
                i, entry.material
            );
        }
        let name = entry.name.clone().unwrap_or_else(|| format!("object_{i}"));
        scene.place(
            SceneObject::placed(
                name,
                drawable,
                entry.position,
                entry.rotation,
                entry.scale,
                entry.material.clone(),
            )
            .with_shadow(entry.casts_shadow),
        );
    }

    for entry in &config.plants {
        let plant = scene.add_plant(create_potted_plant(entry.seed));
        scene.place(SceneObject::placed(
            format!("plant_{}", entry.seed),
            plant,
            entry.position,
            [0.0, entry.yaw, 0.0],
            [entry.scale; 3],
            "default",
        ));
    }

    scene.update_lighting(config.time.initial_hour());
    info!(
        "Scene ready: {} placements, {} triangles, {} lamps, {} materials in {:.2?}",
        scene.objects.len(),
        scene.triangle_count(),
        scene.lamps.len(),
        scene.materials.len(),
        start.elapsed()
    );
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_the_reading_room() {
        let config = Config::default();
        let scene = build_scene(&config, Path::new(".")).unwrap();

        assert_eq!(scene.lamps.len(), 6);
        assert_eq!(scene.plants.len(), 6);
        // One shared cube for every slab.
        assert_eq!(scene.models.len(), 1);
        assert_eq!(scene.objects.len(), config.objects.len() + config.plants.len());
        assert!(scene.materials.contains("tile"));
        assert!(scene.materials.get("tile").unwrap().use_gloss_map);
        assert!(scene.triangle_count() > 0);
    }

    #[test]
    fn missing_obj_becomes_an_empty_model() {
        let mut config = Config::default();
        config.objects.clear();
        config.plants.clear();
        config.objects.push(crate::io::config::ObjectConfig {
            name: None,
            path: Some("does/not/exist.obj".to_string()),
            material: "nope".to_string(),
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            casts_shadow: true,
        });
        let scene = build_scene(&config, &std::env::temp_dir()).unwrap();
        assert_eq!(scene.models.len(), 1);
        assert!(scene.models[0].is_empty());
        assert_eq!(scene.triangle_count(), 0);
    }

    #[test]
    fn bad_caster_is_rejected() {
        let mut config = Config::default();
        config.shadow.caster = "moon".to_string();
        assert!(build_scene(&config, Path::new(".")).is_err());
    }
}
