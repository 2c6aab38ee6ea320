use crate::io::obj_loader::{ObjData, ObjLoadOptions, load_obj};
use crate::scene::material::{DEFAULT_MATERIAL, MaterialLibrary, MtlMaterial, default_library};
use crate::scene::mesh::Mesh;
use log::{error, info};
use nalgebra::Vector3;
use std::path::{Path, PathBuf};

/// Geometry loaded from one OBJ file plus its MTL records.
///
/// Loading never fails outright: on error the model simply has no meshes,
/// and callers are expected to cope with that.
#[derive(Debug, Clone)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: MaterialLibrary,
    pub active_material: String,
    pub source: Option<PathBuf>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            meshes: Vec::new(),
            materials: default_library(),
            active_material: DEFAULT_MATERIAL.to_string(),
            source: None,
        }
    }
}

impl Model {
    pub fn from_mesh(mesh: Mesh) -> Self {
        Self {
            meshes: vec![mesh],
            ..Self::default()
        }
    }

    pub fn from_obj(data: ObjData) -> Self {
        Self {
            meshes: data.mesh.into_iter().collect(),
            materials: data.materials,
            active_material: data.active_material,
            source: None,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P, options: &ObjLoadOptions) -> Self {
        let path = path.as_ref();
        match load_obj(path, options) {
            Ok(data) => {
                let mut model = Self::from_obj(data);
                model.source = Some(path.to_path_buf());
                if model.is_empty() {
                    info!("Model {:?} produced no geometry", path);
                }
                model
            }
            Err(e) => {
                error!("Failed to load model {:?}: {}", path, e);
                Self {
                    source: Some(path.to_path_buf()),
                    ..Self::default()
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.iter().all(Mesh::is_empty)
    }

    pub fn active(&self) -> Option<&MtlMaterial> {
        self.materials.get(&self.active_material)
    }

    /// Diffuse colour of the active material, or 0.8 grey when the name was
    /// never defined.
    pub fn material_color(&self) -> Vector3<f32> {
        self.active()
            .map(|m| m.diffuse)
            .unwrap_or_else(|| Vector3::repeat(0.8))
    }

    /// Whether an MTL file contributed data: a named material, or a default
    /// whose diffuse colour was overridden.
    pub fn has_mtl_material(&self) -> bool {
        self.materials.len() > 1
            || self
                .materials
                .get(DEFAULT_MATERIAL)
                .is_some_and(|m| m.diffuse != MtlMaterial::default().diffuse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unreadable_file_gives_empty_model() {
        let path = std::env::temp_dir().join("reading_room_missing_model.obj");
        let model = Model::load(&path, &ObjLoadOptions::default());
        assert!(model.meshes.is_empty());
        assert!(model.is_empty());
        assert!(!model.has_mtl_material());
        assert_relative_eq!(model.material_color(), Vector3::repeat(0.8));
    }

    #[test]
    fn unknown_active_material_uses_grey() {
        let mut model = Model::default();
        model.active_material = "never_defined".into();
        assert!(model.active().is_none());
        assert_relative_eq!(model.material_color(), Vector3::repeat(0.8));
    }
}
