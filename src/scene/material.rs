use crate::core::color::unit_to_u8;
use crate::scene::texture::{ColorSpace, Texture};
use log::{debug, warn};
use nalgebra::Vector3;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the material every library and table is guaranteed to hold.
pub const DEFAULT_MATERIAL: &str = "default";

/// One `newmtl` block of an MTL file.
#[derive(Debug, Clone, PartialEq)]
pub struct MtlMaterial {
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub shininess: f32,
}

impl Default for MtlMaterial {
    fn default() -> Self {
        Self {
            ambient: Vector3::repeat(0.2),
            diffuse: Vector3::repeat(0.8),
            specular: Vector3::repeat(0.1),
            shininess: 16.0,
        }
    }
}

/// Material records by name. Always contains [`DEFAULT_MATERIAL`].
pub type MaterialLibrary = HashMap<String, MtlMaterial>;

pub fn default_library() -> MaterialLibrary {
    HashMap::from([(DEFAULT_MATERIAL.to_string(), MtlMaterial::default())])
}

/// Neutral byte values for each channel, used when a map is missing.
pub mod neutral {
    pub const ALBEDO: [u8; 4] = [255, 255, 255, 255];
    pub const NORMAL: [u8; 4] = [128, 128, 255, 255];
    pub const METALLIC: [u8; 4] = [0, 0, 0, 255];
    /// 0.6 roughness.
    pub const ROUGHNESS: [u8; 4] = [153, 153, 153, 255];
    pub const AO: [u8; 4] = [255, 255, 255, 255];
}

/// File locations of the five PBR maps.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialPaths {
    pub albedo: PathBuf,
    pub normal: PathBuf,
    pub metallic: PathBuf,
    pub roughness: PathBuf,
    pub ao: PathBuf,
}

impl MaterialPaths {
    /// `<stem>_BaseColor.jpg`, `<stem>_Normal.png`, `<stem>_Metallic.jpg`,
    /// `<stem>_Roughness.jpg`, `<stem>_AmbientOcclusion.jpg` inside `dir`.
    pub fn poliigon<P: AsRef<Path>>(dir: P, stem: &str) -> Self {
        let dir = dir.as_ref();
        let file = |suffix: &str| dir.join(format!("{stem}_{suffix}"));
        Self {
            albedo: file("BaseColor.jpg"),
            normal: file("Normal.png"),
            metallic: file("Metallic.jpg"),
            roughness: file("Roughness.jpg"),
            ao: file("AmbientOcclusion.jpg"),
        }
    }
}

/// Five texture handles plus the gloss switch. Cloning shares the textures.
#[derive(Debug, Clone)]
pub struct PbrTextureMaterial {
    pub albedo: Arc<Texture>,
    pub normal: Arc<Texture>,
    pub metallic: Arc<Texture>,
    pub roughness: Arc<Texture>,
    pub ao: Arc<Texture>,
    /// The roughness map stores gloss (1 - roughness).
    pub use_gloss_map: bool,
}

impl Default for PbrTextureMaterial {
    fn default() -> Self {
        Self::neutral()
    }
}

impl PbrTextureMaterial {
    /// White, dielectric, 0.6 roughness, no occlusion.
    pub fn neutral() -> Self {
        let solid = |rgba, space| Arc::new(Texture::solid(rgba, space));
        Self {
            albedo: solid(neutral::ALBEDO, ColorSpace::Srgb),
            normal: solid(neutral::NORMAL, ColorSpace::Linear),
            metallic: solid(neutral::METALLIC, ColorSpace::Linear),
            roughness: solid(neutral::ROUGHNESS, ColorSpace::Linear),
            ao: solid(neutral::AO, ColorSpace::Linear),
            use_gloss_map: false,
        }
    }

    /// Loads all five maps. A channel that fails to load is replaced by its
    /// neutral 1x1 texture, so this never fails as a whole.
    pub fn load(paths: &MaterialPaths) -> Self {
        let channel = |path: &Path, space: ColorSpace, fallback: [u8; 4], name: &str| {
            match Texture::load(path, space) {
                Ok(tex) => Arc::new(tex),
                Err(e) => {
                    warn!("{name} map unavailable, using neutral value: {e}");
                    Arc::new(Texture::solid(fallback, space))
                }
            }
        };

        Self {
            albedo: channel(&paths.albedo, ColorSpace::Srgb, neutral::ALBEDO, "Albedo"),
            normal: channel(&paths.normal, ColorSpace::Linear, neutral::NORMAL, "Normal"),
            metallic: channel(&paths.metallic, ColorSpace::Linear, neutral::METALLIC, "Metallic"),
            roughness: channel(
                &paths.roughness,
                ColorSpace::Linear,
                neutral::ROUGHNESS,
                "Roughness",
            ),
            ao: channel(&paths.ao, ColorSpace::Linear, neutral::AO, "AO"),
            use_gloss_map: false,
        }
    }

    /// Five 1x1 textures. `albedo_srgb` is gamma-encoded, the scalars are linear.
    pub fn solid(albedo_srgb: [f32; 3], metallic: f32, roughness: f32, ao: f32) -> Self {
        let [r, g, b] = albedo_srgb.map(unit_to_u8);
        let grey = |x: f32| {
            let v = unit_to_u8(x);
            [v, v, v, 255]
        };
        Self {
            albedo: Arc::new(Texture::solid([r, g, b, 255], ColorSpace::Srgb)),
            normal: Arc::new(Texture::solid(neutral::NORMAL, ColorSpace::Linear)),
            metallic: Arc::new(Texture::solid(grey(metallic), ColorSpace::Linear)),
            roughness: Arc::new(Texture::solid(grey(roughness), ColorSpace::Linear)),
            ao: Arc::new(Texture::solid(grey(ao), ColorSpace::Linear)),
            use_gloss_map: false,
        }
    }

    pub fn with_gloss_map(mut self, enabled: bool) -> Self {
        self.use_gloss_map = enabled;
        self
    }
}

/// Named PBR materials. Textures are freed when the last handle drops.
#[derive(Debug, Clone)]
pub struct MaterialTable {
    materials: HashMap<String, PbrTextureMaterial>,
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialTable {
    pub fn new() -> Self {
        Self {
            materials: HashMap::from([(
                DEFAULT_MATERIAL.to_string(),
                PbrTextureMaterial::neutral(),
            )]),
        }
    }

    /// Returns the material previously stored under `name`, if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        material: PbrTextureMaterial,
    ) -> Option<PbrTextureMaterial> {
        let name = name.into();
        debug!("Material table: registered '{}'", name);
        self.materials.insert(name, material)
    }

    pub fn get(&self, name: &str) -> Option<&PbrTextureMaterial> {
        self.materials.get(name)
    }

    pub fn get_or_default(&self, name: &str) -> &PbrTextureMaterial {
        match self.materials.get(name) {
            Some(m) => m,
            None => {
                warn!("Unknown material '{}', using '{}'", name, DEFAULT_MATERIAL);
                self.default_material()
            }
        }
    }

    pub fn default_material(&self) -> &PbrTextureMaterial {
        // `new` seeds the default and `remove` refuses to drop it.
        &self.materials[DEFAULT_MATERIAL]
    }

    /// Removes a material. The default entry cannot be removed.
    pub fn remove(&mut self, name: &str) -> Option<PbrTextureMaterial> {
        if name == DEFAULT_MATERIAL {
            return None;
        }
        self.materials.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(String::as_str)
    }
}
