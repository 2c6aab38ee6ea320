use crate::core::framebuffer::FrameBuffer;
use crate::core::pipeline::Shader;
use crate::core::rasterizer::Rasterizer;
use crate::scene::drawable::Drawable;
use crate::scene::material::PbrTextureMaterial;
use crate::scene::mesh::Mesh;
use crate::scene::texture::Texture;
use nalgebra::Vector3;
use std::sync::Arc;

/// The five material sampler slots plus the gloss switch.
///
/// This is the renderer-wide binding state: it is overwritten by every
/// `bind_material` and nothing may assume it survives from one draw to the next.
/// Empty slots sample as the channel's neutral value.
#[derive(Debug, Clone, Default)]
pub struct TextureUnits {
    pub albedo: Option<Arc<Texture>>,
    pub normal: Option<Arc<Texture>>,
    pub metallic: Option<Arc<Texture>>,
    pub roughness: Option<Arc<Texture>>,
    pub ao: Option<Arc<Texture>>,
    /// The roughness slot holds a gloss map (roughness = 1 - sample).
    pub use_gloss_map: bool,
}

impl TextureUnits {
    pub fn bind_material(&mut self, material: &PbrTextureMaterial) {
        self.albedo = Some(Arc::clone(&material.albedo));
        self.normal = Some(Arc::clone(&material.normal));
        self.metallic = Some(Arc::clone(&material.metallic));
        self.roughness = Some(Arc::clone(&material.roughness));
        self.ao = Some(Arc::clone(&material.ao));
        self.use_gloss_map = material.use_gloss_map;
    }

    pub fn unbind_all(&mut self) {
        *self = Self::default();
    }

    pub fn bound_count(&self) -> usize {
        [
            &self.albedo,
            &self.normal,
            &self.metallic,
            &self.roughness,
            &self.ao,
        ]
        .iter()
        .filter(|slot| slot.is_some())
        .count()
    }
}

/// Owns a render target, the rasterizer state and the texture units.
pub struct Renderer {
    pub rasterizer: Rasterizer,
    pub framebuffer: FrameBuffer,
    pub units: TextureUnits,
}

impl Renderer {
    /// `sample_count` is the SSAA factor per axis (1 = off).
    pub fn new(width: usize, height: usize, sample_count: usize) -> Self {
        Self {
            rasterizer: Rasterizer::new(),
            framebuffer: FrameBuffer::new(width, height, sample_count),
            units: TextureUnits::default(),
        }
    }

    /// Square depth-only target for shadow passes.
    pub fn depth_only(size: usize) -> Self {
        Self {
            rasterizer: Rasterizer::new(),
            framebuffer: FrameBuffer::depth_only(size, size),
            units: TextureUnits::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.framebuffer.width
    }

    pub fn height(&self) -> usize {
        self.framebuffer.height
    }

    /// Reallocates the target if the size or sample count changed.
    pub fn resize(&mut self, width: usize, height: usize, sample_count: usize) {
        let fb = &self.framebuffer;
        if fb.width != width || fb.height != height || fb.sample_count != sample_count.max(1) {
            self.framebuffer = FrameBuffer::new(width, height, sample_count);
        }
    }

    pub fn clear(&mut self, color: Vector3<f32>) {
        self.framebuffer.clear(color, f32::INFINITY);
        self.rasterizer.reset_stats();
    }

    /// Binds `material` into the texture units, then draws every mesh of `drawable`.
    pub fn draw_with_material<D, S>(
        &mut self,
        drawable: &D,
        material: &PbrTextureMaterial,
        shader: &S,
    ) where
        D: Drawable + ?Sized,
        S: Shader,
    {
        self.units.bind_material(material);
        self.draw(drawable, shader);
    }

    /// Draws with whatever is currently bound.
    pub fn draw<D, S>(&mut self, drawable: &D, shader: &S)
    where
        D: Drawable + ?Sized,
        S: Shader,
    {
        for mesh in drawable.meshes() {
            self.draw_mesh(mesh, shader);
        }
    }

    fn draw_mesh<S: Shader>(&self, mesh: &Mesh, shader: &S) {
        let vertices = &mesh.vertices;
        for tri in mesh.indices.chunks_exact(3) {
            let (Some(v0), Some(v1), Some(v2)) = (
                vertices.get(tri[0] as usize),
                vertices.get(tri[1] as usize),
                vertices.get(tri[2] as usize),
            ) else {
                continue;
            };

            let (p0, a0) = shader.vertex(v0);
            let (p1, a1) = shader.vertex(v1);
            let (p2, a2) = shader.vertex(v2);

            self.rasterizer.rasterize_triangle(
                &self.framebuffer,
                shader,
                &[p0, p1, p2],
                &[a0, a1, a2],
                &self.units,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_replaces_previous_material() {
        let mut units = TextureUnits::default();
        assert_eq!(units.bound_count(), 0);

        let plain = PbrTextureMaterial::solid([0.5, 0.5, 0.5], 0.0, 0.5, 1.0);
        let mut glossy = PbrTextureMaterial::solid([0.9, 0.1, 0.1], 1.0, 0.2, 1.0);
        glossy.use_gloss_map = true;

        units.bind_material(&glossy);
        assert!(units.use_gloss_map);
        units.bind_material(&plain);
        assert_eq!(units.bound_count(), 5);
        assert!(!units.use_gloss_map);
        let bound = units.albedo.as_ref().map(Arc::as_ptr);
        assert_eq!(bound, Some(Arc::as_ptr(&plain.albedo)));

        units.unbind_all();
        assert_eq!(units.bound_count(), 0);
    }
}
