use crate::scene::mesh::Mesh;
use crate::scene::model::Model;

/// Anything the renderer can draw: a single mesh, a loaded model, or a
/// procedural part.
pub trait Drawable {
    fn meshes(&self) -> &[Mesh];

    fn triangle_count(&self) -> usize {
        self.meshes().iter().map(Mesh::triangle_count).sum()
    }
}

impl Drawable for Mesh {
    fn meshes(&self) -> &[Mesh] {
        std::slice::from_ref(self)
    }
}

impl Drawable for Model {
    fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }
}
