use crate::core::geometry::Vertex;
use crate::pipeline::renderer::TextureUnits;
use nalgebra::{Vector3, Vector4};
use std::ops::{Add, Mul};

/// Per-vertex data that can be blended across a triangle (`a * wa + b * wb + c * wc`).
/// `Send + Sync` because fragments are shaded from rayon workers.
pub trait Interpolatable:
    Copy + Clone + Add<Output = Self> + Mul<f32, Output = Self> + Send + Sync
{
}

/// The programmable stages of the pipeline.
///
/// `vertex` returns a clip-space position plus the varying to interpolate.
/// `fragment` receives the interpolated varying and the texture units that were
/// bound for the current draw, and returns linear RGB radiance.
pub trait Shader: Send + Sync {
    type Varying: Interpolatable;

    fn vertex(&self, vertex: &Vertex) -> (Vector4<f32>, Self::Varying);

    fn fragment(&self, varying: Self::Varying, units: &TextureUnits) -> Vector3<f32>;
}
