use crate::core::geometry::Vertex;
use crate::core::pipeline::{Interpolatable, Shader};
use crate::pipeline::renderer::TextureUnits;
use nalgebra::{Matrix4, Vector3, Vector4};
use std::ops::{Add, Mul};

/// The depth pass interpolates nothing.
#[derive(Clone, Copy, Debug)]
pub struct DepthVarying;

impl Add for DepthVarying {
    type Output = Self;
    fn add(self, _other: Self) -> Self {
        Self
    }
}

impl Mul<f32> for DepthVarying {
    type Output = Self;
    fn mul(self, _scalar: f32) -> Self {
        Self
    }
}

impl Interpolatable for DepthVarying {}

/// Transforms into light clip space; the rasterizer keeps only depth.
pub struct ShadowShader {
    pub mvp_matrix: Matrix4<f32>,
}

impl ShadowShader {
    pub fn new(light_space: &Matrix4<f32>, model: &Matrix4<f32>) -> Self {
        Self {
            mvp_matrix: light_space * model,
        }
    }
}

impl Shader for ShadowShader {
    type Varying = DepthVarying;

    fn vertex(&self, vertex: &Vertex) -> (Vector4<f32>, Self::Varying) {
        (self.mvp_matrix * vertex.position.to_homogeneous(), DepthVarying)
    }

    fn fragment(&self, _varying: Self::Varying, _units: &TextureUnits) -> Vector3<f32> {
        Vector3::zeros()
    }
}
