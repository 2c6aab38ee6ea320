use crate::core::geometry::Vertex;
use log::warn;
use nalgebra::Point3;

/// Axis-aligned bounds of a vertex set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f32>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |acc, p| Self {
            min: acc.min.inf(p),
            max: acc.max.sup(p),
        }))
    }
}

/// Vertex and index buffers for one drawable surface.
///
/// Built once and never mutated; every triple in `indices` is one
/// counter-clockwise triangle.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    bounds: Option<Aabb>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, mut indices: Vec<u32>) -> Self {
        let excess = indices.len() % 3;
        if excess != 0 {
            warn!(
                "Mesh index count {} is not a multiple of 3; dropping {} trailing index(es)",
                indices.len(),
                excess
            );
            indices.truncate(indices.len() - excess);
        }
        let bounds = Aabb::from_points(vertices.iter().map(|v| &v.position));
        Self {
            vertices,
            indices,
            bounds,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }
}
