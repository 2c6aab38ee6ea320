use nalgebra::{Point3, Vector2, Vector3};

/// Vectors shorter than this are treated as degenerate.
pub const DEGENERATE_EPS: f32 = 1e-4;

/// A single vertex in object space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub texcoord: Vector2<f32>,
    /// Points along increasing U. Zero until `compute_tangents` runs.
    pub tangent: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>, texcoord: Vector2<f32>) -> Self {
        Self {
            position,
            normal,
            texcoord,
            tangent: Vector3::zeros(),
        }
    }
}

/// Normalizes `v`, or returns `fallback` when `v` is too short to have a direction.
#[inline]
pub fn normalize_or(v: Vector3<f32>, fallback: Vector3<f32>) -> Vector3<f32> {
    let len = v.norm();
    if len < DEGENERATE_EPS { fallback } else { v / len }
}

/// A unit vector perpendicular to `n`, built against whichever world axis is
/// least aligned with it.
pub fn perpendicular_to(n: &Vector3<f32>) -> Vector3<f32> {
    let reference = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::z()
    };
    normalize_or(n.cross(&reference), Vector3::x())
}

fn triangles(indices: &[u32], vertex_count: usize) -> impl Iterator<Item = [usize; 3]> + '_ {
    indices
        .chunks_exact(3)
        .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
        .filter(move |t| t.iter().all(|&i| i < vertex_count))
}

fn accumulated_face_normals(vertices: &[Vertex], indices: &[u32]) -> Vec<Vector3<f32>> {
    let mut sums = vec![Vector3::zeros(); vertices.len()];
    for [a, b, c] in triangles(indices, vertices.len()) {
        let p0 = vertices[a].position;
        let face = (vertices[b].position - p0).cross(&(vertices[c].position - p0));
        // Zero-area faces carry no orientation.
        if face.norm() < DEGENERATE_EPS * DEGENERATE_EPS {
            continue;
        }
        // Unnormalized, so larger faces weigh more.
        sums[a] += face;
        sums[b] += face;
        sums[c] += face;
    }
    sums
}

/// Replaces every normal with the area-weighted average of its faces.
/// Vertices without a usable face get +Y.
pub fn compute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let sums = accumulated_face_normals(vertices, indices);
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        vertex.normal = normalize_or(sum, Vector3::y());
    }
}

/// Normalizes file-supplied normals and rebuilds only the ones that are
/// missing or zero. Returns how many were rebuilt.
pub fn repair_normals(vertices: &mut [Vertex], indices: &[u32]) -> usize {
    let broken = vertices
        .iter()
        .filter(|v| v.normal.norm() < DEGENERATE_EPS)
        .count();

    let sums = (broken > 0).then(|| accumulated_face_normals(vertices, indices));
    for (i, vertex) in vertices.iter_mut().enumerate() {
        if vertex.normal.norm() >= DEGENERATE_EPS {
            vertex.normal = vertex.normal.normalize();
        } else if let Some(sums) = &sums {
            vertex.normal = normalize_or(sums[i], Vector3::y());
        }
    }
    broken
}

/// Per-vertex tangents from UV gradients, Gram-Schmidt orthogonalized against
/// the (already final) normals.
pub fn compute_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    let mut sums = vec![Vector3::zeros(); vertices.len()];

    for [a, b, c] in triangles(indices, vertices.len()) {
        let (v0, v1, v2) = (&vertices[a], &vertices[b], &vertices[c]);
        let e1 = v1.position - v0.position;
        let e2 = v2.position - v0.position;
        let d1 = v1.texcoord - v0.texcoord;
        let d2 = v2.texcoord - v0.texcoord;

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < 1e-8 {
            continue;
        }
        let f = 1.0 / det;
        let tangent = (e1 * d2.y - e2 * d1.y) * f;
        if !tangent.iter().all(|c| c.is_finite()) {
            continue;
        }

        sums[a] += tangent;
        sums[b] += tangent;
        sums[c] += tangent;
    }

    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        let n = vertex.normal;
        let t = sum - n * n.dot(&sum);
        vertex.tangent = if t.norm() < DEGENERATE_EPS {
            perpendicular_to(&n)
        } else {
            t.normalize()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> (Vec<Vertex>, Vec<u32>) {
        let v = |x: f32, y: f32| {
            Vertex::new(Point3::new(x, y, 0.0), Vector3::zeros(), Vector2::new(x, y))
        };
        (
            vec![v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn flat_quad_gets_facing_normal_and_u_tangent() {
        let (mut verts, idx) = quad();
        compute_normals(&mut verts, &idx);
        compute_tangents(&mut verts, &idx);
        for v in &verts {
            assert_relative_eq!(v.normal, Vector3::z(), epsilon = 1e-5);
            assert_relative_eq!(v.tangent, Vector3::x(), epsilon = 1e-5);
        }
    }

    #[test]
    fn degenerate_triangle_falls_back_without_nan() {
        let p = Point3::new(1.0, 1.0, 1.0);
        let mut verts = vec![Vertex::new(p, Vector3::zeros(), Vector2::zeros()); 3];
        let idx = vec![0, 1, 2];
        compute_normals(&mut verts, &idx);
        compute_tangents(&mut verts, &idx);
        for v in &verts {
            assert_eq!(v.normal, Vector3::y());
            assert_relative_eq!(v.tangent.norm(), 1.0, epsilon = 1e-4);
            assert!(v.tangent.dot(&v.normal).abs() < 1e-4);
        }
    }

    #[test]
    fn tangent_is_orthogonal_to_tilted_normal() {
        let (mut verts, idx) = quad();
        for v in &mut verts {
            v.normal = Vector3::new(0.3, 0.0, 1.0).normalize();
        }
        compute_tangents(&mut verts, &idx);
        for v in &verts {
            assert_relative_eq!(v.tangent.norm(), 1.0, epsilon = 1e-4);
            assert!(v.tangent.dot(&v.normal).abs() < 1e-4);
        }
    }

    #[test]
    fn repair_only_touches_missing_normals() {
        let (mut verts, idx) = quad();
        verts[0].normal = Vector3::new(0.0, 0.0, 5.0);
        verts[1].normal = Vector3::new(1.0, 0.0, 0.0);
        let rebuilt = repair_normals(&mut verts, &idx);
        assert_eq!(rebuilt, 2);
        assert_relative_eq!(verts[0].normal, Vector3::z(), epsilon = 1e-6);
        assert_relative_eq!(verts[1].normal, Vector3::x(), epsilon = 1e-6);
        assert_relative_eq!(verts[3].normal, Vector3::z(), epsilon = 1e-5);
    }

    #[test]
    fn perpendicular_avoids_parallel_axis() {
        let n = Vector3::x();
        let p = perpendicular_to(&n);
        assert!(p.dot(&n).abs() < 1e-6);
        assert_relative_eq!(p.norm(), 1.0, epsilon = 1e-6);
    }
}
