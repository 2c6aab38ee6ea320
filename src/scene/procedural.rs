//! Parametric primitives: frustum walls, disks, rim rings, leaf ribbons and
//! boxes. All guard their normalizations so degenerate input never yields NaN.

use crate::core::geometry::{DEGENERATE_EPS, Vertex, compute_tangents, normalize_or};
use crate::core::math::transform::rotate_about_axis;
use crate::scene::mesh::Mesh;
use nalgebra::{Point3, Vector2, Vector3};
use std::f32::consts::{PI, TAU};

/// Shape of one leaf strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafRibbon {
    pub base: Point3<f32>,
    /// Horizontal growth direction; the Y component is ignored.
    pub direction: Vector3<f32>,
    pub length: f32,
    pub width: f32,
    /// Rise from base to tip, before the arch.
    pub height: f32,
    /// Peak sideways offset of the centreline.
    pub curl: f32,
    /// Rotation of the cross-section about the centreline at the tip (radians).
    pub twist: f32,
    pub segments: u32,
}

/// Accumulates vertices and counter-clockwise triangles.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_index(&self) -> u32 {
        self.vertices.len() as u32
    }

    fn push(&mut self, position: Point3<f32>, normal: Vector3<f32>, uv: Vector2<f32>) {
        self.vertices.push(Vertex::new(position, normal, uv));
    }

    pub fn triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// `a-b-c` and `a-c-d`.
    pub fn quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.triangle(a, b, c);
        self.triangle(a, c, d);
    }

    /// Quads between consecutive (bottom, top) vertex pairs starting at `base`.
    fn stitch_strip(&mut self, base: u32, segments: u32, flip: bool) {
        for i in 0..segments {
            let i0 = base + i * 2;
            let (i1, i2, i3) = (i0 + 1, i0 + 3, i0 + 2);
            if flip {
                self.quad(i0, i3, i2, i1);
            } else {
                self.quad(i0, i1, i2, i3);
            }
        }
    }

    /// Lateral surface between the circle of radius `r0` at `y0` and the
    /// circle of radius `r1` at `y1`. Normals follow the slope of the
    /// generating line; `inward` flips both normals and winding.
    pub fn frustum_wall(
        &mut self,
        y0: f32,
        y1: f32,
        r0: f32,
        r1: f32,
        segments: u32,
        inward: bool,
    ) {
        let segments = segments.max(3);
        let base = self.next_index();
        let slope = (r0 - r1) / (y1 - y0).max(DEGENERATE_EPS);
        let sign = if inward { -1.0 } else { 1.0 };

        for i in 0..=segments {
            let t = i as f32 / segments as f32;
            let (sn, cs) = (t * TAU).sin_cos();
            let n = normalize_or(Vector3::new(cs, slope, sn), Vector3::new(cs, 0.0, sn)) * sign;
            self.push(Point3::new(cs * r0, y0, sn * r0), n, Vector2::new(t, 0.0));
            self.push(Point3::new(cs * r1, y1, sn * r1), n, Vector2::new(t, 1.0));
        }
        self.stitch_strip(base, segments, inward);
    }

    /// Horizontal fan-triangulated disk. `facing_down` flips the normal to
    /// -Y together with the winding.
    pub fn disk(&mut self, y: f32, radius: f32, segments: u32, facing_down: bool) {
        let segments = segments.max(3);
        let center = self.next_index();
        let normal = if facing_down { -Vector3::y() } else { Vector3::y() };
        self.push(Point3::new(0.0, y, 0.0), normal, Vector2::new(0.5, 0.5));

        for i in 0..=segments {
            let t = i as f32 / segments as f32;
            let (sn, cs) = (t * TAU).sin_cos();
            self.push(
                Point3::new(cs * radius, y, sn * radius),
                normal,
                Vector2::new(0.5 + cs * 0.5, 0.5 + sn * 0.5),
            );
        }

        for i in 0..segments {
            let a = center + 1 + i;
            let b = a + 1;
            // Angle grows from +X towards +Z, which is clockwise seen from above.
            if facing_down {
                self.triangle(center, a, b);
            } else {
                self.triangle(center, b, a);
            }
        }
    }

    /// Upward-facing band joining an outer circle to an inner, possibly
    /// lower, circle (a pot rim).
    pub fn rim(&mut self, outer: (f32, f32), inner: (f32, f32), segments: u32) {
        let segments = segments.max(3);
        let base = self.next_index();
        let ((outer_y, outer_r), (inner_y, inner_r)) = (outer, inner);

        for i in 0..=segments {
            let t = i as f32 / segments as f32;
            let (sn, cs) = (t * TAU).sin_cos();
            self.push(
                Point3::new(cs * outer_r, outer_y, sn * outer_r),
                Vector3::y(),
                Vector2::new(t, 0.0),
            );
            self.push(
                Point3::new(cs * inner_r, inner_y, sn * inner_r),
                Vector3::y(),
                Vector2::new(t, 1.0),
            );
        }
        self.stitch_strip(base, segments, false);
    }

    /// Double-sided strip swept along an arched, curled centreline.
    pub fn leaf_ribbon(&mut self, leaf: &LeafRibbon) {
        let segments = leaf.segments.max(1);
        let base = self.next_index();
        let up = Vector3::y();
        let dir = normalize_or(Vector3::new(leaf.direction.x, 0.0, leaf.direction.z), Vector3::x());
        let side0 = normalize_or(up.cross(&dir), Vector3::z());

        let centers: Vec<Point3<f32>> = (0..=segments)
            .map(|i| {
                let t = i as f32 / segments as f32;
                let arch = (t * PI).sin();
                let mut p = leaf.base + dir * (t * leaf.length);
                p.y += t * leaf.height + arch * 0.25 * leaf.height;
                p + side0 * (arch * leaf.curl)
            })
            .collect();

        let last = centers.len() - 1;
        for (i, center) in centers.iter().enumerate() {
            let t = i as f32 / segments as f32;
            let prev = centers[i.saturating_sub(1)];
            let next = centers[(i + 1).min(last)];
            let tangent = normalize_or(next - prev, dir);

            let side = up.cross(&tangent);
            let side = if side.norm() < DEGENERATE_EPS {
                normalize_or(Vector3::z().cross(&tangent), side0)
            } else {
                side.normalize()
            };
            let twisted = rotate_about_axis(&side, &tangent, leaf.twist * t);
            let normal = normalize_or(tangent.cross(&twisted), up);

            let half = twisted * (0.5 * leaf.width);
            self.push(center - half, normal, Vector2::new(0.0, t));
            self.push(center + half, normal, Vector2::new(1.0, t));
        }

        for i in 0..segments {
            let i0 = base + i * 2;
            let (i1, i2, i3) = (i0 + 1, i0 + 3, i0 + 2);
            self.quad(i0, i1, i2, i3);
            self.quad(i0, i3, i2, i1);
        }
    }

    /// Axis-aligned box. UVs are in world units so tiled maps keep their scale.
    pub fn cuboid(&mut self, center: Point3<f32>, half_extents: Vector3<f32>) {
        // (normal, u axis, v axis) with u x v = normal.
        let faces = [
            (Vector3::x(), -Vector3::z(), Vector3::y()),
            (-Vector3::x(), Vector3::z(), Vector3::y()),
            (Vector3::y(), Vector3::x(), -Vector3::z()),
            (-Vector3::y(), Vector3::x(), Vector3::z()),
            (Vector3::z(), Vector3::x(), Vector3::y()),
            (-Vector3::z(), -Vector3::x(), Vector3::y()),
        ];
        let extent = |axis: &Vector3<f32>| axis.abs().dot(&half_extents);

        for (n, u, v) in faces {
            let base = self.next_index();
            let (hn, hu, hv) = (extent(&n), extent(&u), extent(&v));
            let face_center = center + n * hn;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = face_center + u * (su * hu) + v * (sv * hv);
                let uv = Vector2::new((su + 1.0) * hu, (sv + 1.0) * hv);
                self.push(p, n, uv);
            }
            self.quad(base, base + 1, base + 2, base + 3);
        }
    }

    /// Derives tangents and freezes the buffers.
    pub fn build(mut self) -> Mesh {
        compute_tangents(&mut self.vertices, &self.indices);
        Mesh::new(self.vertices, self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Every triangle's winding must agree with its vertices' normals.
    fn assert_winding_matches_normals(mesh: &Mesh) {
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
            let face = (b.position - a.position).cross(&(c.position - a.position));
            if face.norm() < 1e-8 {
                continue;
            }
            let avg = a.normal + b.normal + c.normal;
            assert!(face.dot(&avg) > 0.0, "triangle {:?} faces away from its normals", tri);
        }
    }

    #[test]
    fn outer_wall_normals_point_away_from_axis() {
        let mut b = MeshBuilder::new();
        b.frustum_wall(0.0, 0.4, 0.15, 0.2, 16, false);
        let mesh = b.build();
        assert_eq!(mesh.vertices.len(), 34);
        assert_eq!(mesh.triangle_count(), 32);
        for v in &mesh.vertices {
            let radial = Vector3::new(v.position.x, 0.0, v.position.z);
            assert!(v.normal.dot(&radial) > 0.0);
            // Wider at the top, so the wall leans outward and its normal dips.
            assert!(v.normal.y < 0.0);
        }
        assert_winding_matches_normals(&mesh);
    }

    #[test]
    fn inward_wall_and_disks_wind_with_their_normals() {
        let mut b = MeshBuilder::new();
        b.frustum_wall(0.0, 0.4, 0.12, 0.18, 12, true);
        b.disk(0.0, 0.2, 12, true);
        b.disk(0.3, 0.15, 12, false);
        b.rim((0.4, 0.2), (0.38, 0.17), 12);
        let mesh = b.build();
        assert_winding_matches_normals(&mesh);
        assert_relative_eq!(mesh.vertices.last().unwrap().normal, Vector3::y());
    }

    #[test]
    fn leaf_ribbon_is_double_sided_and_finite() {
        let mut b = MeshBuilder::new();
        b.leaf_ribbon(&LeafRibbon {
            base: Point3::new(0.0, 0.3, 0.0),
            direction: Vector3::new(1.0, 0.0, 1.0),
            length: 0.5,
            width: 0.04,
            height: 0.3,
            curl: 0.06,
            twist: 0.3,
            segments: 10,
        });
        let mesh = b.build();
        assert_eq!(mesh.vertices.len(), 22);
        assert_eq!(mesh.triangle_count(), 40);
        for v in &mesh.vertices {
            assert_relative_eq!(v.normal.norm(), 1.0, epsilon = 1e-4);
            assert!(v.tangent.dot(&v.normal).abs() < 1e-4);
        }
    }

    #[test]
    fn degenerate_leaf_falls_back_instead_of_nan() {
        let mut b = MeshBuilder::new();
        b.leaf_ribbon(&LeafRibbon {
            base: Point3::origin(),
            direction: Vector3::zeros(),
            length: 0.0,
            width: 0.05,
            height: 0.0,
            curl: 0.0,
            twist: 1.0,
            segments: 4,
        });
        let mesh = b.build();
        for v in &mesh.vertices {
            assert!(v.position.iter().all(|c| c.is_finite()));
            assert!(v.normal.iter().all(|c| c.is_finite()));
            assert_relative_eq!(v.normal.norm(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn cuboid_faces_point_outward() {
        let mut b = MeshBuilder::new();
        b.cuboid(Point3::new(1.0, 0.5, -2.0), Vector3::new(2.0, 0.5, 1.0));
        let mesh = b.build();
        assert_eq!(mesh.triangle_count(), 12);
        assert_winding_matches_normals(&mesh);
        let bounds = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.min, Point3::new(-1.0, 0.0, -3.0));
        assert_relative_eq!(bounds.max, Point3::new(3.0, 1.0, -1.0));
    }
}
