use nalgebra::{Point2, Vector2, Vector3};

const EPSILON: f32 = 1e-5;

/// Screen-space triangle with its edge vectors precomputed, so the per-pixel
/// barycentric evaluation is two cross products.
#[derive(Debug, Clone, Copy)]
pub struct TriangleSetup {
    origin: Point2<f32>,
    e1: Vector2<f32>,
    e2: Vector2<f32>,
    inv_area_x2: f32,
    /// Twice the signed area. Negative for counter-clockwise-in-NDC triangles
    /// because screen Y points down.
    pub signed_area_x2: f32,
}

impl TriangleSetup {
    /// Returns `None` for triangles with (near) zero area.
    pub fn new(v0: Point2<f32>, v1: Point2<f32>, v2: Point2<f32>) -> Option<Self> {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let area_x2 = e1.x * e2.y - e1.y * e2.x;
        if area_x2.abs() < EPSILON {
            return None;
        }
        Some(Self {
            origin: v0,
            e1,
            e2,
            inv_area_x2: 1.0 / area_x2,
            signed_area_x2: area_x2,
        })
    }

    /// Barycentric weights (w0, w1, w2) of `p`.
    #[inline(always)]
    pub fn barycentric(&self, p: Point2<f32>) -> Vector3<f32> {
        let d = p - self.origin;
        let w1 = (d.x * self.e2.y - d.y * self.e2.x) * self.inv_area_x2;
        let w2 = (self.e1.x * d.y - self.e1.y * d.x) * self.inv_area_x2;
        Vector3::new(1.0 - w1 - w2, w1, w2)
    }
}

#[inline(always)]
pub fn is_inside_triangle(bary: Vector3<f32>) -> bool {
    bary.x >= -EPSILON && bary.y >= -EPSILON && bary.z >= -EPSILON
}

/// Re-weights screen-space barycentrics by each vertex's 1/w so attributes
/// interpolate linearly in view space. `None` if the weights cancel out.
pub fn perspective_correct_barycentric(bary: Vector3<f32>, w: [f32; 3]) -> Option<Vector3<f32>> {
    let inv = w.map(|w| if w.abs() > EPSILON { 1.0 / w } else { 1.0 });
    let weighted = Vector3::new(bary.x * inv[0], bary.y * inv[1], bary.z * inv[2]);
    let sum = weighted.x + weighted.y + weighted.z;
    if sum.abs() < EPSILON {
        return None;
    }
    Some(weighted / sum)
}
