use crate::core::geometry::{DEGENERATE_EPS, Vertex};
use crate::core::pipeline::{Interpolatable, Shader};
use crate::pipeline::renderer::TextureUnits;
use crate::pipeline::shadow_map::DepthTexture;
use crate::scene::light::Light;
use crate::scene::texture::Texture;
use nalgebra::{Matrix3, Matrix4, Point3, Vector2, Vector3, Vector4};
use std::f32::consts::PI;
use std::ops::{Add, Mul};
use std::sync::Arc;

/// Data passed from the vertex stage to the fragment stage.
#[derive(Clone, Copy, Debug)]
pub struct PbrVarying {
    pub world_pos: Point3<f32>,
    pub normal: Vector3<f32>,
    pub uv: Vector2<f32>,
    pub tangent: Vector3<f32>,
}

impl Add for PbrVarying {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            world_pos: Point3::from(self.world_pos.coords + other.world_pos.coords),
            normal: self.normal + other.normal,
            uv: self.uv + other.uv,
            tangent: self.tangent + other.tangent,
        }
    }
}

impl Mul<f32> for PbrVarying {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            world_pos: Point3::from(self.world_pos.coords * scalar),
            normal: self.normal * scalar,
            uv: self.uv * scalar,
            tangent: self.tangent * scalar,
        }
    }
}

impl Interpolatable for PbrVarying {}

/// Output of a finished depth pass, consumed by the colour pass.
#[derive(Debug, Clone)]
pub struct ShadowInput {
    pub depth: Arc<DepthTexture>,
    pub light_space: Matrix4<f32>,
    pub bias: f32,
    pub pcf_radius: i32,
    /// Index into `PbrShader::lights` of the light that cast the map.
    pub light_index: usize,
}

/// Cook-Torrance metallic/roughness shading over the five bound texture units.
pub struct PbrShader {
    pub model_matrix: Matrix4<f32>,
    pub view_matrix: Matrix4<f32>,
    pub projection_matrix: Matrix4<f32>,
    pub normal_matrix: Matrix3<f32>,

    pub camera_pos: Point3<f32>,
    pub lights: Vec<Light>,
    pub ambient_light: Vector3<f32>,
    pub shadow: Option<ShadowInput>,
}

impl PbrShader {
    pub fn new(
        model: Matrix4<f32>,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        camera_pos: Point3<f32>,
    ) -> Self {
        Self {
            model_matrix: model,
            view_matrix: view,
            projection_matrix: projection,
            normal_matrix: normal_matrix(&model),
            camera_pos,
            lights: Vec::new(),
            ambient_light: Vector3::repeat(0.03),
            shadow: None,
        }
    }

    /// Swaps the per-object transform, keeping lights and shadow state.
    pub fn set_model(&mut self, model: Matrix4<f32>) {
        self.model_matrix = model;
        self.normal_matrix = normal_matrix(&model);
    }

    /// Fraction of light that reaches `world_pos` (1 = fully lit).
    fn shadow_factor(&self, world_pos: &Point3<f32>, n_dot_l: f32) -> f32 {
        let Some(shadow) = &self.shadow else {
            return 1.0;
        };

        let clip = shadow.light_space * world_pos.to_homogeneous();
        if clip.w.abs() < 1e-6 {
            return 1.0;
        }
        let ndc = clip.xyz() / clip.w;
        let u = ndc.x * 0.5 + 0.5;
        let v = ndc.y * 0.5 + 0.5;
        let current_depth = ndc.z * 0.5 + 0.5;

        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) || current_depth > 1.0 {
            return 1.0;
        }

        // Slope-scaled so grazing surfaces do not self-shadow.
        let bias = shadow.bias.max(0.05 * (1.0 - n_dot_l));
        let (cx, cy) = shadow.depth.texel_coords(u, v);
        let radius = shadow.pcf_radius.max(0) as i64;

        let mut lit = 0.0;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if current_depth - bias <= shadow.depth.texel(cx + dx, cy + dy) {
                    lit += 1.0;
                }
            }
        }
        lit / ((2 * radius + 1).pow(2) as f32)
    }

    // GGX / Trowbridge-Reitz
    fn distribution_ggx(n_dot_h: f32, roughness: f32) -> f32 {
        let a = roughness * roughness;
        let a2 = a * a;
        let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
        a2 / (PI * denom * denom).max(1e-12)
    }

    fn geometry_schlick_ggx(n_dot_v: f32, roughness: f32) -> f32 {
        let r = roughness + 1.0;
        let k = (r * r) / 8.0;
        n_dot_v / (n_dot_v * (1.0 - k) + k).max(0.0001)
    }

    fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
        Self::geometry_schlick_ggx(n_dot_v, roughness)
            * Self::geometry_schlick_ggx(n_dot_l, roughness)
    }

    fn fresnel_schlick(cos_theta: f32, f0: Vector3<f32>) -> Vector3<f32> {
        let val = (1.0 - cos_theta).clamp(0.0, 1.0).powi(5);
        f0 + (Vector3::repeat(1.0) - f0) * val
    }

    /// Perturbs the geometric normal with the tangent-space normal map.
    fn mapped_normal(varying: &PbrVarying, units: &TextureUnits) -> Vector3<f32> {
        let geom_normal = varying
            .normal
            .try_normalize(DEGENERATE_EPS)
            .unwrap_or_else(Vector3::y);
        let Some(normal_map) = &units.normal else {
            return geom_normal;
        };

        // Gram-Schmidt, interpolation denormalizes the basis.
        let t = varying.tangent - geom_normal * geom_normal.dot(&varying.tangent);
        let Some(t) = t.try_normalize(DEGENERATE_EPS) else {
            return geom_normal;
        };
        let b = geom_normal.cross(&t);
        let tbn = Matrix3::from_columns(&[t, b, geom_normal]);

        let packed = normal_map.sample(varying.uv.x, varying.uv.y);
        let local = Vector3::new(packed.x * 2.0 - 1.0, packed.y * 2.0 - 1.0, packed.z * 2.0 - 1.0);
        (tbn * local)
            .try_normalize(DEGENERATE_EPS)
            .unwrap_or(geom_normal)
    }
}

fn normal_matrix(model: &Matrix4<f32>) -> Matrix3<f32> {
    let model_3x3 = model.fixed_view::<3, 3>(0, 0).into_owned();
    model_3x3.try_inverse().unwrap_or(model_3x3).transpose()
}

/// Reads one channel from a unit, or `fallback` when nothing is bound.
#[inline]
fn sample_unit(
    unit: &Option<Arc<Texture>>,
    uv: &Vector2<f32>,
    fallback: Vector4<f32>,
) -> Vector4<f32> {
    unit.as_ref()
        .map_or(fallback, |tex| tex.sample(uv.x, uv.y))
}

impl Shader for PbrShader {
    type Varying = PbrVarying;

    fn vertex(&self, vertex: &Vertex) -> (Vector4<f32>, Self::Varying) {
        let world = self.model_matrix * vertex.position.to_homogeneous();
        let world_pos = Point3::from_homogeneous(world).unwrap_or(vertex.position);
        let clip_pos = self.projection_matrix * self.view_matrix * world;

        (
            clip_pos,
            PbrVarying {
                world_pos,
                normal: self.normal_matrix * vertex.normal,
                uv: vertex.texcoord,
                // Tangents lie in the surface and follow the model matrix itself.
                tangent: self.model_matrix.fixed_view::<3, 3>(0, 0) * vertex.tangent,
            },
        )
    }

    fn fragment(&self, varying: Self::Varying, units: &TextureUnits) -> Vector3<f32> {
        let uv = varying.uv;
        let albedo = sample_unit(&units.albedo, &uv, Vector4::repeat(1.0)).xyz();
        let metallic = sample_unit(&units.metallic, &uv, Vector4::zeros()).x.clamp(0.0, 1.0);
        let raw_roughness = sample_unit(&units.roughness, &uv, Vector4::repeat(0.6)).x;
        let roughness = if units.use_gloss_map {
            1.0 - raw_roughness
        } else {
            raw_roughness
        }
        .clamp(0.04, 1.0);
        let ao = sample_unit(&units.ao, &uv, Vector4::repeat(1.0)).x;

        let n = Self::mapped_normal(&varying, units);
        let v = (self.camera_pos - varying.world_pos)
            .try_normalize(DEGENERATE_EPS)
            .unwrap_or(n);
        let n_dot_v = n.dot(&v).max(0.0);

        // 0.04 for dielectrics, albedo for metals.
        let f0 = Vector3::repeat(0.04).lerp(&albedo, metallic);

        let mut lo = Vector3::zeros();
        for (i, light) in self.lights.iter().enumerate() {
            let l = light.direction_to_light(&varying.world_pos);
            let n_dot_l = n.dot(&l).max(0.0);
            if n_dot_l <= 0.0 {
                continue;
            }
            let h = (v + l).try_normalize(DEGENERATE_EPS).unwrap_or(n);
            let n_dot_h = n.dot(&h).max(0.0);
            let h_dot_v = h.dot(&v).max(0.0);

            let shadow = match &self.shadow {
                Some(s) if s.light_index == i => self.shadow_factor(&varying.world_pos, n_dot_l),
                _ => 1.0,
            };
            if shadow <= 0.0 {
                continue;
            }

            let d = Self::distribution_ggx(n_dot_h, roughness);
            let g = Self::geometry_smith(n_dot_v, n_dot_l, roughness);
            let f = Self::fresnel_schlick(h_dot_v, f0);

            let specular = f * (d * g) / (4.0 * n_dot_v * n_dot_l + 0.0001);
            // Metals have no diffuse lobe.
            let k_d = (Vector3::repeat(1.0) - f) * (1.0 - metallic);
            let diffuse = k_d.component_mul(&albedo) / PI;

            let radiance = light.radiance(&varying.world_pos);
            lo += (diffuse + specular).component_mul(&radiance) * n_dot_l * shadow;
        }

        self.ambient_light.component_mul(&albedo) * ao + lo
    }
}
