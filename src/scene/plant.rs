use crate::scene::drawable::Drawable;
use crate::scene::material::PbrTextureMaterial;
use crate::scene::mesh::Mesh;
use crate::scene::procedural::{LeafRibbon, MeshBuilder};
use log::debug;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

const SEGMENTS: u32 = 48;
const WALL_THICKNESS: f32 = 0.025;
const INNER_WALL_HEIGHT: f32 = 0.96;
const SOIL_HEIGHT: f32 = 0.90;
const SOIL_RADIUS: f32 = 0.92;
const LEAF_SEGMENTS: u32 = 10;

/// Which of the three plant parts a mesh or material belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantPart {
    Pot,
    Soil,
    Leaves,
}

impl PlantPart {
    pub const ALL: [PlantPart; 3] = [PlantPart::Pot, PlantPart::Soil, PlantPart::Leaves];

    fn index(self) -> usize {
        self as usize
    }
}

/// Pot, soil and leaves, each with its own solid-colour material.
/// Built entirely from the seed; no asset files are involved.
#[derive(Debug, Clone)]
pub struct PottedPlant {
    pub seed: u64,
    /// Indexed by [`PlantPart`].
    parts: [Mesh; 3],
    materials: [PbrTextureMaterial; 3],
}

impl PottedPlant {
    pub fn mesh(&self, part: PlantPart) -> &Mesh {
        &self.parts[part.index()]
    }

    pub fn material(&self, part: PlantPart) -> &PbrTextureMaterial {
        &self.materials[part.index()]
    }

    /// Each part with the material it must be drawn with.
    pub fn parts(&self) -> impl Iterator<Item = (&Mesh, &PbrTextureMaterial)> {
        self.parts.iter().zip(&self.materials)
    }
}

impl Drawable for PottedPlant {
    fn meshes(&self) -> &[Mesh] {
        &self.parts
    }
}

/// Builds a plant from `seed`. The random stream is consumed in a fixed
/// order, so equal seeds give identical geometry and colours.
pub fn create_potted_plant(seed: u64) -> PottedPlant {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut uniform = move || rng.random::<f32>();

    let pot_height = 0.35 + uniform() * 0.08;
    let top_r = 0.20 + uniform() * 0.04;
    let bottom_r = 0.14 + uniform() * 0.03;
    let inner_top_r = (top_r - WALL_THICKNESS).max(0.02);
    let inner_bottom_r = (bottom_r - WALL_THICKNESS).max(0.02);
    let inner_height = pot_height * INNER_WALL_HEIGHT;

    let mut pot = MeshBuilder::new();
    pot.frustum_wall(0.0, pot_height, bottom_r, top_r, SEGMENTS, false);
    pot.frustum_wall(0.0, inner_height, inner_bottom_r, inner_top_r, SEGMENTS, true);
    pot.disk(0.0, bottom_r, SEGMENTS, true);
    pot.rim((pot_height, top_r), (inner_height, inner_top_r), SEGMENTS);

    let soil_y = pot_height * SOIL_HEIGHT;
    let soil_r = inner_top_r * SOIL_RADIUS;
    let mut soil = MeshBuilder::new();
    soil.disk(soil_y, soil_r, SEGMENTS, false);

    let leaf_count = 18 + (uniform() * 12.0) as u32;
    let mut leaves = MeshBuilder::new();
    for i in 0..leaf_count {
        let angle = i as f32 / leaf_count as f32 * TAU + uniform() * 0.25;
        let direction = Vector3::new(angle.cos(), 0.0, angle.sin());

        let length = 0.35 + uniform() * 0.25;
        let width = 0.03 + uniform() * 0.02;
        let height = 0.25 + uniform() * 0.30;
        let curl = 0.04 + uniform() * 0.05;
        let twist = -0.4 + uniform() * 0.8;
        let base = Point3::new(0.0, soil_y + 0.01, 0.0) + direction * (uniform() * soil_r * 0.35);

        leaves.leaf_ribbon(&LeafRibbon {
            base,
            direction,
            length,
            width,
            height,
            curl,
            twist,
            segments: LEAF_SEGMENTS,
        });
    }

    let pot_color = Vector3::new(0.75, 0.42, 0.28) * (0.90 + uniform() * 0.15);
    let soil_color = Vector3::new(0.12, 0.08, 0.05) * (0.85 + uniform() * 0.20);
    let leaf_color = Vector3::new(0.10, 0.55, 0.20) * (0.85 + uniform() * 0.25);

    debug!(
        "Plant {}: pot {:.3}x{:.3}, {} leaves",
        seed, pot_height, top_r, leaf_count
    );

    let rgb = |c: Vector3<f32>| [c.x, c.y, c.z];
    PottedPlant {
        seed,
        parts: [pot.build(), soil.build(), leaves.build()],
        materials: [
            PbrTextureMaterial::solid(rgb(pot_color), 0.0, 0.78, 1.0),
            PbrTextureMaterial::solid(rgb(soil_color), 0.0, 1.0, 1.0),
            PbrTextureMaterial::solid(rgb(leaf_color), 0.0, 0.55, 1.0),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn same_seed_same_plant() {
        let a = create_potted_plant(42);
        let b = create_potted_plant(42);
        for part in PlantPart::ALL {
            let (ma, mb) = (a.mesh(part), b.mesh(part));
            assert_eq!(ma.vertices, mb.vertices);
            assert_eq!(ma.indices, mb.indices);
            assert_relative_eq!(
                a.material(part).albedo.sample(0.5, 0.5),
                b.material(part).albedo.sample(0.5, 0.5)
            );
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = create_potted_plant(1000);
        let b = create_potted_plant(1001);
        assert_ne!(a.mesh(PlantPart::Pot).vertices, b.mesh(PlantPart::Pot).vertices);
    }

    #[test]
    fn parts_stay_within_designed_ranges() {
        let plant = create_potted_plant(7);
        let pot = plant.mesh(PlantPart::Pot).bounds().unwrap();
        assert_relative_eq!(pot.min.y, 0.0);
        assert!(pot.max.y >= 0.35 && pot.max.y <= 0.43);
        assert!(pot.max.x <= 0.24 + 1e-5);

        let soil = plant.mesh(PlantPart::Soil).bounds().unwrap();
        assert!(soil.min.y > 0.3 && soil.max.y < pot.max.y);

        // 22 vertices and 40 triangles per leaf.
        let leaves = plant.mesh(PlantPart::Leaves);
        let leaf_count = leaves.vertices.len() / 22;
        assert!((18..30).contains(&leaf_count));
        assert_eq!(leaves.triangle_count(), leaf_count * 40);
    }

    #[test]
    fn every_vertex_has_an_orthonormal_frame() {
        let plant = create_potted_plant(3);
        for mesh in plant.meshes() {
            for v in &mesh.vertices {
                assert_relative_eq!(v.normal.norm(), 1.0, epsilon = 1e-4);
                assert_relative_eq!(v.tangent.norm(), 1.0, epsilon = 1e-4);
                assert!(v.normal.dot(&v.tangent).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn materials_are_solid_and_distinct() {
        let plant = create_potted_plant(11);
        let pot = plant.material(PlantPart::Pot);
        let leaves = plant.material(PlantPart::Leaves);
        assert_eq!(pot.albedo.width, 1);
        assert_relative_eq!(pot.roughness.sample(0.0, 0.0).x, 199.0 / 255.0, epsilon = 1e-6);
        let (p, l) = (pot.albedo.sample(0.0, 0.0), leaves.albedo.sample(0.0, 0.0));
        assert!(p.x > p.y && l.y > l.x);
    }
}
