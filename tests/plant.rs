use nalgebra::{Point3, Vector3};
use reading_room::pipeline::renderer::Renderer;
use reading_room::scene::camera::Camera;
use reading_room::scene::context::Scene;
use reading_room::scene::drawable::Drawable;
use reading_room::scene::plant::{PlantPart, create_potted_plant};
use reading_room::scene::scene_object::SceneObject;
use reading_room::scene::solar::SolarModel;

#[test]
fn plants_are_reproducible_across_calls() {
    let seeds = [1000u64, 1001, 1002];
    let first: Vec<_> = seeds.iter().map(|&s| create_potted_plant(s)).collect();
    let second: Vec<_> = seeds.iter().map(|&s| create_potted_plant(s)).collect();

    for (a, b) in first.iter().zip(&second) {
        for part in PlantPart::ALL {
            assert_eq!(a.mesh(part).vertices, b.mesh(part).vertices);
            assert_eq!(a.mesh(part).indices, b.mesh(part).indices);
        }
    }
    assert_ne!(
        first[0].mesh(PlantPart::Leaves).vertices.len(),
        0,
        "leaves are always generated"
    );
}

#[test]
fn every_part_indexes_its_own_vertices() {
    let plant = create_potted_plant(77);
    for mesh in plant.meshes() {
        assert!(!mesh.is_empty());
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }
}

#[test]
fn plant_seen_from_above_shows_its_leaves() {
    let mut scene = Scene::new(SolarModel::default());
    let plant = scene.add_plant(create_potted_plant(9));
    scene.place(SceneObject::placed(
        "plant",
        plant,
        [0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0],
        [1.0, 1.0, 1.0],
        "default",
    ));
    scene.update_lighting(12.0);

    let expected: usize = PlantPart::ALL
        .iter()
        .map(|&part| scene.plants[0].mesh(part).triangle_count())
        .sum();
    assert_eq!(scene.triangle_count(), expected);

    let camera = Camera::new_perspective(
        Point3::new(0.0, 2.5, 0.0),
        Point3::origin(),
        -Vector3::z(),
        1.0,
        1.0,
        0.1,
        20.0,
    );
    let mut renderer = Renderer::new(64, 64, 1);
    scene.render_color_pass(&mut renderer, &camera, None);

    let fb = &renderer.framebuffer;
    let mut green = 0;
    for y in 0..fb.height {
        for x in 0..fb.width {
            let c = fb.get_pixel(x, y).unwrap();
            if c.y > c.x * 1.5 && c.y > c.z {
                green += 1;
            }
        }
    }
    assert!(green > 0);
    assert_eq!(renderer.units.bound_count(), 0);
}
