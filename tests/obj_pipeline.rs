use approx::assert_relative_eq;
use reading_room::io::obj_loader::{ObjLoadOptions, load_obj};
use reading_room::scene::model::Model;
use std::fs;
use std::path::{Path, PathBuf};

fn asset(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/models").join(name)
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("reading_room_{}_{}", tag, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

const TRIANGULATE: ObjLoadOptions = ObjLoadOptions {
    triangulate_polygons: true,
};

#[test]
fn bookcase_loads_closed_with_flat_normals() {
    let data = load_obj(asset("bookcase.obj"), &TRIANGULATE).unwrap();
    let mesh = data.mesh.expect("bookcase has faces");

    assert_eq!(mesh.triangle_count(), 12);
    assert_eq!(data.report.faces_read, 6);
    assert_eq!(data.report.polygons_clipped, 0);
    assert!(!data.report.normals_from_file);

    for vertex in &mesh.vertices {
        assert_relative_eq!(vertex.normal.norm(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(vertex.tangent.norm(), 1.0, epsilon = 1e-4);
        assert!(vertex.normal.dot(&vertex.tangent).abs() < 1e-4);
    }

    // Each face is flat, so all corners of a triangle share the face normal.
    for tri in mesh.indices.chunks_exact(3) {
        let n0 = mesh.vertices[tri[0] as usize].normal;
        for &i in &tri[1..] {
            assert_relative_eq!(mesh.vertices[i as usize].normal, n0, epsilon = 1e-4);
        }
    }

    let bounds = mesh.bounds().unwrap();
    assert_relative_eq!(bounds.min.y, 0.0);
    assert_relative_eq!(bounds.max.y, 2.0);
}

#[test]
fn quads_are_clipped_without_triangulation() {
    let data = load_obj(asset("bookcase.obj"), &ObjLoadOptions::default()).unwrap();
    let mesh = data.mesh.unwrap();
    assert_eq!(mesh.triangle_count(), 6);
    assert_eq!(data.report.polygons_clipped, 6);
}

#[test]
fn model_picks_up_the_mtl_colour() {
    let model = Model::load(asset("bookcase.obj"), &TRIANGULATE);
    assert!(!model.is_empty());
    assert!(model.has_mtl_material());
    assert_eq!(model.active_material, "walnut");
    assert_relative_eq!(model.material_color().x, 0.36, epsilon = 1e-6);
    assert_relative_eq!(model.material_color().z, 0.13, epsilon = 1e-6);
}

#[test]
fn file_normals_and_uvs_are_kept() {
    let dir = scratch_dir("obj_attrs");
    let path = dir.join("panel.obj");
    fs::write(
        &path,
        "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
         vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
         vn 0 0 2\n\
         f 1/1/1 2/2/1 3/3/1 4/4/1\n",
    )
    .unwrap();

    let data = load_obj(&path, &TRIANGULATE).unwrap();
    assert!(data.report.normals_from_file);
    assert!(data.report.uvs_from_file);

    let mesh = data.mesh.unwrap();
    assert_eq!(mesh.triangle_count(), 2);
    for vertex in &mesh.vertices {
        // File normals are normalised on load.
        assert_relative_eq!(vertex.normal.z, 1.0, epsilon = 1e-5);
        // U runs along +X in this panel.
        assert_relative_eq!(vertex.tangent.x, 1.0, epsilon = 1e-5);
    }
    assert_relative_eq!(mesh.vertices[2].texcoord.x, 1.0);
    assert_relative_eq!(mesh.vertices[2].texcoord.y, 1.0);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn bad_references_degrade_instead_of_failing() {
    let dir = scratch_dir("obj_bad");
    let path = dir.join("broken.obj");
    fs::write(
        &path,
        "mtllib missing.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 999\nf 1 2\nf 1 2 3\n",
    )
    .unwrap();

    let data = load_obj(&path, &ObjLoadOptions::default()).unwrap();
    assert_eq!(data.report.faces_read, 3);
    assert_eq!(data.report.faces_dropped, 2);
    assert_eq!(data.report.corners_dropped, 1);
    assert_eq!(data.mesh.unwrap().triangle_count(), 1);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_file_gives_an_empty_model() {
    let model = Model::load(asset("no_such_model.obj"), &TRIANGULATE);
    assert!(model.is_empty());
    assert!(!model.has_mtl_material());
    assert_relative_eq!(model.material_color().x, 0.8, epsilon = 1e-6);
}
