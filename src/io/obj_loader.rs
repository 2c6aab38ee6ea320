//! Wavefront OBJ subset: `v`, `vt`, `vn`, `f`, `mtllib`, `usemtl`.
//!
//! Every face corner becomes its own vertex; the index buffer is `0..n`.
//! Missing normals are reconstructed from the faces, missing UVs fall back
//! to the vertex XY, and tangents are always derived afterwards.

use crate::core::geometry::{Vertex, compute_normals, compute_tangents, repair_normals};
use crate::error::{RenderError, Result};
use crate::io::mtl_loader::load_mtl;
use crate::scene::material::{DEFAULT_MATERIAL, MaterialLibrary, default_library};
use crate::scene::mesh::Mesh;
use log::{error, info, warn};
use nalgebra::{Point3, Vector2, Vector3};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjLoadOptions {
    /// Fan-triangulate faces with more than three corners. When off, only
    /// the first three corners of a face are used.
    pub triangulate_polygons: bool,
}

/// What the parser saw and what it had to repair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjReport {
    pub faces_read: usize,
    pub faces_dropped: usize,
    pub corners_dropped: usize,
    pub uv_placeholders: usize,
    pub normal_placeholders: usize,
    pub malformed_lines: usize,
    pub polygons_clipped: usize,
    pub normals_repaired: usize,
    pub normals_from_file: bool,
    pub uvs_from_file: bool,
}

#[derive(Debug, Clone)]
pub struct ObjData {
    /// `None` when the file held no usable faces.
    pub mesh: Option<Mesh>,
    pub materials: MaterialLibrary,
    pub active_material: String,
    pub report: ObjReport,
}

/// Reference from a face corner to a UV or normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrSlot {
    /// The corner did not name this attribute.
    Absent,
    /// The corner named it but the index was unusable; reads element 0.
    Placeholder,
    Index(usize),
}

/// Attribute index lists, one entry per emitted corner.
#[derive(Debug, Default)]
struct CornerLists {
    positions: Vec<usize>,
    uvs: Vec<AttrSlot>,
    normals: Vec<AttrSlot>,
}

#[derive(Debug, Default)]
struct ObjParser {
    positions: Vec<Point3<f32>>,
    texcoords: Vec<Vector2<f32>>,
    normals: Vec<Vector3<f32>>,
    corners: CornerLists,
    materials: MaterialLibrary,
    active_material: String,
    report: ObjReport,
}

/// Reads `path` and parses it; `mtllib` references resolve against the
/// file's directory.
pub fn load_obj<P: AsRef<Path>>(path: P, options: &ObjLoadOptions) -> Result<ObjData> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Loading OBJ file: {:?}", path);

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let data = parse_obj(&source, base_dir, options)?;

    let r = &data.report;
    info!(
        "Loaded {:?}: {} triangle(s), normals {}, uvs {}",
        path,
        data.mesh.as_ref().map_or(0, Mesh::triangle_count),
        if r.normals_from_file { "from file" } else { "computed" },
        if r.uvs_from_file { "from file" } else { "planar" },
    );
    Ok(data)
}

/// Parses OBJ text. Per-element problems are logged and recorded in the
/// report; only an internal index-list mismatch is an error.
pub fn parse_obj(source: &str, base_dir: &Path, options: &ObjLoadOptions) -> Result<ObjData> {
    let mut parser = ObjParser {
        materials: default_library(),
        active_material: DEFAULT_MATERIAL.to_string(),
        ..ObjParser::default()
    };

    for (line_num, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let line_no = line_num + 1;

        match keyword {
            "v" => {
                let [x, y, z] = parser.floats::<3>(&mut tokens, line_no, keyword);
                parser.positions.push(Point3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parser.floats::<2>(&mut tokens, line_no, keyword);
                parser.texcoords.push(Vector2::new(u, v));
            }
            "vn" => {
                let [x, y, z] = parser.floats::<3>(&mut tokens, line_no, keyword);
                parser.normals.push(Vector3::new(x, y, z));
            }
            "f" => parser.face(tokens, line_no, options),
            "mtllib" => {
                for file in tokens {
                    let mtl_path = base_dir.join(file);
                    match load_mtl(&mtl_path) {
                        Ok(lib) => parser.materials.extend(lib),
                        Err(e) => warn!("Ignoring material library: {}", e),
                    }
                }
            }
            "usemtl" => {
                let name = line[keyword.len()..].trim();
                if name.is_empty() {
                    warn!("OBJ line {}: usemtl without a name", line_no);
                } else {
                    // Resolved lazily; undefined names read as the default colour.
                    parser.active_material = name.to_string();
                }
            }
            _ => {}
        }
    }

    parser.finish()
}

impl ObjParser {
    /// Parses up to `N` floats; missing or bad components become 0 so the
    /// element still occupies its slot in the index space.
    fn floats<'a, const N: usize>(
        &mut self,
        tokens: &mut impl Iterator<Item = &'a str>,
        line_no: usize,
        keyword: &str,
    ) -> [f32; N] {
        let mut out = [0.0; N];
        let mut ok = true;
        for slot in out.iter_mut() {
            match tokens.next().map(str::parse::<f32>) {
                Some(Ok(x)) => *slot = x,
                _ => ok = false,
            }
        }
        if !ok {
            warn!("OBJ line {}: malformed '{}' element", line_no, keyword);
            self.report.malformed_lines += 1;
        }
        out
    }

    fn face<'a>(
        &mut self,
        tokens: impl Iterator<Item = &'a str>,
        line_no: usize,
        options: &ObjLoadOptions,
    ) {
        self.report.faces_read += 1;
        let tokens: Vec<&str> = tokens.collect();

        if tokens.len() < 3 {
            warn!("OBJ line {}: face has fewer than 3 corners", line_no);
            self.report.faces_dropped += 1;
            return;
        }

        let considered = if options.triangulate_polygons {
            &tokens[..]
        } else {
            if tokens.len() > 3 {
                self.report.polygons_clipped += 1;
            }
            &tokens[..3]
        };

        let corners: Vec<(usize, AttrSlot, AttrSlot)> = considered
            .iter()
            .filter_map(|token| self.corner(token, line_no))
            .collect();

        if corners.len() < 3 {
            warn!(
                "OBJ line {}: only {} valid corner(s), face dropped",
                line_no,
                corners.len()
            );
            self.report.faces_dropped += 1;
            return;
        }

        for i in 1..corners.len() - 1 {
            for corner in [corners[0], corners[i], corners[i + 1]] {
                self.corners.positions.push(corner.0);
                self.corners.uvs.push(corner.1);
                self.corners.normals.push(corner.2);
            }
        }
    }

    /// One `v`, `v/vt`, `v//vn` or `v/vt/vn` reference. `None` drops the corner.
    fn corner(&mut self, token: &str, line_no: usize) -> Option<(usize, AttrSlot, AttrSlot)> {
        let mut parts = token.split('/');
        let position_part = parts.next().unwrap_or("");
        let uv_part = parts.next().unwrap_or("");
        let normal_part = parts.next().unwrap_or("");

        let Some(position) = resolve_index(position_part, self.positions.len()) else {
            warn!(
                "OBJ line {}: invalid vertex index '{}' ({} positions), corner dropped",
                line_no,
                position_part,
                self.positions.len()
            );
            self.report.corners_dropped += 1;
            return None;
        };

        let uv = match attr_slot(uv_part, self.texcoords.len()) {
            AttrSlot::Placeholder => {
                warn!("OBJ line {}: invalid texcoord index '{}'", line_no, uv_part);
                self.report.uv_placeholders += 1;
                AttrSlot::Placeholder
            }
            slot => slot,
        };
        let normal = match attr_slot(normal_part, self.normals.len()) {
            AttrSlot::Placeholder => {
                warn!("OBJ line {}: invalid normal index '{}'", line_no, normal_part);
                self.report.normal_placeholders += 1;
                AttrSlot::Placeholder
            }
            slot => slot,
        };

        Some((position, uv, normal))
    }

    fn finish(mut self) -> Result<ObjData> {
        let lists = &self.corners;
        let corners = lists.positions.len();
        if corners != lists.uvs.len() || corners != lists.normals.len() {
            error!(
                "OBJ index lists disagree ({} / {} / {}); no mesh built",
                lists.positions.len(),
                lists.uvs.len(),
                lists.normals.len()
            );
            return Err(RenderError::IndexMismatch {
                positions: lists.positions.len(),
                uvs: lists.uvs.len(),
                normals: lists.normals.len(),
            });
        }

        let has_index = |slots: &[AttrSlot]| slots.iter().any(|s| matches!(s, AttrSlot::Index(_)));
        self.report.uvs_from_file = has_index(&lists.uvs);
        self.report.normals_from_file = has_index(&lists.normals);

        let mesh = if lists.positions.is_empty() {
            info!("OBJ contained no usable faces");
            None
        } else {
            Some(self.build_mesh())
        };

        Ok(ObjData {
            mesh,
            materials: self.materials,
            active_material: self.active_material,
            report: self.report,
        })
    }

    fn build_mesh(&mut self) -> Mesh {
        let lists = &self.corners;
        let uvs_from_file = self.report.uvs_from_file;
        let normals_from_file = self.report.normals_from_file;

        let mut vertices: Vec<Vertex> = lists
            .positions
            .iter()
            .zip(&lists.uvs)
            .zip(&lists.normals)
            .map(|((&p, &uv), &n)| {
                let position = self.positions[p];
                let texcoord = match uv {
                    _ if !uvs_from_file => Vector2::new(position.x, position.y),
                    AttrSlot::Index(i) => self.texcoords[i],
                    _ => self
                        .texcoords
                        .first()
                        .copied()
                        .unwrap_or_else(|| Vector2::new(position.x, position.y)),
                };
                // A corner with no normal reference is rebuilt from its face later.
                let normal = match n {
                    AttrSlot::Index(i) if normals_from_file => self.normals[i],
                    AttrSlot::Placeholder if normals_from_file => self.normals[0],
                    _ => Vector3::zeros(),
                };
                Vertex::new(position, normal, texcoord)
            })
            .collect();
        let indices: Vec<u32> = (0..vertices.len() as u32).collect();

        if normals_from_file {
            self.report.normals_repaired = repair_normals(&mut vertices, &indices);
            if self.report.normals_repaired > 0 {
                info!(
                    "Reconstructed {} normal(s) missing from the file",
                    self.report.normals_repaired
                );
            }
        } else {
            compute_normals(&mut vertices, &indices);
        }
        compute_tangents(&mut vertices, &indices);

        Mesh::new(vertices, indices)
    }
}

/// 1-based or negative (relative to the current end) OBJ index.
fn resolve_index(token: &str, len: usize) -> Option<usize> {
    let raw: i64 = token.trim().parse().ok()?;
    let index = match raw {
        r if r > 0 => r - 1,
        r if r < 0 => len as i64 + r,
        _ => return None,
    };
    (0..len as i64).contains(&index).then_some(index as usize)
}

fn attr_slot(token: &str, len: usize) -> AttrSlot {
    if token.is_empty() {
        return AttrSlot::Absent;
    }
    match resolve_index(token, len) {
        Some(i) => AttrSlot::Index(i),
        None => AttrSlot::Placeholder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TRIANGLE: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
";

    fn parse(source: &str) -> ObjData {
        parse_obj(source, Path::new("."), &ObjLoadOptions::default()).unwrap()
    }

    #[test]
    fn full_corners_keep_file_attributes() {
        let data = parse(&format!("{TRIANGLE}f 1/1/1 2/2/2 3/3/3\n"));
        let mesh = data.mesh.unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertices[1].position, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mesh.vertices[2].texcoord, Vector2::new(0.0, 1.0));
        assert_eq!(mesh.vertices[0].normal, Vector3::new(0.0, 0.0, 1.0));
        assert!(data.report.normals_from_file && data.report.uvs_from_file);
        for v in &mesh.vertices {
            assert_relative_eq!(v.tangent, Vector3::x(), epsilon = 1e-5);
        }
    }

    #[test]
    fn out_of_range_position_drops_the_face() {
        let data = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 999\n");
        assert!(data.mesh.is_none());
        assert_eq!(data.report.corners_dropped, 1);
        assert_eq!(data.report.faces_dropped, 1);
    }

    #[test]
    fn bad_uv_and_normal_indices_become_placeholders() {
        let data = parse(&format!("{TRIANGLE}f 1/9/1 2/2/x 3/3/3\n"));
        assert_eq!(data.report.uv_placeholders, 1);
        assert_eq!(data.report.normal_placeholders, 1);
        let mesh = data.mesh.unwrap();
        assert_eq!(mesh.vertices[0].texcoord, Vector2::new(0.0, 0.0));
        assert_relative_eq!(mesh.vertices[1].normal, Vector3::z(), epsilon = 1e-5);
        assert_eq!(data.report.normals_repaired, 0);
    }

    #[test]
    fn placeholder_normal_reads_the_first_file_normal() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 1 0 0\nvn 0 1 0\nf 1//2 2//9 3//2\n";
        let data = parse(source);
        assert_eq!(data.report.normal_placeholders, 1);
        let mesh = data.mesh.unwrap();
        assert_relative_eq!(mesh.vertices[0].normal, Vector3::y(), epsilon = 1e-6);
        assert_relative_eq!(mesh.vertices[1].normal, Vector3::x(), epsilon = 1e-6);
        assert_relative_eq!(mesh.vertices[2].normal, Vector3::y(), epsilon = 1e-6);
    }

    #[test]
    fn quads_are_clipped_unless_triangulation_is_requested() {
        let quad = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let clipped = parse(quad);
        assert_eq!(clipped.mesh.unwrap().triangle_count(), 1);
        assert_eq!(clipped.report.polygons_clipped, 1);

        let options = ObjLoadOptions {
            triangulate_polygons: true,
        };
        let fanned = parse_obj(quad, Path::new("."), &options).unwrap();
        let mesh = fanned.mesh.unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertices[5].position, Point3::new(0.0, 1.0, 0.0));
        assert_eq!(fanned.report.polygons_clipped, 0);
    }

    #[test]
    fn missing_attributes_are_synthesized() {
        let data = parse("v 0 0 0\nv 2 0 0\nv 0 3 -1\nf 1 2 3\n");
        let mesh = data.mesh.unwrap();
        assert!(!data.report.normals_from_file && !data.report.uvs_from_file);
        assert_eq!(mesh.vertices[2].texcoord, Vector2::new(0.0, 3.0));
        for v in &mesh.vertices {
            assert_relative_eq!(v.normal.norm(), 1.0, epsilon = 1e-4);
            assert_relative_eq!(v.tangent.norm(), 1.0, epsilon = 1e-4);
            assert!(v.tangent.dot(&v.normal).abs() < 1e-4);
        }
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let data = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n");
        let mesh = data.mesh.unwrap();
        assert_eq!(mesh.vertices[0].position, Point3::origin());
        assert_eq!(mesh.vertices[2].position, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn usemtl_is_accepted_without_definition() {
        let data = parse("usemtl Walnut\nv 0 0 0\n");
        assert_eq!(data.active_material, "Walnut");
        assert!(data.mesh.is_none());
        assert!(data.materials.contains_key(DEFAULT_MATERIAL));
    }

    #[test]
    fn malformed_vertex_keeps_its_slot() {
        let data = parse("v 0 0 0\nv 1 zero 0\nv 0 1 0\nf 1 2 3\n");
        assert_eq!(data.report.malformed_lines, 1);
        let mesh = data.mesh.unwrap();
        assert_eq!(mesh.vertices[1].position, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mesh.vertices[2].position, Point3::new(0.0, 1.0, 0.0));
    }
}
