//! Wavefront MTL subset: `newmtl`, `Ka`, `Kd`, `Ks`, `Ns`.

use crate::error::{RenderError, Result};
use crate::scene::material::{DEFAULT_MATERIAL, MaterialLibrary, MtlMaterial, default_library};
use log::{info, warn};
use nalgebra::Vector3;
use std::path::Path;

/// Parses MTL text. Directives that appear before the first `newmtl` edit
/// the `"default"` record. Malformed values keep the previous value.
pub fn parse_mtl(contents: &str) -> MaterialLibrary {
    let mut materials = default_library();
    let mut current = DEFAULT_MATERIAL.to_string();

    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(command) = tokens.next() else {
            continue;
        };

        match command {
            "newmtl" => match tokens.next() {
                Some(name) => {
                    current = name.to_string();
                    materials.insert(current.clone(), MtlMaterial::default());
                }
                None => warn!("MTL line {}: newmtl without a name", line_num + 1),
            },
            "Ka" | "Kd" | "Ks" => {
                let Some(color) = parse_vec3(&mut tokens) else {
                    warn!("MTL line {}: malformed {} '{}'", line_num + 1, command, line);
                    continue;
                };
                let mat = materials.entry(current.clone()).or_default();
                match command {
                    "Ka" => mat.ambient = color,
                    "Kd" => mat.diffuse = color,
                    _ => mat.specular = color,
                }
            }
            "Ns" => match tokens.next().and_then(|t| t.parse::<f32>().ok()) {
                Some(ns) => materials.entry(current.clone()).or_default().shininess = ns,
                None => warn!("MTL line {}: malformed Ns '{}'", line_num + 1, line),
            },
            _ => {}
        }
    }

    materials
}

pub fn load_mtl<P: AsRef<Path>>(path: P) -> Result<MaterialLibrary> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let materials = parse_mtl(&contents);
    info!("Loaded MTL {:?}: {} material(s)", path, materials.len());
    Ok(materials)
}

fn parse_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Option<Vector3<f32>> {
    let mut next = || tokens.next()?.parse::<f32>().ok();
    Some(Vector3::new(next()?, next()?, next()?))
}
