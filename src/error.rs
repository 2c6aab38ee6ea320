use std::path::PathBuf;
use thiserror::Error;

/// Every failure the renderer can report.
///
/// Asset problems are surfaced here, but the scene layer turns most of them
/// into logged diagnostics plus an empty or fallback value so a bad file never
/// stops the frame loop.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The face parser produced attribute index lists of different lengths.
    #[error("index lists disagree: {positions} positions, {uvs} uvs, {normals} normals")]
    IndexMismatch {
        positions: usize,
        uvs: usize,
        normals: usize,
    },

    #[error("cannot decode texture '{path}': {source}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot write image '{path}': {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("shadow pass: {0}")]
    ShadowPassState(&'static str),
}

pub type Result<T> = std::result::Result<T, RenderError>;
