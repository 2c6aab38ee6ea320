pub mod camera;
pub mod context;
pub mod drawable;
pub mod light;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod model;
pub mod plant;
pub mod procedural;
pub mod scene_object;
pub mod solar;
pub mod texture;
