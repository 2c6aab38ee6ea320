pub mod config;
pub mod image;
pub mod mtl_loader;
pub mod obj_loader;
