pub mod input;
pub mod viewer;
