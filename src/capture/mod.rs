// src/capture/mod.rs
pub mod camera;
pub mod photo;

pub use photo::CapturedImage;
