//! GPU rendering: pipeline setup, per-frame uniform upload, and the WGSL
//! programs for the baked, flat-emissive, portal, and fireflies materials.

mod gpu;
mod shaders;

pub use gpu::{EguiDraw, Renderer};
