//! Plasmaterm library - audio-reactive terminal visualization
//!
//! Live audio is split into nine frequency bands plus a chaos scalar, and
//! a render engine turns those into glowing noise-warped strands or beams
//! painted with 24-bit terminal colour.

pub mod audio;
pub mod cache;
pub mod error;
pub mod metadata;
pub mod noise;
pub mod params;
pub mod render;

pub use error::{Error, Result};
