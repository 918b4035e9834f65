//! Parameter definitions with physical units and documented semantics.
//!
//! All tuning constants that shape the analysis and the picture live here
//! with their units and valid ranges.

mod analysis;
mod palette;
mod render;

// Re-export all types
pub use analysis::{AnalysisConfig, FrequencyBand, BANDS, BAND_COUNT, SENSITIVITY_RANGE};
pub use palette::Palette;
pub use render::{RenderConfig, Strategy, FPS_RANGE};
