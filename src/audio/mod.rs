//! Audio capture and spectral analysis.
//!
//! Capture pushes fixed-size interleaved stereo blocks into a bounded
//! channel; the analysis loop turns each block into nine band energies
//! and a chaos scalar for the renderer.

mod analyzer;
mod capture;
mod fft;
mod pipeline;

// Re-export public types
pub use analyzer::{chaos_level, AnalysisFrame, BandEnergies, SpectralAnalyzer, SILENCE_EPSILON};
pub use capture::{list_input_devices, pick_device, BlockAccumulator, CaptureStream};
pub use fft::hann_window;
pub use pipeline::{
    latest_channel, push_latest, AnalysisPipeline, LatestSender, DEFAULT_QUEUE_DEPTH,
};
