//! Stereo spectral analyzer: one sample block in, nine band energies and a
//! chaos level out.

use std::ops::Range;
use std::time::Instant;

use rustfft::{num_complex::Complex, FftPlanner};
use tracing::{debug, info, info_span, trace, warn, Span};

use super::fft::ChannelTransform;
use crate::error::Result;
use crate::params::{AnalysisConfig, BANDS, BAND_COUNT};

/// Energy per band, low to high, each in [0, 1]
pub type BandEnergies = [f32; BAND_COUNT];

/// Total energy below which a block counts as silence
pub const SILENCE_EPSILON: f32 = 1e-4;

/// Stereo difference weight added on top of the channel average
const STEREO_WIDTH_WEIGHT: f32 = 0.3;

/// Power-law taper applied to combined band energy
const TAPER_EXPONENT: f32 = 0.8;

/// Quiet-but-present bands inside this range get lifted to stay visible
const LIFT_RANGE: (f32, f32) = (0.001, 0.1);

/// One analysis result
#[derive(Debug, Clone, Copy)]
pub struct AnalysisFrame {
    pub bands: BandEnergies,

    /// Spectral unevenness plus loudness, in [0, 1]
    pub chaos: f32,

    pub timestamp: Instant,
}

impl AnalysisFrame {
    /// All-zero frame stamped now
    pub fn silent() -> Self {
        Self {
            bands: [0.0; BAND_COUNT],
            chaos: 0.0,
            timestamp: Instant::now(),
        }
    }
}

impl Default for AnalysisFrame {
    fn default() -> Self {
        Self::silent()
    }
}

/// Converts fixed-size interleaved stereo blocks into band energies
pub struct SpectralAnalyzer {
    config: AnalysisConfig,
    left: ChannelTransform,
    right: ChannelTransform,
    left_samples: Vec<f32>,
    right_samples: Vec<f32>,
    band_bins: [Range<usize>; BAND_COUNT],
    blocks: u64,
    span: Span,
}

impl SpectralAnalyzer {
    /// Create analyzer for blocks of `config.block_len` samples
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;

        let frames = config.frames_per_block();
        let mut planner = FftPlanner::new();
        let left = ChannelTransform::new(&mut planner, frames);
        let right = ChannelTransform::new(&mut planner, frames);
        let band_bins = band_bin_ranges(&config, left.bin_count());

        let span = info_span!("analyzer", sample_rate = config.sample_rate_hz, frames);
        span.in_scope(|| {
            info!(
                block_len = config.block_len,
                bin_width_hz = config.bin_width_hz(),
                "spectral analyzer ready"
            );
            for (band, bins) in BANDS.iter().zip(band_bins.iter()) {
                debug!(band = band.name, ?bins, "band bin range");
            }
        });

        Ok(Self {
            left,
            right,
            left_samples: vec![0.0; frames],
            right_samples: vec![0.0; frames],
            band_bins,
            blocks: 0,
            span,
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Resolved `[min, max)` bin range for each band
    pub fn band_bins(&self) -> &[Range<usize>; BAND_COUNT] {
        &self.band_bins
    }

    /// Blocks analysed so far
    pub fn blocks_processed(&self) -> u64 {
        self.blocks
    }

    /// Analyse one block. Never fails: empty or wrongly sized input yields
    /// a silent frame.
    pub fn process(&mut self, block: &[f32]) -> AnalysisFrame {
        let span = self.span.clone();
        let _enter = span.enter();

        if block.is_empty() {
            warn!("received empty sample block");
            return AnalysisFrame::silent();
        }
        if block.len() != self.config.block_len {
            warn!(
                expected = self.config.block_len,
                got = block.len(),
                "sample block has the wrong length"
            );
            return AnalysisFrame::silent();
        }

        self.blocks += 1;
        self.deinterleave(block);

        let (left, right) = (&mut self.left, &mut self.right);
        let (left_samples, right_samples) = (&self.left_samples, &self.right_samples);
        rayon::join(
            || left.transform(left_samples),
            || right.transform(right_samples),
        );

        let mut bands = [0.0; BAND_COUNT];
        let mut total = 0.0;
        for (i, bins) in self.band_bins.iter().enumerate() {
            let energy = band_energy(
                self.left.spectrum(),
                self.right.spectrum(),
                bins.clone(),
                BANDS[i].gain,
            );
            trace!(band = BANDS[i].name, energy, ?bins, "band energy");
            bands[i] = energy;
            total += energy;
        }

        lift_and_clamp(&mut bands);
        let chaos = chaos_level(&bands, total);

        if self.blocks % 100 == 0 {
            debug!(block = self.blocks, total, chaos, ?bands, "analysis");
        }

        AnalysisFrame {
            bands,
            chaos,
            timestamp: Instant::now(),
        }
    }

    /// Split interleaved stereo into channels; odd-length blocks are treated
    /// as mono and copied to both sides
    fn deinterleave(&mut self, block: &[f32]) {
        let gain = self.config.sensitivity;
        let clean = |s: f32| if s.is_finite() { s * gain } else { 0.0 };

        if block.len() % 2 == 0 {
            for (i, frame) in block.chunks_exact(2).enumerate() {
                self.left_samples[i] = clean(frame[0]);
                self.right_samples[i] = clean(frame[1]);
            }
        } else {
            for (i, &sample) in block.iter().enumerate() {
                self.left_samples[i] = clean(sample);
                self.right_samples[i] = clean(sample);
            }
        }
    }
}

/// Map each band's `[min_hz, max_hz)` onto transform bins, clamped to the
/// available `bin_count`
fn band_bin_ranges(config: &AnalysisConfig, bin_count: usize) -> [Range<usize>; BAND_COUNT] {
    std::array::from_fn(|i| {
        let min = config.hz_to_bin(BANDS[i].min_hz).min(bin_count);
        let max = config.hz_to_bin(BANDS[i].max_hz).min(bin_count);
        if max <= min {
            min..min
        } else {
            min..max
        }
    })
}

/// Log-weighted stereo energy of one band, tapered and calibrated
fn band_energy(
    left: &[Complex<f32>],
    right: &[Complex<f32>],
    bins: Range<usize>,
    gain: f32,
) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }

    let weighted = |c: &Complex<f32>| {
        let magnitude = c.norm();
        let w = magnitude * magnitude.ln_1p();
        w * w
    };
    let count = bins.len() as f32;
    let left_sum: f32 = left[bins.clone()].iter().map(weighted).sum();
    let right_sum: f32 = right[bins].iter().map(weighted).sum();

    let left_rms = (left_sum / count).sqrt();
    let right_rms = (right_sum / count).sqrt();

    let combined =
        (left_rms + right_rms) / 2.0 + STEREO_WIDTH_WEIGHT * (left_rms - right_rms).abs();
    let energy = combined.powf(TAPER_EXPONENT) * gain;

    if energy.is_finite() && energy > 0.0 {
        energy
    } else {
        0.0
    }
}

/// Cap bands at 1.0 and lift near-silent ones so they stay visible
fn lift_and_clamp(bands: &mut BandEnergies) {
    for band in bands.iter_mut() {
        *band = band.min(1.0);
        if *band > LIFT_RANGE.0 && *band < LIFT_RANGE.1 {
            *band = 0.1 + *band * 2.0;
        }
    }
}

/// Chaos from spectral unevenness and overall loudness
///
/// `total_energy` is the raw (pre-clamp) energy sum; below
/// [`SILENCE_EPSILON`] the result is 0. The band vector is normalised to
/// sum 1 and its variance around the uniform share `1/9` is blended with
/// `tanh(total * 10)`.
pub fn chaos_level(bands: &BandEnergies, total_energy: f32) -> f32 {
    if !total_energy.is_finite() || total_energy < SILENCE_EPSILON {
        return 0.0;
    }
    let sum: f32 = bands.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return 0.0;
    }

    let mean = 1.0 / BAND_COUNT as f32;
    let variance: f32 = bands
        .iter()
        .map(|e| {
            let diff = e / sum - mean;
            diff * diff
        })
        .sum();
    let energy_factor = (total_energy * 10.0).tanh();

    let chaos = variance * 5.0 * 0.6 + energy_factor * 0.4;
    if chaos.is_finite() {
        chaos.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
