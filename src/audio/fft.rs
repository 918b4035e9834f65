//! Windowed forward transform for one audio channel.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    if size <= 1 {
        return 1.0;
    }
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// Planned transform plus the window and buffers it reuses every block
///
/// Each channel owns one of these, so the left and right transforms share
/// no mutable state and can run on separate threads.
pub struct ChannelTransform {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl ChannelTransform {
    pub fn new(planner: &mut FftPlanner<f32>, len: usize) -> Self {
        let fft = planner.plan_fft_forward(len);
        let scratch_len = fft.get_inplace_scratch_len();
        Self {
            fft,
            window: (0..len).map(|i| hann_window(i, len)).collect(),
            buffer: vec![Complex::new(0.0, 0.0); len],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Transform length (samples per channel)
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of non-negative frequency bins produced (`N/2 + 1`)
    pub fn bin_count(&self) -> usize {
        if self.buffer.is_empty() {
            0
        } else {
            self.len() / 2 + 1
        }
    }

    /// Window and transform `samples` in place; shorter input is zero-padded
    pub fn transform(&mut self, samples: &[f32]) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        if !self.buffer.is_empty() {
            self.fft
                .process_with_scratch(&mut self.buffer, &mut self.scratch);
        }
    }

    /// Non-negative frequency bins from the last [`transform`](Self::transform)
    pub fn spectrum(&self) -> &[Complex<f32>] {
        &self.buffer[..self.bin_count()]
    }
}
