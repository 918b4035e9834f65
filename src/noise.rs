//! Coherent noise for organic motion.
//!
//! OpenSimplex noise sampled in 2D, layered into fractal Brownian motion,
//! plus a monotonic time cursor the host advances once per render tick.

use ::noise::{NoiseFn, OpenSimplex};

/// Seeded 2D noise field with a time cursor
pub struct NoiseGenerator {
    simplex: OpenSimplex,
    seed: u32,
    time: f64,
}

impl NoiseGenerator {
    /// Create new noise generator with seed
    pub fn new(seed: u32) -> Self {
        Self {
            simplex: OpenSimplex::new(seed),
            seed,
            time: 0.0,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Current time cursor (seconds)
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Move the time cursor forward
    pub fn advance(&mut self, delta_s: f64) {
        self.time += delta_s;
    }

    /// Sample 2D simplex noise at position
    ///
    /// Returns value in range [-1, 1]; a pure function of `(x, y, seed)`.
    pub fn evaluate_2d(&self, x: f64, y: f64) -> f32 {
        self.simplex.get([x, y]).clamp(-1.0, 1.0) as f32
    }

    /// Fractal Brownian motion: `octaves` layers of noise, frequency doubling
    /// and amplitude scaled by `persistence` per layer, normalised by the
    /// total weight. Zero octaves are treated as one.
    pub fn fbm(&self, x: f64, y: f64, octaves: u32, persistence: f32) -> f32 {
        let persistence = persistence as f64;
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut weight = 0.0;

        for _ in 0..octaves.max(1) {
            let sample = self.simplex.get([x * frequency, y * frequency]);
            total += sample.clamp(-1.0, 1.0) * amplitude;
            weight += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        if weight == 0.0 {
            return 0.0;
        }
        (total / weight) as f32
    }
}
