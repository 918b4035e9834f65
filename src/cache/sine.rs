//! Precomputed sine lookup with linear interpolation.

use std::f32::consts::TAU;

/// Samples per period
pub const SINE_TABLE_SIZE: usize = 8192;

/// One period of `sin`, sampled uniformly over [0, 2π)
pub struct SineTable {
    table: Vec<f32>,
}

impl SineTable {
    pub fn new() -> Self {
        let table = (0..SINE_TABLE_SIZE)
            .map(|i| (i as f32 / SINE_TABLE_SIZE as f32 * TAU).sin())
            .collect();
        Self { table }
    }

    /// Interpolated `sin(angle)` for any finite angle
    pub fn sin(&self, angle: f32) -> f32 {
        if !angle.is_finite() {
            return 0.0;
        }
        let wrapped = angle.rem_euclid(TAU);
        let pos = wrapped / TAU * SINE_TABLE_SIZE as f32;
        let index = pos as usize;
        let fraction = pos - index as f32;

        let a = self.table[index % SINE_TABLE_SIZE];
        let b = self.table[(index + 1) % SINE_TABLE_SIZE];
        a + fraction * (b - a)
    }
}

impl Default for SineTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_std_sin() {
        let table = SineTable::new();
        for i in -2000..2000 {
            let angle = i as f32 * 0.0137;
            assert!((table.sin(angle) - angle.sin()).abs() < 1e-4, "angle {angle}");
        }
    }

    #[test]
    fn test_wraps_large_and_negative_angles() {
        let table = SineTable::new();
        assert!((table.sin(-TAU / 4.0) + 1.0).abs() < 1e-4);
        assert!((table.sin(100.0 * TAU + 0.5) - 0.5f32.sin()).abs() < 1e-3);
        assert_eq!(table.sin(f32::NAN), 0.0);
    }
}
