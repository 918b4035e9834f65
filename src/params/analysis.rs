//! Audio analysis configuration and the fixed band table.

use tracing::warn;

use crate::error::{Error, Result};

/// Number of analysed frequency bands
pub const BAND_COUNT: usize = 9;

/// Valid range for the input sensitivity multiplier
pub const SENSITIVITY_RANGE: std::ops::RangeInclusive<f32> = 0.5..=2.0;

/// One fixed frequency range with its calibration gain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    pub name: &'static str,

    /// Inclusive lower edge (Hz)
    pub min_hz: f32,

    /// Exclusive upper edge (Hz)
    pub max_hz: f32,

    /// Gain offsetting natural spectral roll-off (grows with frequency)
    pub gain: f32,
}

/// The nine analysed bands, low to high
pub const BANDS: [FrequencyBand; BAND_COUNT] = [
    FrequencyBand {
        name: "Sub-Bass",
        min_hz: 20.0,
        max_hz: 60.0,
        gain: 10.0,
    },
    FrequencyBand {
        name: "Bass",
        min_hz: 60.0,
        max_hz: 250.0,
        gain: 12.0,
    },
    FrequencyBand {
        name: "Low Mids",
        min_hz: 250.0,
        max_hz: 500.0,
        gain: 14.0,
    },
    FrequencyBand {
        name: "Low-Mid",
        min_hz: 500.0,
        max_hz: 1000.0,
        gain: 16.0,
    },
    FrequencyBand {
        name: "Mids",
        min_hz: 1000.0,
        max_hz: 2000.0,
        gain: 18.0,
    },
    FrequencyBand {
        name: "Upper Mids",
        min_hz: 2000.0,
        max_hz: 4000.0,
        gain: 22.0,
    },
    FrequencyBand {
        name: "Presence",
        min_hz: 4000.0,
        max_hz: 6000.0,
        gain: 26.0,
    },
    FrequencyBand {
        name: "Highs",
        min_hz: 6000.0,
        max_hz: 12000.0,
        gain: 30.0,
    },
    FrequencyBand {
        name: "Air",
        min_hz: 12000.0,
        max_hz: 20000.0,
        gain: 35.0,
    },
];

/// Spectral analysis configuration
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Capture sample rate (Hz)
    pub sample_rate_hz: u32,

    /// Samples per block, interleaved across channels
    /// 2048 stereo samples = 1024 frames ≈ 23 ms @ 44.1 kHz
    pub block_len: usize,

    /// Interleaved channel count delivered by capture
    pub channels: u16,

    /// Linear input gain applied while de-interleaving
    pub sensitivity: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            block_len: 2048,
            channels: 2,
            sensitivity: 1.0,
        }
    }
}

impl AnalysisConfig {
    /// Per-channel sample count once a block is de-interleaved
    pub fn frames_per_block(&self) -> usize {
        if self.block_len % 2 == 0 {
            self.block_len / 2
        } else {
            self.block_len
        }
    }

    /// Frequency resolution of one transform bin (Hz)
    pub fn bin_width_hz(&self) -> f32 {
        self.sample_rate_hz as f32 / self.frames_per_block() as f32
    }

    /// First transform bin whose centre frequency is at or above `hz`
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        (hz / self.bin_width_hz()).max(0.0).ceil() as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate_hz == 0 {
            return Err(Error::InvalidConfig("sample rate must be > 0".to_string()));
        }
        if self.block_len == 0 {
            return Err(Error::InvalidConfig("block length must be > 0".to_string()));
        }
        if self.channels == 0 {
            return Err(Error::InvalidConfig("channel count must be > 0".to_string()));
        }
        if !self.sensitivity.is_finite() || !SENSITIVITY_RANGE.contains(&self.sensitivity) {
            return Err(Error::InvalidConfig(format!(
                "sensitivity must be within {:?}, got {}",
                SENSITIVITY_RANGE, self.sensitivity
            )));
        }
        if !self.frames_per_block().is_power_of_two() {
            warn!(
                block_len = self.block_len,
                "block length is not a power of two; transforms will be slower"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hz_to_bin() {
        let config = AnalysisConfig::default();

        // 1024 frames per channel @ 44100 Hz ≈ 43.07 Hz per bin
        assert_eq!(config.frames_per_block(), 1024);
        assert_eq!(config.hz_to_bin(0.0), 0);
        assert_eq!(config.hz_to_bin(20.0), 1);
        assert_eq!(config.hz_to_bin(43.0), 1);
        assert_eq!(config.hz_to_bin(60.0), 2);
        assert_eq!(config.hz_to_bin(1000.0), 24);
    }

    #[test]
    fn test_band_gains_increase() {
        for pair in BANDS.windows(2) {
            assert!(pair[1].gain > pair[0].gain);
            assert_eq!(pair[0].max_hz, pair[1].min_hz);
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AnalysisConfig::default();
        assert!(config.validate().is_ok());

        config.sample_rate_hz = 0;
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            sensitivity: 3.0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            block_len: 0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_odd_block_keeps_full_length() {
        let config = AnalysisConfig {
            block_len: 1023,
            ..AnalysisConfig::default()
        };
        assert_eq!(config.frames_per_block(), 1023);
    }
}
