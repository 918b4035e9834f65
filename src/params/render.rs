//! Rendering configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::palette::Palette;
use crate::error::{Error, Result};

/// Valid frame-rate range (frames per second)
pub const FPS_RANGE: std::ops::RangeInclusive<u32> = 10..=120;

/// Composition strategy, fixed at engine construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// One noise-warped sine strand per band with a diffusion aura
    Strand,
    /// One wandering half-block plasma beam per band
    #[default]
    Beam,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Strand => f.write_str("strand"),
            Strategy::Beam => f.write_str("beam"),
        }
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strand" | "strands" | "wave" => Ok(Strategy::Strand),
            "beam" | "beams" | "plasma" => Ok(Strategy::Beam),
            other => Err(Error::UnknownStrategy(other.to_string())),
        }
    }
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Target redraw rate (frames per second)
    pub fps: u32,

    /// Initial band palette (swappable at runtime)
    pub palette: Palette,

    /// Composition strategy
    pub strategy: Strategy,

    /// Coherent-noise seed
    pub seed: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            palette: Palette::Vibrant,
            strategy: Strategy::Beam,
            seed: 42,
        }
    }
}

impl RenderConfig {
    /// Time between render ticks
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }

    /// Noise time advanced per tick (seconds)
    pub fn tick_seconds(&self) -> f64 {
        1.0 / self.fps.max(1) as f64
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !FPS_RANGE.contains(&self.fps) {
            return Err(Error::InvalidConfig(format!(
                "fps must be within {:?}, got {}",
                FPS_RANGE, self.fps
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval() {
        let config = RenderConfig {
            fps: 50,
            ..RenderConfig::default()
        };
        assert_eq!(config.frame_interval(), Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fps_out_of_range() {
        let config = RenderConfig {
            fps: 500,
            ..RenderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("Strand".parse::<Strategy>().unwrap(), Strategy::Strand);
        assert_eq!("plasma".parse::<Strategy>().unwrap(), Strategy::Beam);
        assert!("spiral".parse::<Strategy>().is_err());
    }
}
