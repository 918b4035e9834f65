//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use plasmaterm::params::{
    AnalysisConfig, Palette, RenderConfig, Strategy, FPS_RANGE, SENSITIVITY_RANGE,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "plasmaterm")]
#[command(about = "Audio-reactive terminal visualizer", long_about = None)]
pub struct Args {
    /// Frames per second (10-120)
    #[arg(long, value_name = "FPS", default_value = "60")]
    pub fps: u32,

    /// Audio sensitivity multiplier (0.5-2.0)
    #[arg(long, value_name = "GAIN", default_value = "1.0")]
    pub sensitivity: f32,

    /// Color scheme: vibrant (default), retro, pastel, mono
    #[arg(long, value_name = "SCHEME", default_value = "vibrant")]
    pub colors: String,

    /// Rendering strategy: beam (default), strand
    #[arg(long, value_name = "STRATEGY", default_value = "beam")]
    pub strategy: String,

    /// Audio device name (substring match; empty = auto)
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Noise seed
    #[arg(long, value_name = "SEED", default_value = "42")]
    pub seed: u32,

    /// Write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Render this many frames without a terminal and print the last one
    #[arg(long, value_name = "FRAMES")]
    pub headless: Option<u32>,

    /// List input devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

impl Args {
    /// Palette from `--colors`, falling back to vibrant on unknown names
    pub fn parse_palette(&self) -> Palette {
        self.colors.parse().unwrap_or_else(|_| {
            warn!(scheme = %self.colors, "unknown color scheme, using vibrant");
            Palette::Vibrant
        })
    }

    /// Strategy from `--strategy`, falling back to beams on unknown names
    pub fn parse_strategy(&self) -> Strategy {
        self.strategy.parse().unwrap_or_else(|_| {
            warn!(strategy = %self.strategy, "unknown strategy, using beam");
            Strategy::Beam
        })
    }

    /// Render configuration with fps clamped into range
    pub fn render_config(&self) -> RenderConfig {
        let fps = self.fps.clamp(*FPS_RANGE.start(), *FPS_RANGE.end());
        if fps != self.fps {
            warn!(requested = self.fps, fps, "fps out of range, clamped");
        }
        RenderConfig {
            fps,
            palette: self.parse_palette(),
            strategy: self.parse_strategy(),
            seed: self.seed,
        }
    }

    /// Analysis configuration with sensitivity clamped into range
    pub fn analysis_config(&self) -> AnalysisConfig {
        let sensitivity = if self.sensitivity.is_finite() {
            self.sensitivity
                .clamp(*SENSITIVITY_RANGE.start(), *SENSITIVITY_RANGE.end())
        } else {
            1.0
        };
        if sensitivity != self.sensitivity {
            warn!(
                requested = self.sensitivity,
                sensitivity,
                "sensitivity out of range, clamped"
            );
        }
        AnalysisConfig {
            sensitivity,
            ..AnalysisConfig::default()
        }
    }

    /// Device hint, treating an empty string as auto
    pub fn device_hint(&self) -> Option<&str> {
        self.device.as_deref().filter(|name| !name.trim().is_empty())
    }
}
