//! Frame composition from band energies, noise and the shared caches.
//!
//! Two interchangeable strategies implement [`Visualizer`]: strands (sine
//! traces with a diffusion glow) and beams (half-block plasma columns).
//! [`RenderEngine`] owns whichever one the configuration selects and tracks
//! its lifecycle.

mod beam;
pub mod grid;
mod strand;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, info_span, trace, Span};

use crate::audio::{AnalysisFrame, BandEnergies};
use crate::cache::{PerformanceCache, Rgb};
use crate::noise::NoiseGenerator;
use crate::params::{Palette, RenderConfig, Strategy, BAND_COUNT};

// Re-export public types
pub use beam::{BeamRenderer, BEAM_SMOOTHING};
pub use grid::{glyph_for_intensity, BlendRule, FrameGrids, GLYPH_LEVELS};
pub use strand::{StrandRenderer, STRAND_SMOOTHING};

/// A rendering strategy fed with analysis results
pub trait Visualizer: Send {
    /// Record the newest band energies and chaos; folded in on the next render
    fn update(&mut self, bands: &BandEnergies, chaos: f32);

    /// Advance smoothing one tick and compose a `width` x `height` frame.
    ///
    /// Rows are newline-joined with no trailing newline; a zero dimension
    /// yields an empty string.
    fn render(&mut self, width: usize, height: usize) -> &str;

    fn set_palette(&mut self, palette: Palette);

    fn palette(&self) -> Palette;

    /// Current smoothed band energies and chaos
    fn smoothed(&self) -> (&BandEnergies, f32);

    /// Drop buffers held between frames
    fn release(&mut self) {}
}

/// Exponential moving average of the analysis output
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothedState {
    pub bands: BandEnergies,
    pub chaos: f32,
}

impl SmoothedState {
    /// Move `alpha` of the way toward `target`
    pub fn approach(&mut self, target: &SmoothedState, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        for (value, goal) in self.bands.iter_mut().zip(target.bands.iter()) {
            *value = *value * (1.0 - alpha) + goal * alpha;
        }
        self.chaos = self.chaos * (1.0 - alpha) + target.chaos * alpha;
    }
}

/// State shared by both strategies
pub struct RenderCore {
    noise: Arc<RwLock<NoiseGenerator>>,
    cache: Arc<PerformanceCache>,
    palette: Palette,
    colors: [Rgb; BAND_COUNT],
    target: SmoothedState,
    smoothed: SmoothedState,
    output: String,
}

impl RenderCore {
    pub fn new(
        noise: Arc<RwLock<NoiseGenerator>>,
        cache: Arc<PerformanceCache>,
        palette: Palette,
    ) -> Self {
        Self {
            noise,
            cache,
            palette,
            colors: palette_colors(palette),
            target: SmoothedState::default(),
            smoothed: SmoothedState::default(),
            output: String::new(),
        }
    }

    pub fn cache(&self) -> &PerformanceCache {
        &self.cache
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
        self.colors = palette_colors(palette);
    }

    /// Non-finite inputs become 0 and everything is clamped to [0, 1]
    fn set_target(&mut self, bands: &BandEnergies, chaos: f32) {
        let sanitize = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        for (slot, value) in self.target.bands.iter_mut().zip(bands.iter()) {
            *slot = sanitize(*value);
        }
        self.target.chaos = sanitize(chaos);
    }

    fn smooth(&mut self, alpha: f32) {
        self.smoothed.approach(&self.target, alpha);
        trace!(bands = ?self.smoothed.bands, chaos = self.smoothed.chaos, "smoothed");
    }

    fn release(&mut self) {
        self.output = String::new();
    }
}

fn palette_colors(palette: Palette) -> [Rgb; BAND_COUNT] {
    let mut colors = [Rgb::WHITE; BAND_COUNT];
    for (slot, hex) in colors.iter_mut().zip(palette.colors().iter()) {
        *slot = Rgb::parse_hex(hex).unwrap_or(Rgb::WHITE);
    }
    colors
}

/// Lifecycle of a [`RenderEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No frame size seen yet
    Constructed,
    /// Idle between ticks at the last rendered size
    Ready { width: usize, height: usize },
    /// Composing a frame
    Rendering,
    /// Shut down; renders yield nothing
    Closed,
}

/// Renders frames with the configured strategy
pub struct RenderEngine {
    visualizer: Box<dyn Visualizer>,
    strategy: Strategy,
    noise: Arc<RwLock<NoiseGenerator>>,
    state: EngineState,
    frames: u64,
    span: Span,
}

impl RenderEngine {
    /// Build the strategy named in `config`; the noise field is shared with
    /// the host, which advances it
    pub fn new(
        config: &RenderConfig,
        noise: Arc<RwLock<NoiseGenerator>>,
        cache: Arc<PerformanceCache>,
    ) -> Self {
        let core = RenderCore::new(Arc::clone(&noise), cache, config.palette);
        let visualizer: Box<dyn Visualizer> = match config.strategy {
            Strategy::Strand => Box::new(StrandRenderer::new(core)),
            Strategy::Beam => Box::new(BeamRenderer::new(core)),
        };
        let span = info_span!("render_engine", strategy = %config.strategy);
        span.in_scope(|| info!(palette = %config.palette, "render engine constructed"));

        Self {
            visualizer,
            strategy: config.strategy,
            noise,
            state: EngineState::Constructed,
            frames: 0,
            span,
        }
    }

    /// Engine with its own noise field seeded from `config`
    pub fn with_seed(config: &RenderConfig, cache: Arc<PerformanceCache>) -> Self {
        let noise = Arc::new(RwLock::new(NoiseGenerator::new(config.seed)));
        Self::new(config, noise, cache)
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Shared noise field
    pub fn noise(&self) -> &Arc<RwLock<NoiseGenerator>> {
        &self.noise
    }

    /// Advance the noise time cursor by `delta_s` seconds
    pub fn advance(&self, delta_s: f64) {
        self.noise.write().advance(delta_s);
    }

    /// Feed one analysis result
    pub fn update(&mut self, frame: &AnalysisFrame) {
        self.update_bands(&frame.bands, frame.chaos);
    }

    pub fn update_bands(&mut self, bands: &BandEnergies, chaos: f32) {
        if self.state != EngineState::Closed {
            self.visualizer.update(bands, chaos);
        }
    }

    /// Compose one frame of exactly `height` rows of `width` cells
    pub fn render(&mut self, width: usize, height: usize) -> &str {
        if self.state == EngineState::Closed || width == 0 || height == 0 {
            return "";
        }

        let _enter = self.span.enter();
        match self.state {
            EngineState::Constructed => info!(width, height, "first frame size known"),
            EngineState::Ready { width: w, height: h } if (w, h) != (width, height) => {
                debug!(width, height, "frame resized")
            }
            _ => {}
        }

        self.state = EngineState::Rendering;
        self.frames += 1;
        let frame = self.visualizer.render(width, height);
        self.state = EngineState::Ready { width, height };
        frame
    }

    pub fn palette(&self) -> Palette {
        self.visualizer.palette()
    }

    /// Swap palettes without resetting smoothing
    pub fn set_palette(&mut self, palette: Palette) {
        self.span
            .in_scope(|| info!(%palette, "palette changed"));
        self.visualizer.set_palette(palette);
    }

    /// Current smoothed band energies and chaos
    pub fn smoothed(&self) -> (&BandEnergies, f32) {
        self.visualizer.smoothed()
    }

    /// Release buffers and stop rendering
    pub fn close(&mut self) {
        if self.state == EngineState::Closed {
            return;
        }
        self.visualizer.release();
        self.state = EngineState::Closed;
        self.span
            .in_scope(|| info!(frames = self.frames, "render engine closed"));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn core_with_seed(seed: u32) -> RenderCore {
        RenderCore::new(
            Arc::new(RwLock::new(NoiseGenerator::new(seed))),
            Arc::new(PerformanceCache::new()),
            Palette::default(),
        )
    }

    /// Character count with ANSI escape sequences removed
    pub(crate) fn visible_width(line: &str) -> usize {
        let mut count = 0;
        let mut chars = line.chars();
        while let Some(c) = chars.next() {
            if c == '\u{1b}' {
                // CSI: skip through the final byte
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            } else {
                count += 1;
            }
        }
        count
    }

    fn engine(strategy: Strategy) -> RenderEngine {
        let config = RenderConfig {
            strategy,
            ..RenderConfig::default()
        };
        RenderEngine::with_seed(&config, Arc::new(PerformanceCache::new()))
    }

    #[test]
    fn test_smoothing_is_convex() {
        let mut state = SmoothedState::default();
        let target = SmoothedState {
            bands: [1.0; BAND_COUNT],
            chaos: 0.5,
        };
        let mut previous = state;
        for _ in 0..20 {
            state.approach(&target, 0.3);
            for (now, before) in state.bands.iter().zip(previous.bands.iter()) {
                assert!(*now >= *before && *now <= 1.0);
            }
            assert!(state.chaos >= previous.chaos && state.chaos <= 0.5);
            previous = state;
        }
        assert!((state.bands[0] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_single_step_weights() {
        let mut state = SmoothedState::default();
        let target = SmoothedState {
            bands: [1.0; BAND_COUNT],
            chaos: 1.0,
        };
        state.approach(&target, STRAND_SMOOTHING);
        assert!((state.bands[4] - 0.3).abs() < 1e-6);
        state.approach(&SmoothedState::default(), BEAM_SMOOTHING);
        assert!((state.chaos - 0.3 * 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_engine_lifecycle() {
        let mut engine = engine(Strategy::Beam);
        assert_eq!(engine.state(), EngineState::Constructed);

        assert_eq!(engine.render(0, 10), "");
        assert_eq!(engine.state(), EngineState::Constructed);

        engine.render(40, 12);
        assert_eq!(
            engine.state(),
            EngineState::Ready {
                width: 40,
                height: 12
            }
        );
        engine.render(30, 8);
        assert_eq!(
            engine.state(),
            EngineState::Ready {
                width: 30,
                height: 8
            }
        );
        assert_eq!(engine.frames_rendered(), 2);

        engine.close();
        assert_eq!(engine.state(), EngineState::Closed);
        assert_eq!(engine.render(40, 12), "");
        assert_eq!(engine.frames_rendered(), 2);
    }

    #[test]
    fn test_update_feeds_smoothing() {
        let mut engine = engine(Strategy::Strand);
        let mut frame = AnalysisFrame::silent();
        frame.bands = [0.5; BAND_COUNT];
        frame.chaos = 1.0;
        engine.update(&frame);
        engine.render(20, 5);

        let (bands, chaos) = engine.smoothed();
        assert!((bands[0] - 0.15).abs() < 1e-6);
        assert!((chaos - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_input_is_sanitized() {
        let mut engine = engine(Strategy::Beam);
        let mut bands = [0.2; BAND_COUNT];
        bands[0] = f32::NAN;
        bands[1] = f32::INFINITY;
        bands[2] = 4.0;
        engine.update_bands(&bands, f32::NAN);
        engine.render(20, 5);

        let (smoothed, chaos) = engine.smoothed();
        assert_eq!(smoothed[0], 0.0);
        assert_eq!(smoothed[1], 0.0);
        assert!(smoothed[2] <= 1.0);
        assert_eq!(chaos, 0.0);
    }

    #[test]
    fn test_palette_swap_changes_colours() {
        let mut engine = engine(Strategy::Beam);
        engine.update_bands(&[1.0; BAND_COUNT], 0.0);
        let vibrant = engine.render(60, 10).to_string();

        engine.set_palette(Palette::Mono);
        assert_eq!(engine.palette(), Palette::Mono);
        let (before, _) = engine.smoothed();
        let before = *before;

        let mono = engine.render(60, 10).to_string();
        assert_ne!(vibrant, mono);
        // Palette swap does not reset smoothing
        assert!(engine.smoothed().0[0] > before[0]);
    }

    #[test]
    fn test_visible_width_strips_escapes() {
        assert_eq!(visible_width("\u{1b}[38;2;1;2;3mab\u{1b}[0m c"), 4);
    }
}
