//! Strand strategy: one noise-warped vertical sine trace per band with a
//! soft diffusion glow.

use std::f32::consts::PI;
use std::sync::Arc;

use super::grid::{BlendRule, FrameGrids};
use super::{RenderCore, Visualizer};
use crate::audio::BandEnergies;
use crate::cache::{Rgb, SineTable};
use crate::noise::NoiseGenerator;
use crate::params::{Palette, BAND_COUNT};

/// Smoothing weight of the newest analysis frame
pub const STRAND_SMOOTHING: f32 = 0.3;

/// Chaos above which the trace picks up FBM distortion
const DISTORTION_CHAOS: f32 = 0.1;

/// Rows of glow above and below each traced point
const VERTICAL_GLOW_ROWS: i64 = 3;
const VERTICAL_DECAY: f32 = 0.65;
const HORIZONTAL_DECAY: f32 = 0.5;

/// Traces that are this bright spread their side glow twice as far
const WIDE_GLOW_INTENSITY: f32 = 0.65;

/// Renders bands as vertical sine strands
pub struct StrandRenderer {
    core: RenderCore,
}

/// Inputs shared by every strand in one frame
struct StrandFrame<'a> {
    noise: &'a NoiseGenerator,
    sine: &'a SineTable,
    time: f32,
    chaos: f32,
    height: usize,
}

impl StrandRenderer {
    pub fn new(core: RenderCore) -> Self {
        Self { core }
    }

    pub fn core(&self) -> &RenderCore {
        &self.core
    }
}

impl Visualizer for StrandRenderer {
    fn update(&mut self, bands: &BandEnergies, chaos: f32) {
        self.core.set_target(bands, chaos);
    }

    fn render(&mut self, width: usize, height: usize) -> &str {
        self.core.smooth(STRAND_SMOOTHING);
        self.core.output.clear();
        if width == 0 || height == 0 {
            return &self.core.output;
        }

        let cache = Arc::clone(&self.core.cache);
        let mut grids = cache.grids().checkout(height, width);
        {
            let noise = self.core.noise.read();
            let frame = StrandFrame {
                noise: &noise,
                sine: cache.sine(),
                time: noise.time() as f32,
                chaos: self.core.smoothed.chaos,
                height,
            };

            let spacing = width.saturating_sub(4) / (BAND_COUNT + 1);
            for band in 0..BAND_COUNT {
                let base_x = 2 + (band + 1) * spacing;
                trace_strand(
                    &mut grids,
                    &frame,
                    band,
                    base_x as i64,
                    self.core.smoothed.bands[band],
                    self.core.colors[band],
                );
            }
        }

        stringify(&grids, &mut self.core);
        cache.grids().give_back(grids);
        &self.core.output
    }

    fn set_palette(&mut self, palette: Palette) {
        self.core.set_palette(palette);
    }

    fn palette(&self) -> Palette {
        self.core.palette()
    }

    fn smoothed(&self) -> (&BandEnergies, f32) {
        (&self.core.smoothed.bands, self.core.smoothed.chaos)
    }

    fn release(&mut self) {
        self.core.release();
    }
}

fn trace_strand(
    grids: &mut FrameGrids,
    frame: &StrandFrame<'_>,
    band: usize,
    base_x: i64,
    energy: f32,
    color: Rgb,
) {
    let amplitude = 3.0 + energy * 12.0;
    let frequency = 1.5 + energy * 2.5;
    let phase = frame.time * (0.8 + frame.chaos * 1.5);

    let octaves = 1 + (frame.chaos * 3.0) as u32;
    let persistence = 0.3 + frame.chaos * 0.2;
    let distortion_blend = 0.1 + frame.chaos * 0.15;

    for y in 0..frame.height {
        let y_norm = y as f32 / frame.height as f32;
        let angle = y_norm * 2.0 * PI * frequency;
        let sine = frame.sine.sin(angle + phase + band as f32 * 0.2);

        let wave = if frame.chaos > DISTORTION_CHAOS {
            let noise = frame.noise.fbm(
                band as f64 * 0.3,
                (y_norm * 2.0 + frame.time * 0.3) as f64,
                octaves,
                persistence,
            );
            sine * (1.0 - distortion_blend) + noise * distortion_blend
        } else {
            sine
        };

        // Brightest mid-strand, fading toward both ends
        let envelope = frame.sine.sin(y_norm * PI).max(0.0);
        let intensity = (0.6 + energy * 0.4) * (1.0 - sine.abs() * 0.3) * envelope;

        let x = base_x + (wave * amplitude) as i64;
        if x >= 0 && (x as usize) < grids.width() {
            draw_with_glow(grids, y, x as usize, color, intensity);
        }
    }
}

/// Plot one point plus its vertical and horizontal glow
fn draw_with_glow(grids: &mut FrameGrids, y: usize, x: usize, color: Rgb, intensity: f32) {
    grids.composite(y, x, color.gradient(intensity), intensity, BlendRule::STRAND_CORE);

    for dy in -VERTICAL_GLOW_ROWS..=VERTICAL_GLOW_ROWS {
        let gy = y as i64 + dy;
        if dy == 0 || gy < 0 || gy as usize >= grids.height() {
            continue;
        }
        let glow = intensity * VERTICAL_DECAY.powi(dy.unsigned_abs() as i32);
        let rule = BlendRule::STRAND_VERTICAL;
        grids.composite(gy as usize, x, color.gradient(glow), glow, rule);
    }

    let reach: i64 = if intensity > WIDE_GLOW_INTENSITY { 4 } else { 2 };
    for dx in -reach..=reach {
        let gx = x as i64 + dx;
        if dx == 0 || gx < 0 || gx as usize >= grids.width() {
            continue;
        }
        let glow = intensity * HORIZONTAL_DECAY.powi(dx.unsigned_abs() as i32);
        let rule = BlendRule::STRAND_HORIZONTAL;
        grids.composite(y, gx as usize, color.gradient(glow), glow, rule);
    }
}

fn stringify(grids: &FrameGrids, core: &mut RenderCore) {
    let styles = core.cache.styles();
    let out = &mut core.output;
    for y in 0..grids.height() {
        if y > 0 {
            out.push('\n');
        }
        let cells = (0..grids.width()).map(|x| {
            let glyph = grids.glyph(y, x);
            if glyph != ' ' && grids.intensity(y, x) > 0.0 {
                (glyph, (grids.color(y, x), None))
            } else {
                (' ', (None, None))
            }
        });
        super::grid::write_runs(out, styles, cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::{core_with_seed, visible_width};

    #[test]
    fn test_frame_dimensions() {
        let mut strand = StrandRenderer::new(core_with_seed(42));
        strand.update(&[0.5; BAND_COUNT], 0.4);
        let frame = strand.render(60, 20).to_string();

        let lines: Vec<&str> = frame.split('\n').collect();
        assert_eq!(lines.len(), 20);
        for line in lines {
            assert_eq!(visible_width(line), 60);
        }
        assert!(!frame.ends_with('\n'));
    }

    #[test]
    fn test_silence_still_traces_baseline() {
        // Zero energy keeps the 0.6 base intensity, so strands stay visible
        let mut strand = StrandRenderer::new(core_with_seed(1));
        let frame = strand.render(80, 24).to_string();
        assert!(frame.contains('\u{1b}'));
    }

    #[test]
    fn test_same_seed_same_frame() {
        let mut a = StrandRenderer::new(core_with_seed(9));
        let mut b = StrandRenderer::new(core_with_seed(9));
        for _ in 0..3 {
            a.update(&[0.8; BAND_COUNT], 0.6);
            b.update(&[0.8; BAND_COUNT], 0.6);
            assert_eq!(a.render(50, 16), b.render(50, 16));
        }
    }

    #[test]
    fn test_tiny_frames() {
        let mut strand = StrandRenderer::new(core_with_seed(3));
        assert_eq!(strand.render(1, 1).chars().filter(|c| *c == '\n').count(), 0);
        assert_eq!(strand.render(0, 10), "");
        assert_eq!(visible_width(strand.render(3, 2).split('\n').next().unwrap_or("")), 3);
    }

    #[test]
    fn test_grids_returned_after_render() {
        let mut strand = StrandRenderer::new(core_with_seed(4));
        strand.render(40, 12);
        strand.render(40, 12);
        let pool = strand.core().cache().grids();
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.allocations(), 1);
    }
}
