//! Beam strategy: nine wandering plasma beams drawn at double vertical
//! resolution and packed into half-block glyphs.

use std::f32::consts::PI;
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;

use super::grid::{BlendRule, FrameGrids};
use super::{RenderCore, Visualizer};
use crate::audio::BandEnergies;
use crate::cache::{PerformanceCache, Rgb, StyleKey};
use crate::noise::NoiseGenerator;
use crate::params::{Palette, BAND_COUNT};

/// Smoothing weight of the newest analysis frame
pub const BEAM_SMOOTHING: f32 = 0.35;

/// Chaos above which beams pick up high-frequency jitter
const JITTER_CHAOS: f32 = 0.3;

/// Normalised distance from the centreline where the core ends
const CORE_RADIUS: f32 = 0.3;

/// Samples dimmer than this are not worth a lock
const MIN_FALLOFF: f32 = 0.05;

/// Intensity at which a half-block pixel shows its colour
const HALF_LIT_THRESHOLD: f32 = 0.05;

const UPPER_HALF: char = '▀';
const LOWER_HALF: char = '▄';

/// Renders bands as vertical plasma beams
pub struct BeamRenderer {
    core: RenderCore,
}

/// Inputs shared by every beam in one frame
struct BeamFrame<'a> {
    noise: &'a NoiseGenerator,
    cache: &'a PerformanceCache,
    time: f32,
    chaos: f32,
    rows: usize,
    width: usize,
}

impl BeamRenderer {
    pub fn new(core: RenderCore) -> Self {
        Self { core }
    }

    pub fn core(&self) -> &RenderCore {
        &self.core
    }
}

impl Visualizer for BeamRenderer {
    fn update(&mut self, bands: &BandEnergies, chaos: f32) {
        self.core.set_target(bands, chaos);
    }

    fn render(&mut self, width: usize, height: usize) -> &str {
        self.core.smooth(BEAM_SMOOTHING);
        self.core.output.clear();
        if width == 0 || height == 0 {
            return &self.core.output;
        }

        let rows = height * 2;
        let cache = Arc::clone(&self.core.cache);
        let grid = Mutex::new(cache.grids().checkout(rows, width));
        {
            let noise = self.core.noise.read();
            let frame = BeamFrame {
                noise: &noise,
                cache: &cache,
                time: noise.time() as f32,
                chaos: self.core.smoothed.chaos,
                rows,
                width,
            };
            let energies = self.core.smoothed.bands;
            let colors = self.core.colors;
            let spacing = width.saturating_sub(4) / (BAND_COUNT + 1);

            // par_iter joins every band before the grid is read
            (0..BAND_COUNT).into_par_iter().for_each(|band| {
                let base_x = (2 + (band + 1) * spacing) as f32;
                draw_beam(&grid, &frame, band, base_x, energies[band], colors[band]);
            });
        }

        let grids = grid.into_inner();
        stringify(&grids, height, &mut self.core);
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

fn draw_beam(
    grid: &Mutex<FrameGrids>,
    frame: &BeamFrame<'_>,
    band: usize,
    base_x: f32,
    energy: f32,
    color: Rgb,
) {
    let t = frame.time;
    let core_width = 0.8 + energy * 2.2;
    let wander = (2.5 + energy * 6.0) * (0.8 + frame.chaos * 1.2);

    for y in 0..frame.rows {
        let y_norm = y as f32 / frame.rows as f32;

        let drift = frame.noise.fbm(
            (y_norm * 1.8) as f64,
            (band as f32 * 0.4 + t * 0.7) as f64,
            3,
            0.45,
        );
        let mut offset = drift * wander;
        if frame.chaos > JITTER_CHAOS {
            let jitter = frame.noise.evaluate_2d(y as f64 * 0.8, (t * 15.0) as f64);
            offset += jitter * (frame.chaos - JITTER_CHAOS) * 2.5;
        }
        let center = (base_x + offset) as i64;

        let pulse = frame.cache.sin(y_norm * PI * 4.0 - t * (6.0 + energy * 10.0));
        let beam_width = core_width * (0.9 + pulse * 0.1);
        let scan = (beam_width * 3.5) as i64;
        let flicker = 0.92 + 0.16 * frame.cache.sin(t * 25.0 + y as f32 * 0.6);

        // One lock per row keeps contention with the other beams low
        let mut grids = grid.lock();
        for dx in -scan..=scan {
            let x = center + dx;
            if x < 0 || x as usize >= frame.width {
                continue;
            }

            let dist = dx.unsigned_abs() as f32 / beam_width;
            let falloff = if dist < CORE_RADIUS {
                1.0 - dist * 0.8
            } else {
                0.75 * (-4.5 * (dist - CORE_RADIUS)).exp()
            };
            if falloff < MIN_FALLOFF {
                continue;
            }

            let intensity = energy * falloff * flicker;
            let tint = color.gradient(intensity);
            grids.composite(y, x as usize, tint, intensity, BlendRule::BEAM);
        }
    }
}

/// Glyph and colour pair for one output cell covering two grid rows
fn half_block(grids: &FrameGrids, top: usize, x: usize) -> (char, StyleKey) {
    let lit = |y: usize| {
        (y < grids.height() && grids.intensity(y, x) >= HALF_LIT_THRESHOLD)
            .then(|| grids.color(y, x))
            .flatten()
    };
    let (upper, lower) = (lit(top), lit(top + 1));
    match (upper, lower) {
        (Some(up), low) => (UPPER_HALF, (Some(up), low)),
        (None, Some(low)) => (LOWER_HALF, (Some(low), None)),
        (None, None) => (' ', (None, None)),
    }
}

fn stringify(grids: &FrameGrids, height: usize, core: &mut RenderCore) {
    let styles = core.cache.styles();
    let out = &mut core.output;
    for row in 0..height {
        if row > 0 {
            out.push('\n');
        }
        let cells = (0..grids.width()).map(|x| half_block(grids, row * 2, x));
        super::grid::write_runs(out, styles, cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::{core_with_seed, visible_width};

    #[test]
    fn test_frame_dimensions() {
        let mut beam = BeamRenderer::new(core_with_seed(42));
        beam.update(&[0.9; BAND_COUNT], 0.5);
        let frame = beam.render(80, 24).to_string();

        let lines: Vec<&str> = frame.split('\n').collect();
        assert_eq!(lines.len(), 24);
        for line in lines {
            assert_eq!(visible_width(line), 80);
        }
        assert!(!frame.ends_with('\n'));
        assert!(frame.contains(UPPER_HALF));
    }

    #[test]
    fn test_silence_is_blank() {
        let mut beam = BeamRenderer::new(core_with_seed(7));
        let frame = beam.render(40, 10).to_string();
        assert!(!frame.contains('\u{1b}'));
        assert_eq!(frame, vec![" ".repeat(40); 10].join("\n"));
    }

    #[test]
    fn test_half_block_pairs() {
        let pool = crate::cache::GridPool::new();
        let mut grids = pool.checkout(2, 3);
        let red = Rgb::new(255, 0, 0);
        let blue = Rgb::new(0, 0, 255);
        grids.composite(0, 0, red, 0.9, BlendRule::BEAM);
        grids.composite(1, 0, blue, 0.9, BlendRule::BEAM);
        grids.composite(1, 1, blue, 0.9, BlendRule::BEAM);

        assert_eq!(half_block(&grids, 0, 0), (UPPER_HALF, (Some(red), Some(blue))));
        assert_eq!(half_block(&grids, 0, 1), (LOWER_HALF, (Some(blue), None)));
        assert_eq!(half_block(&grids, 0, 2), (' ', (None, None)));
        pool.give_back(grids);
    }

    #[test]
    fn test_faint_halves_stay_lit() {
        let pool = crate::cache::GridPool::new();
        let mut grids = pool.checkout(2, 3);
        let red = Rgb::new(255, 0, 0);
        // Below the glyph table's faintest level but still part of the aura
        grids.composite(0, 0, red, 0.07, BlendRule::BEAM);
        grids.composite(1, 1, red, 0.05, BlendRule::BEAM);
        grids.composite(0, 2, red, 0.045, BlendRule::BEAM);

        assert_eq!(half_block(&grids, 0, 0), (UPPER_HALF, (Some(red), None)));
        assert_eq!(half_block(&grids, 0, 1), (LOWER_HALF, (Some(red), None)));
        assert_eq!(half_block(&grids, 0, 2), (' ', (None, None)));
        pool.give_back(grids);
    }

    #[test]
    fn test_grids_returned_after_render() {
        let mut beam = BeamRenderer::new(core_with_seed(5));
        beam.update(&[1.0; BAND_COUNT], 1.0);
        for _ in 0..4 {
            beam.render(64, 20);
        }
        let pool = beam.core().cache().grids();
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.allocations(), 1);
    }
}
