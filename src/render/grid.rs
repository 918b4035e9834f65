//! Cell compositing, glyph quantization and styled stringification.

use std::sync::Arc;

use crate::cache::{CellStyle, Rgb, StyleCache, StyleKey};

pub use crate::cache::FrameGrids;

/// Intensity floors for each density glyph, densest first
pub const GLYPH_LEVELS: [(f32, char); 5] = [
    (0.85, '█'),
    (0.65, '▓'),
    (0.45, '▒'),
    (0.25, '░'),
    (0.10, '·'),
];

/// Density glyph for `intensity`; blank below the faintest level
pub fn glyph_for_intensity(intensity: f32) -> char {
    GLYPH_LEVELS
        .iter()
        .find(|(floor, _)| intensity > *floor)
        .map(|(_, glyph)| *glyph)
        .unwrap_or(' ')
}

/// How a new contribution merges into an already-lit cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlendRule {
    /// Strictly brighter contributions replace the cell. Otherwise, when
    /// both sides exceed `threshold`, colours mix at a fixed `ratio` and the
    /// cell keeps the larger intensity if `take_max` is set.
    Strongest {
        threshold: f32,
        ratio: f32,
        take_max: bool,
        /// Contributions at or below this are dropped outright
        floor: f32,
    },
    /// Light accumulates: overlapping contributions above `threshold` mix
    /// in proportion to their intensity and brighten the cell, capped at 1.
    Additive { threshold: f32 },
}

impl BlendRule {
    /// Main strand trace
    pub const STRAND_CORE: BlendRule = BlendRule::Strongest {
        threshold: 0.15,
        ratio: 0.5,
        take_max: true,
        floor: 0.0,
    };

    /// Strand glow above and below the trace
    pub const STRAND_VERTICAL: BlendRule = BlendRule::Strongest {
        threshold: 0.1,
        ratio: 0.3,
        take_max: false,
        floor: 0.0,
    };

    /// Strand glow to either side of the trace
    pub const STRAND_HORIZONTAL: BlendRule = BlendRule::Strongest {
        threshold: 0.08,
        ratio: 0.4,
        take_max: false,
        floor: 0.08,
    };

    /// Overlapping beams
    pub const BEAM: BlendRule = BlendRule::Additive { threshold: 0.04 };
}

impl FrameGrids {
    /// Merge a contribution of `color` at `intensity` into cell `(y, x)`
    pub fn composite(&mut self, y: usize, x: usize, color: Rgb, intensity: f32, rule: BlendRule) {
        if !intensity.is_finite() {
            return;
        }
        let stored = self.intensity(y, x);
        match rule {
            BlendRule::Strongest {
                threshold,
                ratio,
                take_max,
                floor,
            } => {
                if intensity <= floor {
                    return;
                }
                if intensity > stored {
                    self.set(y, x, glyph_for_intensity(intensity), Some(color), intensity);
                } else if stored > threshold && intensity > threshold {
                    let mixed = self.color(y, x).map_or(color, |c| c.blend(color, ratio));
                    let merged = if take_max { stored.max(intensity) } else { stored };
                    let glyph = self.glyph(y, x);
                    self.set(y, x, glyph, Some(mixed), merged);
                }
            }
            BlendRule::Additive { threshold } => {
                if intensity <= threshold {
                    return;
                }
                if stored > threshold {
                    let ratio = intensity / (intensity + stored);
                    let mixed = self.color(y, x).map_or(color, |c| c.blend(color, ratio));
                    let merged = stored.max((stored + intensity * 0.5).min(1.0));
                    self.set(y, x, glyph_for_intensity(merged), Some(mixed), merged);
                } else {
                    self.set(y, x, glyph_for_intensity(intensity), Some(color), intensity);
                }
            }
        }
    }
}

/// Append `cells` to `out`, opening a style only when the colour pair
/// changes so each maximal run is wrapped once
pub fn write_runs<I>(out: &mut String, styles: &StyleCache, cells: I)
where
    I: IntoIterator<Item = (char, StyleKey)>,
{
    let mut current: Option<Arc<CellStyle>> = None;
    for (glyph, key) in cells {
        if current.as_ref().map(|style| style.key()) != Some(key) {
            if let Some(style) = current.take() {
                out.push_str(style.suffix());
            }
            let style = styles.get(key.0, key.1);
            out.push_str(style.prefix());
            current = Some(style);
        }
        out.push(glyph);
    }
    if let Some(style) = current {
        out.push_str(style.suffix());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::GridPool;

    const RED: Rgb = Rgb::new(200, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 200);

    #[test]
    fn test_glyph_table() {
        assert_eq!(glyph_for_intensity(1.0), '█');
        assert_eq!(glyph_for_intensity(0.7), '▓');
        assert_eq!(glyph_for_intensity(0.5), '▒');
        assert_eq!(glyph_for_intensity(0.3), '░');
        assert_eq!(glyph_for_intensity(0.2), '·');
        assert_eq!(glyph_for_intensity(0.10), ' ');
        assert_eq!(glyph_for_intensity(0.0), ' ');
    }

    #[test]
    fn test_strongest_overwrites_only_when_brighter() {
        let pool = GridPool::new();
        let mut grids = pool.checkout(1, 1);

        grids.composite(0, 0, RED, 0.5, BlendRule::STRAND_CORE);
        assert_eq!(grids.color(0, 0), Some(RED));
        assert_eq!(grids.glyph(0, 0), '▒');

        // Dimmer but visible: colours mix, intensity and glyph stay
        grids.composite(0, 0, BLUE, 0.3, BlendRule::STRAND_CORE);
        assert_eq!(grids.color(0, 0), Some(RED.blend(BLUE, 0.5)));
        assert_eq!(grids.intensity(0, 0), 0.5);
        assert_eq!(grids.glyph(0, 0), '▒');

        // Below the blend threshold: ignored
        let before = grids.color(0, 0);
        grids.composite(0, 0, RED, 0.12, BlendRule::STRAND_CORE);
        assert_eq!(grids.color(0, 0), before);

        grids.composite(0, 0, BLUE, 0.9, BlendRule::STRAND_CORE);
        assert_eq!(grids.color(0, 0), Some(BLUE));
        assert_eq!(grids.glyph(0, 0), '█');
        pool.give_back(grids);
    }

    #[test]
    fn test_horizontal_floor_drops_faint_glow() {
        let pool = GridPool::new();
        let mut grids = pool.checkout(1, 1);
        grids.composite(0, 0, RED, 0.08, BlendRule::STRAND_HORIZONTAL);
        assert_eq!(grids.intensity(0, 0), 0.0);
        assert_eq!(grids.color(0, 0), None);
        pool.give_back(grids);
    }

    #[test]
    fn test_additive_brightens_and_caps() {
        let pool = GridPool::new();
        let mut grids = pool.checkout(1, 1);

        grids.composite(0, 0, RED, 0.6, BlendRule::BEAM);
        grids.composite(0, 0, BLUE, 0.6, BlendRule::BEAM);
        assert!((grids.intensity(0, 0) - 0.9).abs() < 1e-6);
        assert_eq!(grids.color(0, 0), Some(RED.blend(BLUE, 0.5)));

        grids.composite(0, 0, BLUE, 0.8, BlendRule::BEAM);
        assert_eq!(grids.intensity(0, 0), 1.0);

        // Never dims
        grids.composite(0, 0, RED, 0.05, BlendRule::BEAM);
        assert_eq!(grids.intensity(0, 0), 1.0);
        pool.give_back(grids);
    }

    #[test]
    fn test_additive_ignores_faint() {
        let pool = GridPool::new();
        let mut grids = pool.checkout(1, 1);
        grids.composite(0, 0, RED, 0.04, BlendRule::BEAM);
        assert_eq!(grids.intensity(0, 0), 0.0);
        assert_eq!(grids.color(0, 0), None);
        pool.give_back(grids);
    }

    #[test]
    fn test_write_runs_groups_colours() {
        let styles = StyleCache::new();
        let mut out = String::new();
        let cells = [
            ('a', (Some(RED), None)),
            ('b', (Some(RED), None)),
            (' ', (None, None)),
            ('c', (Some(BLUE), None)),
        ];
        write_runs(&mut out, &styles, cells);

        assert_eq!(out.matches("\u{1b}[0m").count(), 2);
        assert!(out.contains("ab\u{1b}[0m "));
        assert_eq!(styles.built(), 3);
    }
}
