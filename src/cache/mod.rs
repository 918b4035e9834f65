//! Shared performance substrate for the render engine.
//!
//! Sine lookup, reusable frame grids, memoized terminal styles and colour
//! math. One instance is shared (behind `Arc`) by every frame and every
//! band-rendering task.

pub mod color;
mod pool;
mod sine;
mod style;

pub use color::Rgb;
pub use pool::{FrameGrids, GridPool};
pub use sine::{SineTable, SINE_TABLE_SIZE};
pub use style::{CellStyle, StyleCache, StyleKey};

/// Bundle of caches shared across frames
#[derive(Default)]
pub struct PerformanceCache {
    sine: SineTable,
    grids: GridPool,
    styles: StyleCache,
}

impl PerformanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose grid pool is pre-sized for `height` x `width` frames
    pub fn with_frame_size(height: usize, width: usize) -> Self {
        Self {
            sine: SineTable::new(),
            grids: GridPool::with_preallocated(1, height, width),
            styles: StyleCache::new(),
        }
    }

    pub fn sine(&self) -> &SineTable {
        &self.sine
    }

    pub fn grids(&self) -> &GridPool {
        &self.grids
    }

    pub fn styles(&self) -> &StyleCache {
        &self.styles
    }

    /// Shorthand for the table-driven sine
    #[inline]
    pub fn sin(&self, angle: f32) -> f32 {
        self.sine.sin(angle)
    }
}
