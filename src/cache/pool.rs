//! Free-list of reusable frame grids.
//!
//! Grids are checked out by value (single owner) and handed back after the
//! frame is stringified. Backing storage only grows, so once the pool has
//! seen the largest frame size a steady-state render allocates nothing.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use super::color::Rgb;

/// Glyph/colour/intensity planes for one frame, stored row-major
#[derive(Debug)]
pub struct FrameGrids {
    glyphs: Vec<char>,
    colors: Vec<Option<Rgb>>,
    intensity: Vec<f32>,
    width: usize,
    height: usize,
}

impl FrameGrids {
    fn empty() -> Self {
        Self {
            glyphs: Vec::new(),
            colors: Vec::new(),
            intensity: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    /// Resize the active region and clear it; returns true when backing
    /// storage had to grow
    fn reset(&mut self, height: usize, width: usize) -> bool {
        let cells = height * width;
        let grew = cells > self.intensity.len();
        if grew {
            self.glyphs.resize(cells, ' ');
            self.colors.resize(cells, None);
            self.intensity.resize(cells, 0.0);
        }
        self.glyphs[..cells].fill(' ');
        self.colors[..cells].fill(None);
        self.intensity[..cells].fill(0.0);
        self.width = width;
        self.height = height;
        grew
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, y: usize, x: usize) -> usize {
        debug_assert!(y < self.height && x < self.width);
        y * self.width + x
    }

    #[inline]
    pub fn glyph(&self, y: usize, x: usize) -> char {
        self.glyphs[self.index(y, x)]
    }

    #[inline]
    pub fn color(&self, y: usize, x: usize) -> Option<Rgb> {
        self.colors[self.index(y, x)]
    }

    #[inline]
    pub fn intensity(&self, y: usize, x: usize) -> f32 {
        self.intensity[self.index(y, x)]
    }

    /// Overwrite one cell
    #[inline]
    pub fn set(&mut self, y: usize, x: usize, glyph: char, color: Option<Rgb>, intensity: f32) {
        let i = self.index(y, x);
        self.glyphs[i] = glyph;
        self.colors[i] = color;
        self.intensity[i] = intensity;
    }
}

/// Pool of [`FrameGrids`] shared across frames and render tasks
pub struct GridPool {
    free: Mutex<Vec<FrameGrids>>,
    allocations: AtomicUsize,
    in_use: AtomicUsize,
}

impl GridPool {
    pub fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            allocations: AtomicUsize::new(0),
            in_use: AtomicUsize::new(0),
        }
    }

    /// Pool with `slots` grids already sized for `height` x `width`
    pub fn with_preallocated(slots: usize, height: usize, width: usize) -> Self {
        let pool = Self::new();
        {
            let mut free = pool.free.lock();
            for _ in 0..slots {
                let mut grids = FrameGrids::empty();
                if grids.reset(height, width) {
                    pool.allocations.fetch_add(1, Ordering::Relaxed);
                }
                free.push(grids);
            }
        }
        pool
    }

    /// Take exclusive ownership of a grid set whose `height` x `width`
    /// region is cleared
    pub fn checkout(&self, height: usize, width: usize) -> FrameGrids {
        let mut grids = self.free.lock().pop().unwrap_or_else(FrameGrids::empty);
        if grids.reset(height, width) {
            let total = self.allocations.fetch_add(1, Ordering::Relaxed) + 1;
            trace!(height, width, total, "grid pool grew backing storage");
        }
        self.in_use.fetch_add(1, Ordering::Relaxed);
        grids
    }

    /// Return a grid set to the free list
    pub fn give_back(&self, grids: FrameGrids) {
        self.in_use.fetch_sub(1, Ordering::Relaxed);
        self.free.lock().push(grids);
    }

    /// Number of times backing storage was created or grown
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Grid sets currently checked out
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }
}

impl Default for GridPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_does_not_allocate() {
        let pool = GridPool::new();

        let grids = pool.checkout(40, 120);
        let storage = grids.intensity.as_ptr();
        assert_eq!(pool.allocations(), 1);
        assert_eq!(pool.in_use(), 1);
        pool.give_back(grids);

        let grids = pool.checkout(40, 120);
        assert_eq!(pool.allocations(), 1);
        assert_eq!(grids.intensity.as_ptr(), storage);
        pool.give_back(grids);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.free.lock().len(), 1);
    }

    #[test]
    fn test_checkout_clears_region() {
        let pool = GridPool::new();
        let mut grids = pool.checkout(4, 4);
        grids.set(1, 2, '█', Some(Rgb::WHITE), 0.9);
        pool.give_back(grids);

        let grids = pool.checkout(3, 5);
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(grids.glyph(y, x), ' ');
                assert_eq!(grids.color(y, x), None);
                assert_eq!(grids.intensity(y, x), 0.0);
            }
        }
    }

    #[test]
    fn test_smaller_frames_never_shrink() {
        let pool = GridPool::with_preallocated(1, 50, 200);
        assert_eq!(pool.allocations(), 1);

        let grids = pool.checkout(10, 10);
        assert!(grids.intensity.len() >= 50 * 200);
        pool.give_back(grids);

        let grids = pool.checkout(50, 200);
        assert_eq!(pool.allocations(), 1);
        pool.give_back(grids);

        let grids = pool.checkout(60, 200);
        assert_eq!(pool.allocations(), 2);
        pool.give_back(grids);
    }
}
