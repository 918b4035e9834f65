//! Memoized terminal styles keyed by colour pair.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossterm::style::{ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::Command;
use parking_lot::RwLock;
use tracing::warn;

use super::color::Rgb;

/// Foreground and optional background colour
pub type StyleKey = (Option<Rgb>, Option<Rgb>);

/// Pre-rendered escape sequences for one colour pair
#[derive(Debug)]
pub struct CellStyle {
    key: StyleKey,
    prefix: String,
    suffix: String,
}

impl CellStyle {
    fn build(key: StyleKey) -> Self {
        let mut prefix = String::new();
        let mut suffix = String::new();
        if let Err(err) = write_sequences(key, &mut prefix, &mut suffix) {
            warn!(?key, %err, "failed to format style; rendering unstyled");
            prefix.clear();
            suffix.clear();
        }
        Self {
            key,
            prefix,
            suffix,
        }
    }

    pub fn key(&self) -> StyleKey {
        self.key
    }

    /// Escape sequence that switches this style on (empty when unstyled)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Escape sequence that restores default colours (empty when unstyled)
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

fn write_sequences(key: StyleKey, prefix: &mut String, suffix: &mut String) -> fmt::Result {
    let (fg, bg) = key;
    if let Some(fg) = fg {
        SetForegroundColor(fg.to_terminal()).write_ansi(prefix)?;
    }
    if let Some(bg) = bg {
        SetBackgroundColor(bg.to_terminal()).write_ansi(prefix)?;
    }
    if fg.is_some() || bg.is_some() {
        ResetColor.write_ansi(suffix)?;
    }
    Ok(())
}

/// Style memo table: lookups take a shared lock, insertions are serialized
pub struct StyleCache {
    styles: RwLock<HashMap<StyleKey, Arc<CellStyle>>>,
    built: AtomicUsize,
}

impl StyleCache {
    pub fn new() -> Self {
        Self {
            styles: RwLock::new(HashMap::with_capacity(3000)),
            built: AtomicUsize::new(0),
        }
    }

    /// Style for a foreground/background pair, built at most once per key
    pub fn get(&self, fg: Option<Rgb>, bg: Option<Rgb>) -> Arc<CellStyle> {
        let key = (fg, bg);
        if let Some(style) = self.styles.read().get(&key) {
            return Arc::clone(style);
        }

        let mut styles = self.styles.write();
        let style = styles.entry(key).or_insert_with(|| {
            self.built.fetch_add(1, Ordering::Relaxed);
            Arc::new(CellStyle::build(key))
        });
        Arc::clone(style)
    }

    /// Number of styles constructed so far
    pub fn built(&self) -> usize {
        self.built.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.styles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StyleCache {
    fn default() -> Self {
        Self::new()
    }
}
