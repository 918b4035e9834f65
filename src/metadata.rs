//! Now-playing metadata shown above the visualizer.
//!
//! Desktop media sessions are queried through [`MetadataSource`]; the
//! throttle keeps slow backends off the render path and a missing or
//! failing source falls back to a placeholder.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Result;

/// Minimum time between backend queries
pub const METADATA_INTERVAL: Duration = Duration::from_secs(2);

/// Snapshot of the active media session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMetadata {
    pub source_app: String,
    pub artist: String,
    pub title: String,
    pub is_playing: bool,
}

impl MediaMetadata {
    /// Shown when nothing is playing or no backend is available
    pub fn placeholder() -> Self {
        Self {
            source_app: "No Media Playing".to_string(),
            artist: "Unknown Artist".to_string(),
            title: "Listening...".to_string(),
            is_playing: false,
        }
    }

    pub fn status(&self) -> &'static str {
        if self.is_playing {
            "PLAYING"
        } else {
            "PAUSED"
        }
    }
}

impl Default for MediaMetadata {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Backend able to report the current media session
pub trait MetadataSource {
    /// `Ok(None)` means no session is active
    fn query(&mut self) -> Result<Option<MediaMetadata>>;
}

/// Source for platforms without a media-session backend
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMetadata;

impl MetadataSource for NoMetadata {
    fn query(&mut self) -> Result<Option<MediaMetadata>> {
        Ok(None)
    }
}

/// Queries `S` at most once per interval and serves the cached snapshot
/// in between
pub struct ThrottledMetadata<S> {
    source: S,
    interval: Duration,
    last_query: Option<Instant>,
    current: MediaMetadata,
}

impl<S: MetadataSource> ThrottledMetadata<S> {
    pub fn new(source: S) -> Self {
        Self::with_interval(source, METADATA_INTERVAL)
    }

    pub fn with_interval(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            last_query: None,
            current: MediaMetadata::placeholder(),
        }
    }

    /// Latest snapshot, refreshing first if the interval has elapsed
    pub fn poll(&mut self) -> &MediaMetadata {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> &MediaMetadata {
        let due = self
            .last_query
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last_query = Some(now);
            match self.source.query() {
                Ok(Some(metadata)) => self.current = metadata,
                Ok(None) => self.current = MediaMetadata::placeholder(),
                // Keep the last good snapshot
                Err(err) => debug!(%err, "metadata query failed"),
            }
        }
        &self.current
    }

    pub fn current(&self) -> &MediaMetadata {
        &self.current
    }
}

/// One header line, exactly `width` characters wide
pub fn render_header(metadata: &MediaMetadata, width: usize) -> String {
    let indicator = if metadata.is_playing { "█" } else { "▌▌" };
    let line = format!(
        "♪ {}  ♫ {} · {}  [{}] {}",
        metadata.source_app,
        metadata.artist,
        metadata.title,
        indicator,
        metadata.status()
    );
    fit_to_width(&line, width)
}

/// Truncate with an ellipsis or pad with spaces to exactly `width` chars
fn fit_to_width(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len <= width {
        let mut out = text.to_string();
        out.extend(std::iter::repeat(' ').take(width - len));
        return out;
    }
    if width <= 3 {
        return text.chars().take(width).collect();
    }
    let mut out: String = text.chars().take(width - 3).collect();
    out.push_str("...");
    out
}
