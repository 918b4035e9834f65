//! Terminal host: owns the screen, the audio pipeline and the redraw loop.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Print, ResetColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use tracing::{info, warn};

use plasmaterm::audio::{
    latest_channel, AnalysisPipeline, CaptureStream, SpectralAnalyzer, DEFAULT_QUEUE_DEPTH,
};
use plasmaterm::cache::PerformanceCache;
use plasmaterm::metadata::{render_header, NoMetadata, ThrottledMetadata};
use plasmaterm::params::{AnalysisConfig, RenderConfig};
use plasmaterm::render::RenderEngine;

use crate::cli::Args;

/// Frame size used when no terminal is attached
const HEADLESS_SIZE: (usize, usize) = (80, 24);

/// Header and footer rows around the visualizer
const CHROME_ROWS: usize = 2;

/// Capture stream plus the analysis thread fed by it
struct Audio {
    _capture: Option<CaptureStream>,
    pipeline: AnalysisPipeline,
}

impl Audio {
    /// Start capture; a missing device leaves the visualizer running on silence
    fn start(device_hint: Option<&str>, config: AnalysisConfig) -> Result<Self> {
        let (blocks_tx, blocks_rx) = latest_channel(DEFAULT_QUEUE_DEPTH);

        let capture = match CaptureStream::open(device_hint, &config, blocks_tx) {
            Ok(capture) => Some(capture),
            Err(err) => {
                warn!(%err, "audio capture unavailable; visualizing silence");
                None
            }
        };

        // Analyse at whatever rate the device actually delivers
        let config = AnalysisConfig {
            sample_rate_hz: capture
                .as_ref()
                .map_or(config.sample_rate_hz, CaptureStream::sample_rate_hz),
            ..config
        };
        let analyzer = SpectralAnalyzer::new(config).context("Invalid analysis config")?;
        let pipeline = AnalysisPipeline::spawn(analyzer, blocks_rx, DEFAULT_QUEUE_DEPTH)
            .context("Failed to start analysis thread")?;

        Ok(Self {
            _capture: capture,
            pipeline,
        })
    }
}

/// Restores the terminal on drop, including during unwinding
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, DisableLineWrap, cursor::Hide)
            .context("Failed to enter alternate screen")?;
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = terminal::disable_raw_mode();
    let _ = execute!(
        io::stdout(),
        ResetColor,
        cursor::Show,
        EnableLineWrap,
        LeaveAlternateScreen
    );
}

/// Make panics leave a usable terminal before printing their message
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        previous(info);
    }));
}

fn build_engine(config: &RenderConfig) -> RenderEngine {
    RenderEngine::with_seed(config, Arc::new(PerformanceCache::new()))
}

/// Interactive full-screen visualizer
pub fn run(args: &Args) -> Result<()> {
    let render_config = args.render_config();
    render_config.validate()?;

    let audio = Audio::start(args.device_hint(), args.analysis_config())?;
    let mut engine = build_engine(&render_config);
    let mut metadata = ThrottledMetadata::new(NoMetadata);

    install_panic_hook();
    let _guard = TerminalGuard::enter()?;
    let mut out = io::stdout();

    let (cols, rows) = terminal::size().context("Failed to query terminal size")?;
    let mut size = (cols as usize, rows as usize);
    let interval = render_config.frame_interval();

    let mut last_tick = Instant::now();
    let mut fps = render_config.fps as f32;
    info!(width = size.0, height = size.1, "entering render loop");

    'frames: loop {
        let tick_start = Instant::now();

        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break 'frames,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        break 'frames
                    }
                    KeyCode::Char(' ') => {
                        let next = engine.palette().next();
                        engine.set_palette(next);
                    }
                    _ => {}
                },
                Event::Resize(cols, rows) => {
                    size = (cols as usize, rows as usize);
                    queue!(out, Clear(ClearType::All))?;
                }
                _ => {}
            }
        }

        if let Some(frame) = audio.pipeline.latest() {
            engine.update(&frame);
        }

        let dt = tick_start.duration_since(last_tick).as_secs_f64();
        last_tick = tick_start;
        engine.advance(dt);
        if dt > 0.0 {
            fps = fps * 0.9 + (1.0 / dt as f32) * 0.1;
        }

        let (width, height) = size;
        let header = render_header(metadata.poll(), width);
        let footer = footer_line(&engine, fps, width);
        let visual = engine.render(width, height.saturating_sub(CHROME_ROWS));

        queue!(out, BeginSynchronizedUpdate, cursor::MoveTo(0, 0), Print(&header))?;
        for (row, line) in visual.split('\n').enumerate() {
            queue!(out, cursor::MoveTo(0, (row + 1) as u16), Print(line))?;
        }
        if height > 1 {
            queue!(out, cursor::MoveTo(0, (height - 1) as u16), Print(&footer))?;
        }
        queue!(out, ResetColor, EndSynchronizedUpdate)?;
        out.flush()?;

        if let Some(rest) = interval.checked_sub(tick_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    engine.close();
    Ok(())
}

/// Render `frames` ticks off-screen and print the last frame
pub fn run_headless(args: &Args, frames: u32) -> Result<()> {
    let render_config = args.render_config();
    render_config.validate()?;

    let audio = Audio::start(args.device_hint(), args.analysis_config())?;
    let mut engine = build_engine(&render_config);
    let mut metadata = ThrottledMetadata::new(NoMetadata);
    let (width, height) = HEADLESS_SIZE;

    let ticks = frames.max(1);
    for tick in 0..ticks {
        if let Some(frame) = audio.pipeline.latest() {
            engine.update(&frame);
        }
        engine.advance(render_config.tick_seconds());
        if tick + 1 < ticks {
            engine.render(width, height - CHROME_ROWS);
        }
    }

    let header = render_header(metadata.poll(), width);
    let footer = footer_line(&engine, render_config.fps as f32, width);
    let visual = engine.render(width, height - CHROME_ROWS);
    info!(frames = ticks, "headless run complete");

    let mut out = io::stdout().lock();
    writeln!(out, "{}", header)?;
    writeln!(out, "{}", visual)?;
    writeln!(out, "{}", footer)?;
    out.flush()?;

    engine.close();
    Ok(())
}

/// Footer padded to exactly `width` chars so a shorter line overwrites
/// the previous one
fn footer_line(engine: &RenderEngine, fps: f32, width: usize) -> String {
    let text = format!(
        " q quit · space palette · {:.0} fps · {} · {}",
        fps,
        engine.palette(),
        engine.strategy()
    );
    format!("{text:<width$}").chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footer_fills_width() {
        let engine = build_engine(&RenderConfig::default());
        for width in [0, 10, 80, 200] {
            let fast = footer_line(&engine, 100.0, width);
            let slow = footer_line(&engine, 9.0, width);
            assert_eq!(fast.chars().count(), width);
            assert_eq!(slow.chars().count(), width);
        }
        assert!(footer_line(&engine, 9.0, 80).ends_with("  "));
    }
}
