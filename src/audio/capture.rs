//! Live audio capture feeding fixed-size stereo blocks.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use tracing::{error, info, warn};

use super::pipeline::LatestSender;
use crate::error::{Error, Result};
use crate::params::AnalysisConfig;

/// Name fragments of devices that carry system playback rather than a mic
const LOOPBACK_HINTS: [&str; 4] = ["loopback", "stereo mix", "blackhole", "what u hear"];

/// Selection rank for a device name; lower wins, `None` means never pick it
fn device_rank(name: &str, hint: Option<&str>) -> Option<u8> {
    let lower = name.to_lowercase();
    if let Some(hint) = hint.filter(|h| !h.is_empty()) {
        if lower.contains(&hint.to_lowercase()) {
            return Some(0);
        }
    }
    // JACK bridges tend to hang when opened as plain inputs
    if lower.contains("jack") {
        return None;
    }
    if lower.contains("monitor") {
        return Some(1);
    }
    if LOOPBACK_HINTS.iter().any(|h| lower.contains(h)) {
        return Some(2);
    }
    None
}

/// Index of the best-ranked name, first match breaking ties
pub fn pick_device(names: &[String], hint: Option<&str>) -> Option<usize> {
    names
        .iter()
        .enumerate()
        .filter_map(|(i, name)| device_rank(name, hint).map(|rank| (rank, i)))
        .min()
        .map(|(_, i)| i)
}

/// Names of every input device on the default host
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| Error::Device(e.to_string()))?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "Unknown Device".to_string()))
        .collect())
}

/// Collects interleaved frames into stereo blocks of a fixed length
pub struct BlockAccumulator {
    pending: Vec<f32>,
    block_len: usize,
    source_channels: usize,
}

impl BlockAccumulator {
    pub fn new(block_len: usize, source_channels: usize) -> Self {
        Self {
            pending: Vec::with_capacity(block_len),
            block_len,
            source_channels: source_channels.max(1),
        }
    }

    /// Append source frames, calling `emit` for each completed block.
    ///
    /// Mono frames are duplicated into both channels; channels past the
    /// second are ignored.
    pub fn push<I, F>(&mut self, samples: I, mut emit: F)
    where
        I: IntoIterator<Item = f32>,
        F: FnMut(Vec<f32>),
    {
        if self.block_len == 0 {
            return;
        }
        for (i, sample) in samples.into_iter().enumerate() {
            match i % self.source_channels {
                0 => {
                    self.append(sample, &mut emit);
                    if self.source_channels == 1 {
                        self.append(sample, &mut emit);
                    }
                }
                1 => self.append(sample, &mut emit),
                _ => {}
            }
        }
    }

    /// Blocks are cut after every sample so odd block lengths stay exact
    fn append<F>(&mut self, sample: f32, emit: &mut F)
    where
        F: FnMut(Vec<f32>),
    {
        self.pending.push(sample);
        if self.pending.len() == self.block_len {
            let block = std::mem::replace(&mut self.pending, Vec::with_capacity(self.block_len));
            emit(block);
        }
    }

    /// Samples waiting for the next block
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Running cpal input stream; capture stops when dropped
pub struct CaptureStream {
    _stream: cpal::Stream,
    device_name: String,
    sample_rate_hz: u32,
    channels: u16,
}

impl CaptureStream {
    /// Open the preferred input device and start pushing blocks of
    /// `config.block_len` interleaved stereo samples into `blocks`
    pub fn open(
        device_hint: Option<&str>,
        config: &AnalysisConfig,
        blocks: LatestSender<Vec<f32>>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = select_device(&host, device_hint)?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());

        let (stream_config, format) = choose_config(&device, config.sample_rate_hz)?;
        let sample_rate_hz = stream_config.sample_rate.0;
        let channels = stream_config.channels;

        info!(
            device = %device_name,
            sample_rate_hz,
            channels,
            ?format,
            "opening capture stream"
        );

        let accumulator = BlockAccumulator::new(config.block_len, channels as usize);
        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, accumulator, blocks)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, accumulator, blocks)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, accumulator, blocks)?,
            other => {
                return Err(Error::Device(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| Error::Stream(format!("failed to start capture: {}", e)))?;

        Ok(Self {
            _stream: stream,
            device_name,
            sample_rate_hz,
            channels,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Rate the device actually runs at
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Channels delivered by the device before stereo conversion
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn select_device(host: &cpal::Host, hint: Option<&str>) -> Result<Device> {
    let devices: Vec<Device> = host
        .input_devices()
        .map_err(|e| Error::Device(e.to_string()))?
        .collect();
    let names: Vec<String> = devices
        .iter()
        .map(|d| d.name().unwrap_or_default())
        .collect();

    if let Some(index) = pick_device(&names, hint) {
        info!(device = %names[index], "selected capture device");
        return devices
            .into_iter()
            .nth(index)
            .ok_or(Error::NoInputDevice);
    }

    if let Some(hint) = hint {
        warn!(hint, "no input device matches hint");
    }
    let device = host.default_input_device().ok_or(Error::NoInputDevice)?;
    warn!(
        device = %device.name().unwrap_or_default(),
        "using default input device; may not capture system audio"
    );
    Ok(device)
}

/// Prefer a config running at `target_hz`, else the device default
fn choose_config(device: &Device, target_hz: u32) -> Result<(StreamConfig, SampleFormat)> {
    let target = cpal::SampleRate(target_hz);
    if let Ok(mut ranges) = device.supported_input_configs() {
        if let Some(range) =
            ranges.find(|r| r.min_sample_rate() <= target && target <= r.max_sample_rate())
        {
            let supported = range.with_sample_rate(target);
            return Ok((supported.config(), supported.sample_format()));
        }
    }

    let supported = device
        .default_input_config()
        .map_err(|e| Error::Device(format!("failed to get input config: {}", e)))?;
    warn!(
        requested = target_hz,
        actual = supported.sample_rate().0,
        "device cannot run at requested rate"
    );
    Ok((supported.config(), supported.sample_format()))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut accumulator: BlockAccumulator,
    blocks: LatestSender<Vec<f32>>,
) -> Result<cpal::Stream>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples = data.iter().map(|&s| f32::from_sample(s));
                accumulator.push(samples, |block| {
                    blocks.send(block);
                });
            },
            |err| error!(%err, "capture stream error"),
            None,
        )
        .map_err(|e| Error::Stream(format!("failed to build capture stream: {}", e)))
}
