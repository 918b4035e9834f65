//! Analysis thread and latest-wins channels.
//!
//! Capture, analysis and rendering run on independent schedules. Every hop
//! between them is a bounded channel where a full queue drops its oldest
//! entry, so producers never block and consumers always see fresh input.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use tracing::{debug, info, info_span};

use super::analyzer::{AnalysisFrame, SpectralAnalyzer};
use crate::error::Result;

/// Default queue depth between pipeline stages
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Send `item`, evicting queued backlog through `evict` while the channel
/// is full. Returns false only once every receiver is gone.
pub fn push_latest<T>(tx: &Sender<T>, evict: &Receiver<T>, item: T) -> bool {
    let mut item = item;
    loop {
        match tx.try_send(item) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                let _ = evict.try_recv();
                item = back;
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}

/// Producer half of a bounded latest-wins channel
pub struct LatestSender<T> {
    tx: Sender<T>,
    evict: Receiver<T>,
}

impl<T> LatestSender<T> {
    /// Enqueue `item`, dropping the oldest queued entry if full
    pub fn send(&self, item: T) -> bool {
        push_latest(&self.tx, &self.evict, item)
    }
}

impl<T> Clone for LatestSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            evict: self.evict.clone(),
        }
    }
}

/// Bounded channel whose sender never blocks
///
/// The receiver reports disconnection once every [`LatestSender`] is
/// dropped, which is how producers signal end-of-stream.
pub fn latest_channel<T>(capacity: usize) -> (LatestSender<T>, Receiver<T>) {
    let (tx, rx) = bounded(capacity.max(1));
    let sender = LatestSender {
        tx,
        evict: rx.clone(),
    };
    (sender, rx)
}

/// Background thread running the analyzer over incoming blocks
pub struct AnalysisPipeline {
    frames: Receiver<AnalysisFrame>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<u64>>,
}

impl AnalysisPipeline {
    /// Start analysing `blocks` until the channel closes or [`stop`](Self::stop)
    pub fn spawn(
        mut analyzer: SpectralAnalyzer,
        blocks: Receiver<Vec<f32>>,
        queue_depth: usize,
    ) -> Result<Self> {
        let (frame_tx, frames) = latest_channel(queue_depth);
        let (stop, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("analysis".to_string())
            .spawn(move || {
                let span = info_span!("analysis_loop");
                let _enter = span.enter();
                info!("analysis loop started");

                let mut analysed = 0u64;
                loop {
                    select! {
                        recv(blocks) -> block => match block {
                            Ok(block) => {
                                let frame = analyzer.process(&block);
                                analysed += 1;
                                frame_tx.send(frame);
                            }
                            Err(_) => {
                                debug!("sample block channel closed");
                                break;
                            }
                        },
                        recv(stop_rx) -> _ => break,
                    }
                }

                info!(analysed, "analysis loop stopped");
                analysed
            })?;

        Ok(Self {
            frames,
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Receiver of analysis results (freshest first to arrive last)
    pub fn frames(&self) -> &Receiver<AnalysisFrame> {
        &self.frames
    }

    /// Drain everything queued and return only the newest frame
    pub fn latest(&self) -> Option<AnalysisFrame> {
        self.frames.try_iter().last()
    }

    /// Signal the loop to exit and wait for it; returns blocks analysed
    pub fn stop(&mut self) -> u64 {
        // Dropping the sender wakes the select with a disconnect
        self.stop.take();
        self.handle
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or(0)
    }
}

impl Drop for AnalysisPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AnalysisConfig;
    use std::time::Duration;

    #[test]
    fn test_push_latest_evicts_oldest() {
        let (tx, rx) = latest_channel(2);
        for i in 0..5 {
            assert!(tx.send(i));
        }
        let queued: Vec<i32> = rx.try_iter().collect();
        assert_eq!(queued, vec![3, 4]);
    }

    #[test]
    fn test_sender_drop_closes_channel() {
        let (tx, rx) = latest_channel::<u8>(4);
        tx.send(1);
        drop(tx);
        assert_eq!(rx.recv().ok(), Some(1));
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_pipeline_stops_on_input_close() {
        let config = AnalysisConfig::default();
        let analyzer = SpectralAnalyzer::new(config.clone()).unwrap();
        let (block_tx, block_rx) = latest_channel(DEFAULT_QUEUE_DEPTH);
        let mut pipeline = AnalysisPipeline::spawn(analyzer, block_rx, 4).unwrap();

        for _ in 0..3 {
            block_tx.send(vec![0.0; config.block_len]);
        }
        let frame = pipeline
            .frames()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(frame.chaos, 0.0);

        drop(block_tx);
        assert_eq!(pipeline.stop(), 3);
    }

    #[test]
    fn test_pipeline_stop_signal() {
        let analyzer = SpectralAnalyzer::new(AnalysisConfig::default()).unwrap();
        let (_block_tx, block_rx) = latest_channel::<Vec<f32>>(2);
        let mut pipeline = AnalysisPipeline::spawn(analyzer, block_rx, 2).unwrap();
        assert_eq!(pipeline.stop(), 0);
        assert!(pipeline.latest().is_none());
    }
}
