use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use crate::edges::CannyEdges;
use crate::error::Result;
use crate::frame::Frame;
use crate::presenter::FrameSubmitter;
use crate::process::FrameProcessor;
use crate::reassemble;
use crate::stream::CameraStream;
use crate::telemetry::LatencyMeter;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Start in processed (edge) mode rather than pass-through.
    pub show_edges: bool,
    /// Hysteresis thresholds for the built-in edge detector.
    pub low_threshold: u16,
    pub high_threshold: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            show_edges: true,
            low_threshold: 80,
            high_threshold: 150,
        }
    }
}

/// Processed vs. pass-through switch, shared with the UI.
#[derive(Debug, Clone)]
pub struct EdgeToggle(Arc<AtomicBool>);

impl EdgeToggle {
    pub fn new(show_edges: bool) -> Self {
        EdgeToggle(Arc::new(AtomicBool::new(show_edges)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, show_edges: bool) {
        self.0.store(show_edges, Ordering::Relaxed);
    }

    /// Flip the mode and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineStats {
    /// Frames that went through the processor.
    pub processed: u64,
    /// Frames shown as plain luma.
    pub passed_through: u64,
    /// Frames dropped because their geometry was invalid.
    pub rejected: u64,
    /// Acquisition-to-handoff time of the last frame.
    pub last_frame_ms: f64,
}

pub struct Pipeline {
    processor: Box<dyn FrameProcessor>,
    toggle: EdgeToggle,
    submitter: FrameSubmitter,
    nv21: Vec<u8>,
    output: Vec<u8>,
    frame_time: LatencyMeter,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        processor: Box<dyn FrameProcessor>,
        submitter: FrameSubmitter,
    ) -> Self {
        tracing::debug!(
            processor = processor.name(),
            show_edges = config.show_edges,
            "pipeline created"
        );
        Pipeline {
            processor,
            toggle: EdgeToggle::new(config.show_edges),
            submitter,
            nv21: Vec::new(),
            output: Vec::new(),
            frame_time: LatencyMeter::new(),
            stats: PipelineStats::default(),
        }
    }

    /// A pipeline using the built-in Canny detector with the configured thresholds.
    pub fn with_canny(config: &PipelineConfig, submitter: FrameSubmitter) -> Self {
        let edges = CannyEdges::new(config.low_threshold, config.high_threshold);
        Pipeline::new(config, Box::new(edges), submitter)
    }

    pub fn toggle(&self) -> EdgeToggle {
        self.toggle.clone()
    }

    /// Process one raw frame and hand the result to the presenter.
    ///
    /// The frame is consumed and released as soon as it has been reassembled,
    /// whether or not reassembly succeeded.
    pub fn handle_frame<F: Frame>(&mut self, frame: F) -> Result<()> {
        let acquired_at = Instant::now();
        let size = frame.size();
        let reassembled = reassemble::yuv420_to_nv21(&frame, &mut self.nv21);
        drop(frame);

        if let Err(e) = reassembled {
            self.stats.rejected += 1;
            tracing::warn!(
                width = size.width,
                height = size.height,
                error = %e,
                "dropping frame"
            );
            return Err(e);
        }

        let pixels = size.pixel_count();
        self.output.resize(pixels, 0);
        let show_edges = self.toggle.get();
        if show_edges {
            self.output.fill(0);
            self.processor.process(&self.nv21, size, &mut self.output);
            self.stats.processed += 1;
        } else {
            self.output.copy_from_slice(&self.nv21[..pixels]);
            self.stats.passed_through += 1;
        }

        self.submitter
            .submit_at(&self.output, size, Some(acquired_at))?;

        let elapsed = self.frame_time.record_since(acquired_at);
        self.stats.last_frame_ms = elapsed.as_secs_f64() * 1000.0;
        tracing::trace!(
            width = size.width,
            height = size.height,
            show_edges,
            frame_ms = self.stats.last_frame_ms,
            "frame handed to presenter"
        );
        Ok(())
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Start `stream` with this pipeline as its frame callback.
    ///
    /// Per-frame errors are logged and the stream keeps running. The returned
    /// handle gives access to stats while frames flow.
    pub fn attach<S: CameraStream>(
        self,
        stream: &mut S,
    ) -> core::result::Result<Arc<Mutex<Pipeline>>, S::Error> {
        let shared = Arc::new(Mutex::new(self));
        let worker = Arc::clone(&shared);
        stream.start(move |frame| {
            // Already logged inside handle_frame.
            let _ = worker.lock().handle_frame(frame);
        })?;
        Ok(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_and_reports_new_state() {
        let t = EdgeToggle::new(true);
        assert!(!t.toggle());
        assert!(!t.get());
        assert!(t.toggle());
        t.set(false);
        assert!(!t.get());
    }

    #[test]
    fn clones_share_state() {
        let a = EdgeToggle::new(false);
        let b = a.clone();
        b.set(true);
        assert!(a.get());
    }

    #[test]
    fn default_config_matches_native_thresholds() {
        let c = PipelineConfig::default();
        assert!(c.show_edges);
        assert_eq!((c.low_threshold, c.high_threshold), (80, 150));
    }
}
