use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::{Error, PlatformError};
use crate::frame::{Frame, Plane, Planes, RawFrame};
use crate::pool::{FramePool, PooledBuffer};
use crate::stream::CameraStream;
use crate::types::{PixelFormat, Size, StreamConfig};

/// Byte written into row padding and between chroma samples.
pub const PADDING_BYTE: u8 = 0xEE;

/// Memory layout of the generated planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticLayout {
    /// Extra bytes at the end of each luma row.
    pub luma_padding: usize,
    /// Extra bytes at the end of each chroma row.
    pub chroma_padding: usize,
    /// 1 for planar (I420-like) chroma, 2 for semi-planar (NV12/NV21-like).
    pub chroma_pixel_stride: usize,
}

impl Default for SyntheticLayout {
    fn default() -> Self {
        SyntheticLayout {
            luma_padding: 0,
            chroma_padding: 0,
            chroma_pixel_stride: 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Geometry {
    size: Size,
    luma_stride: usize,
    luma_len: usize,
    chroma_row_stride: usize,
    chroma_pixel_stride: usize,
    chroma_len: usize,
}

impl Geometry {
    fn new(size: Size, layout: SyntheticLayout) -> Self {
        let pix = layout.chroma_pixel_stride.max(1);
        let chroma = size.chroma();
        let luma_stride = size.width as usize + layout.luma_padding;
        let chroma_row_stride = chroma.width as usize * pix + layout.chroma_padding;
        Geometry {
            size,
            luma_stride,
            luma_len: luma_stride * size.height as usize,
            chroma_row_stride,
            chroma_pixel_stride: pix,
            chroma_len: chroma_row_stride * chroma.height as usize,
        }
    }

    fn buffer_len(&self) -> usize {
        self.luma_len + 2 * self.chroma_len
    }

    /// Write frame `index` of the pattern into `buf` (Y, then U, then V).
    fn render(&self, index: u64, buf: &mut [u8]) {
        buf.fill(PADDING_BYTE);
        let t = index as usize;
        let (w, h) = (self.size.width as usize, self.size.height as usize);
        let (luma, chroma) = buf.split_at_mut(self.luma_len);
        for y in 0..h {
            for x in 0..w {
                luma[y * self.luma_stride + x] = luma_value(x, y, t);
            }
        }

        let (u_plane, v_plane) = chroma.split_at_mut(self.chroma_len);
        let c = self.size.chroma();
        for row in 0..c.height as usize {
            for col in 0..c.width as usize {
                let i = row * self.chroma_row_stride + col * self.chroma_pixel_stride;
                u_plane[i] = (col * 4 + t) as u8;
                v_plane[i] = (row * 4 + 2 * t) as u8;
            }
        }
    }
}

/// Luma of the test pattern: a diagonal ramp that scrolls one step per frame.
pub fn luma_value(x: usize, y: usize, frame_index: usize) -> u8 {
    (x + 2 * y + 3 * frame_index) as u8
}

/// A pooled frame produced by [`SyntheticCamera`].
pub struct SyntheticFrame {
    buffer: PooledBuffer,
    geometry: Geometry,
    index: u64,
    timestamp: Duration,
}

impl SyntheticFrame {
    pub fn index(&self) -> u64 {
        self.index
    }
}

impl Frame for SyntheticFrame {
    type Timestamp = Duration;

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Yuv420
    }

    fn size(&self) -> Size {
        self.geometry.size
    }

    fn planes(&self) -> Planes<'_> {
        let g = &self.geometry;
        let (luma, chroma) = self.buffer.split_at(g.luma_len);
        let (u, v) = chroma.split_at(g.chroma_len);
        let mut planes = Planes::new();
        planes.push(Plane::packed(luma, g.luma_stride));
        for data in [u, v] {
            planes.push(Plane {
                data,
                row_stride: g.chroma_row_stride,
                pixel_stride: g.chroma_pixel_stride,
            });
        }
        planes
    }

    fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

/// Counters shared with the capture thread.
#[derive(Debug, Default)]
pub struct SyntheticStats {
    delivered: AtomicU64,
    starved: AtomicU64,
}

impl SyntheticStats {
    /// Frames handed to the callback.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Captures skipped because every pool buffer was still held downstream.
    pub fn starved(&self) -> u64 {
        self.starved.load(Ordering::Relaxed)
    }
}

/// Test-pattern frame source running on its own thread.
pub struct SyntheticCamera {
    config: StreamConfig,
    geometry: Geometry,
    pool: FramePool,
    stats: Arc<SyntheticStats>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SyntheticCamera {
    pub fn new(config: StreamConfig, layout: SyntheticLayout) -> Result<Self, Error> {
        if config.pixel_format != PixelFormat::Yuv420 {
            return Err(Error::UnsupportedFormat);
        }
        let geometry = Geometry::new(config.size, layout);
        let pool = FramePool::new(geometry.buffer_len(), config.buffer_count.max(1));
        Ok(SyntheticCamera {
            config,
            geometry,
            pool,
            stats: Arc::new(SyntheticStats::default()),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }

    /// Render frame `index` into an owned frame, without a thread or pool.
    pub fn render_frame(&self, index: u64) -> RawFrame {
        let g = &self.geometry;
        let mut buf = vec![0; g.buffer_len()];
        g.render(index, &mut buf);
        let chroma = buf.split_off(g.luma_len);
        let (u, v) = chroma.split_at(g.chroma_len);
        RawFrame {
            size: g.size,
            luma: buf,
            luma_stride: g.luma_stride,
            u: u.to_vec(),
            v: v.to_vec(),
            chroma_row_stride: g.chroma_row_stride,
            chroma_pixel_stride: g.chroma_pixel_stride,
            timestamp: self.frame_interval() * index as u32,
        }
    }

    /// Take a pool buffer and render frame `index` into it.
    ///
    /// Returns `None` when the pool is exhausted.
    pub fn capture(&self, index: u64) -> Option<SyntheticFrame> {
        capture(&self.pool, &self.geometry, index, self.frame_interval())
    }

    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    pub fn stats(&self) -> &SyntheticStats {
        &self.stats
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn frame_interval(&self) -> Duration {
        let fps = self.config.frame_rate.as_f64();
        if fps > 0.0 {
            Duration::from_secs_f64(1.0 / fps)
        } else {
            Duration::from_millis(33)
        }
    }
}

fn capture(
    pool: &FramePool,
    geometry: &Geometry,
    index: u64,
    interval: Duration,
) -> Option<SyntheticFrame> {
    let mut buffer = pool.try_acquire()?;
    geometry.render(index, &mut buffer);
    Some(SyntheticFrame {
        buffer,
        geometry: *geometry,
        index,
        timestamp: interval * index as u32,
    })
}

impl CameraStream for SyntheticCamera {
    type Frame = SyntheticFrame;
    type Error = Error;

    fn start<F>(&mut self, mut callback: F) -> Result<(), Self::Error>
    where
        F: FnMut(Self::Frame) + Send + 'static,
    {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyStarted);
        }

        let pool = self.pool.clone();
        let geometry = self.geometry;
        let interval = self.frame_interval();
        let running = Arc::clone(&self.running);
        let stats = Arc::clone(&self.stats);

        let worker = std::thread::Builder::new()
            .name("edge-view.synthetic".into())
            .spawn(move || {
                let started = Instant::now();
                let mut index = 0u64;
                while running.load(Ordering::Acquire) {
                    match capture(&pool, &geometry, index, interval) {
                        Some(frame) => {
                            stats.delivered.fetch_add(1, Ordering::Relaxed);
                            callback(frame);
                        }
                        None => {
                            stats.starved.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(index, "all frame buffers in use, capture skipped");
                        }
                    }
                    index += 1;
                    let next = started + interval * index as u32;
                    if let Some(wait) = next.checked_duration_since(Instant::now()) {
                        std::thread::sleep(wait);
                    }
                }
                tracing::debug!(frames = index, "synthetic capture loop finished");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                Error::Platform(PlatformError::Message(format!(
                    "failed to spawn capture thread: {e}"
                )))
            })?;

        self.worker = Some(worker);
        tracing::info!(
            width = self.config.size.width,
            height = self.config.size.height,
            fps = self.config.frame_rate.as_f64(),
            buffers = self.pool.capacity(),
            "synthetic camera started"
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Err(Error::NotStarted);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                return Err(Error::Platform(PlatformError::Message(
                    "capture thread panicked".into(),
                )));
            }
        }
        tracing::info!(delivered = self.stats.delivered(), "synthetic camera stopped");
        Ok(())
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}
