use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::mailbox::{self, Receiver, RecvTimeoutError, Sender};
use crate::telemetry::{FpsMeter, LatencyMeter};
use crate::types::Size;

/// Clip-space corners of the quad, as a triangle strip:
/// top-left, bottom-left, top-right, bottom-right.
pub const QUAD_POSITIONS: [f32; 8] = [-1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0, -1.0];

/// Texture coordinates matching [`QUAD_POSITIONS`]; row 0 of the image is at
/// the top of the screen.
pub const QUAD_TEX_COORDS: [f32; 8] = [0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0];

pub const VERTEX_SHADER: &str = r#"
attribute vec2 aPosition;
attribute vec2 aTexCoord;
varying vec2 vTexCoord;
void main() {
    gl_Position = vec4(aPosition, 0.0, 1.0);
    vTexCoord = aTexCoord;
}
"#;

pub const FRAGMENT_SHADER: &str = r#"
precision mediump float;
varying vec2 vTexCoord;
uniform sampler2D uTexture;
void main() {
    float gray = texture2D(uTexture, vTexCoord).r;
    gl_FragColor = vec4(gray, gray, gray, 1.0);
}
"#;

/// A single-channel frame of exactly `width * height` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    size: Size,
    data: Vec<u8>,
    acquired_at: Option<Instant>,
}

impl DisplayFrame {
    /// A black frame of `size`.
    pub fn new(size: Size) -> Self {
        DisplayFrame {
            size,
            data: vec![0; size.pixel_count()],
            acquired_at: None,
        }
    }

    pub fn from_vec(data: Vec<u8>, size: Size) -> Result<Self> {
        if data.len() != size.pixel_count() {
            return Err(Error::BufferSize {
                expected: size.pixel_count(),
                actual: data.len(),
            });
        }
        Ok(DisplayFrame {
            size,
            data,
            acquired_at: None,
        })
    }

    /// Stamp the instant the source frame was acquired, for latency readout.
    pub fn with_acquired_at(mut self, at: Instant) -> Self {
        self.acquired_at = Some(at);
        self
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn acquired_at(&self) -> Option<Instant> {
        self.acquired_at
    }
}

/// Expand luminance to opaque RGBA8, the way the fragment shader shows it.
pub fn gray_to_rgba(gray: &[u8]) -> Vec<u8> {
    gray.iter().flat_map(|&g| [g, g, g, 255]).collect()
}

/// The GPU (or GPU-like) side of the presenter.
///
/// All calls happen on the presentation thread.
pub trait RenderBackend {
    /// Create the program, the static quad and a texture with linear
    /// filtering and clamp-to-edge wrapping.
    fn init(&mut self) -> Result<()>;

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Upload `data` as an 8-bit single-channel image of `size`.
    ///
    /// `reinit` is set when the size differs from the previous upload and the
    /// texture storage has to be respecified.
    fn upload_luminance(&mut self, size: Size, data: &[u8], reinit: bool) -> Result<()>;

    /// Clear to `clear_color` and draw the textured quad.
    fn draw_quad(&mut self, clear_color: [f32; 4]) -> Result<()>;

    /// Clear to `clear_color` without drawing (nothing submitted yet).
    fn clear(&mut self, clear_color: [f32; 4]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct PresenterConfig {
    pub clear_color: [f32; 4],
}

impl Default for PresenterConfig {
    fn default() -> Self {
        PresenterConfig {
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Producer handle for a [`Presenter`]. Cheap to clone, usable from any thread.
#[derive(Clone)]
pub struct FrameSubmitter {
    sender: Sender<DisplayFrame>,
}

impl FrameSubmitter {
    /// Copy `data` in as the next frame to present.
    pub fn submit(&self, data: &[u8], size: Size) -> Result<()> {
        self.submit_at(data, size, None)
    }

    /// Like [`submit`](Self::submit), stamping the source frame's acquisition time.
    ///
    /// A recycled buffer is reused when its size matches; otherwise a new
    /// buffer of exactly `width * height` bytes replaces it.
    pub fn submit_at(&self, data: &[u8], size: Size, acquired_at: Option<Instant>) -> Result<()> {
        let expected = size.pixel_count();
        if data.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: data.len(),
            });
        }

        self.sender.send_with(|reuse| {
            let mut frame = match reuse {
                Some(frame) if frame.size == size => frame,
                _ => DisplayFrame::new(size),
            };
            frame.data.copy_from_slice(data);
            frame.acquired_at = acquired_at;
            frame
        });
        Ok(())
    }

    /// Hand over an already built frame.
    pub fn submit_frame(&self, frame: DisplayFrame) -> Result<()> {
        if frame.data.len() != frame.size.pixel_count() {
            return Err(Error::BufferSize {
                expected: frame.size.pixel_count(),
                actual: frame.data.len(),
            });
        }
        self.sender.send(frame);
        Ok(())
    }

    /// Frames overwritten before the presenter drew them.
    pub fn dropped(&self) -> u64 {
        self.sender.dropped()
    }
}

/// Result of one [`Presenter::draw`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawOutcome {
    pub fps: f64,
    /// A frame was drawn (false until the first submit arrives).
    pub presented: bool,
    /// A newly submitted frame was picked up by this draw.
    pub fresh: bool,
    /// Acquisition-to-presentation time of a fresh, stamped frame.
    pub latency: Option<Duration>,
}

type FpsListener = Box<dyn FnMut(f64) + Send>;

/// Owns the render backend and the front buffer.
pub struct Presenter<B: RenderBackend> {
    backend: B,
    config: PresenterConfig,
    receiver: Receiver<DisplayFrame>,
    front: DisplayFrame,
    has_frame: bool,
    texture_size: Option<Size>,
    viewport: Size,
    fps: FpsMeter,
    latency: LatencyMeter,
    fps_listener: Option<FpsListener>,
    presented: u64,
}

impl<B: RenderBackend> Presenter<B> {
    pub fn new(mut backend: B, config: PresenterConfig) -> Result<Self> {
        backend.init()?;
        // Only minted submitters count as producers.
        let (_, receiver) = mailbox::mailbox();
        tracing::debug!("presenter initialised");
        Ok(Presenter {
            backend,
            config,
            receiver,
            front: DisplayFrame::new(Size::default()),
            has_frame: false,
            texture_size: None,
            viewport: Size::default(),
            fps: FpsMeter::new(),
            latency: LatencyMeter::new(),
            fps_listener: None,
            presented: 0,
        })
    }

    /// A producer handle feeding this presenter.
    pub fn submitter(&self) -> FrameSubmitter {
        FrameSubmitter {
            sender: self.receiver.sender(),
        }
    }

    /// Called with every FPS sample.
    pub fn on_fps<F>(&mut self, listener: F)
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.fps_listener = Some(Box::new(listener));
    }

    /// The display surface changed size. Only the viewport follows; the
    /// texture keeps the frame's own dimensions.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Size::new(width, height);
        self.backend.set_viewport(width, height);
        tracing::debug!(width, height, "viewport resized");
    }

    /// Block until a new frame is submitted or `timeout` passes.
    ///
    /// Fails with [`RecvTimeoutError::Disconnected`] once every submitter is
    /// gone and nothing is left to draw.
    pub fn wait_for_frame(&self, timeout: Duration) -> Result<(), RecvTimeoutError> {
        self.receiver.wait_timeout(timeout)
    }

    /// Present the newest complete frame.
    ///
    /// The newest published buffer is swapped into the front buffer under the
    /// mailbox lock, so a draw never sees a partially submitted frame.
    pub fn draw(&mut self) -> Result<DrawOutcome> {
        let fps = self.fps.tick();
        if let Some(listener) = self.fps_listener.as_mut() {
            listener(fps);
        }

        let fresh = self.receiver.try_recv_into(&mut self.front);
        if fresh {
            self.has_frame = true;
        }
        if !self.has_frame {
            self.backend.clear(self.config.clear_color)?;
            return Ok(DrawOutcome {
                fps,
                presented: false,
                fresh: false,
                latency: None,
            });
        }

        let size = self.front.size;
        let reinit = self.texture_size != Some(size);
        if reinit {
            tracing::info!(
                width = size.width,
                height = size.height,
                "frame size changed, reinitialising texture"
            );
        }
        if fresh || reinit {
            self.backend.upload_luminance(size, &self.front.data, reinit)?;
            self.texture_size = Some(size);
        }
        self.backend.draw_quad(self.config.clear_color)?;
        self.presented += 1;

        let latency = match (fresh, self.front.acquired_at) {
            (true, Some(at)) => Some(self.latency.record_since(at)),
            _ => None,
        };
        tracing::trace!(fps, fresh, "frame drawn");

        Ok(DrawOutcome {
            fps,
            presented: true,
            fresh,
            latency,
        })
    }

    /// The frame most recently swapped in for drawing.
    pub fn front(&self) -> Option<&DisplayFrame> {
        self.has_frame.then_some(&self.front)
    }

    pub fn fps(&self) -> f64 {
        self.fps.last()
    }

    pub fn latency(&self) -> &LatencyMeter {
        &self.latency
    }

    /// Number of draws that presented a frame.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn dropped(&self) -> u64 {
        self.receiver.dropped()
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
