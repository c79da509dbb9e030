/// Pixel layouts handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Three planes (Y, U, V) with 4:2:0 subsampling and arbitrary strides.
    Yuv420,
    /// Contiguous luma followed by interleaved V,U pairs.
    Nv21,
    /// Single-channel 8-bit luminance.
    Gray8,
}

/// Pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Size { width, height }
    }

    /// Number of pixels, i.e. the byte length of a single-channel frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Dimensions of the 4:2:0 chroma planes. Odd sizes are floored.
    pub fn chroma(&self) -> Size {
        Size {
            width: self.width / 2,
            height: self.height / 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Byte length of an NV21 frame: full luma plus one VU pair per chroma sample.
pub fn nv21_len(size: Size) -> usize {
    size.pixel_count() + size.chroma().pixel_count() * 2
}

/// A rational number (numerator / denominator).
///
/// Used to represent frame rates (e.g. 30000/1000 = 30 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ratio {
    pub numerator: u32,
    pub denominator: u32,
}

impl Ratio {
    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }
}

/// Configuration for opening a frame source.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub pixel_format: PixelFormat,
    pub size: Size,
    pub frame_rate: Ratio,
    /// Number of frame buffers the source may have in flight at once.
    pub buffer_count: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            pixel_format: PixelFormat::Yuv420,
            size: Size::new(1280, 720),
            frame_rate: Ratio {
                numerator: 30,
                denominator: 1,
            },
            buffer_count: 3,
        }
    }
}
