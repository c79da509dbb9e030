use core::time::Duration;

use arrayvec::ArrayVec;

use crate::types::{PixelFormat, Size};

/// A single plane of image data.
///
/// `row_stride` is the byte distance between the starts of consecutive rows
/// and `pixel_stride` the distance between consecutive samples in a row.
/// Either may exceed the logical dimension because of hardware alignment.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl<'a> Plane<'a> {
    /// A tightly packed plane with one byte per sample.
    pub fn packed(data: &'a [u8], row_stride: usize) -> Self {
        Plane {
            data,
            row_stride,
            pixel_stride: 1,
        }
    }
}

/// Maximum number of planes a frame can carry.
pub const MAX_PLANES: usize = 3;

/// Plane views of a frame, built on demand without allocating.
pub type Planes<'a> = ArrayVec<Plane<'a>, MAX_PLANES>;

/// Capture time of a frame.
pub trait Timestamp {
    fn as_secs_f64(&self) -> f64;
}

impl Timestamp for Duration {
    fn as_secs_f64(&self) -> f64 {
        Duration::as_secs_f64(self)
    }
}

/// A raw video frame handed out by a frame source.
///
/// For [`PixelFormat::Yuv420`] the planes are ordered Y, U, V. The frame owns
/// (or borrows) the source's buffer until it is dropped; dropping it is what
/// returns the buffer to the source.
pub trait Frame {
    type Timestamp: Timestamp;

    fn pixel_format(&self) -> PixelFormat;
    fn size(&self) -> Size;
    fn planes(&self) -> Planes<'_>;
    fn timestamp(&self) -> Self::Timestamp;
}

/// An owned three-plane YUV 4:2:0 frame.
///
/// Useful when a caller has to copy a frame out of a source that recycles
/// its buffers, and for building frames with unusual strides in tests.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub size: Size,
    pub luma: Vec<u8>,
    pub luma_stride: usize,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
    pub chroma_row_stride: usize,
    pub chroma_pixel_stride: usize,
    pub timestamp: Duration,
}

impl Frame for RawFrame {
    type Timestamp = Duration;

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Yuv420
    }

    fn size(&self) -> Size {
        self.size
    }

    fn planes(&self) -> Planes<'_> {
        let mut planes = Planes::new();
        planes.push(Plane::packed(&self.luma, self.luma_stride));
        for data in [&self.u, &self.v] {
            planes.push(Plane {
                data,
                row_stride: self.chroma_row_stride,
                pixel_stride: self.chroma_pixel_stride,
            });
        }
        planes
    }

    fn timestamp(&self) -> Duration {
        self.timestamp
    }
}
