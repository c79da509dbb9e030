use crate::error::{Error, GeometryError, PlaneKind, Result};
use crate::frame::{Frame, Plane};
use crate::types::{PixelFormat, Size, nv21_len};

/// Reassemble `frame` into `out` as NV21.
///
/// `out` is resized to exactly [`nv21_len`] bytes and every byte is
/// overwritten, so one buffer can be reused across frames. The frame's
/// geometry is checked before anything is written: a stride or buffer size
/// that would make the copy run past the end of a plane is reported as
/// [`Error::Geometry`] and `out` is left untouched.
///
/// The U plane's row and pixel strides are used for both chroma planes. Odd
/// widths or heights floor the chroma grid.
pub fn yuv420_to_nv21<F: Frame + ?Sized>(frame: &F, out: &mut Vec<u8>) -> Result<()> {
    if frame.pixel_format() != PixelFormat::Yuv420 {
        return Err(Error::UnsupportedFormat);
    }

    let size = frame.size();
    let planes = frame.planes();
    check_geometry(size, &planes)?;

    let (y, u, v) = (&planes[0], &planes[1], &planes[2]);
    let width = size.width as usize;
    let height = size.height as usize;
    let luma_len = size.pixel_count();

    out.resize(nv21_len(size), 0);
    let (luma_out, chroma_out) = out.split_at_mut(luma_len);

    if y.row_stride == width {
        luma_out.copy_from_slice(&y.data[..luma_len]);
    } else {
        for (row, dst) in luma_out.chunks_exact_mut(width).enumerate() {
            let start = row * y.row_stride;
            dst.copy_from_slice(&y.data[start..start + width]);
        }
    }

    let chroma = size.chroma();
    let (cw, ch) = (chroma.width as usize, chroma.height as usize);
    if cw == 0 || ch == 0 {
        return Ok(());
    }

    let mut pairs = chroma_out.chunks_exact_mut(2);
    for row in 0..ch {
        let base = row * u.row_stride;
        for col in 0..cw {
            let idx = base + col * u.pixel_stride;
            if let Some(pair) = pairs.next() {
                pair[0] = v.data[idx];
                pair[1] = u.data[idx];
            }
        }
    }

    tracing::trace!(
        width,
        height,
        luma_stride = y.row_stride,
        chroma_row_stride = u.row_stride,
        chroma_pixel_stride = u.pixel_stride,
        "reassembled frame"
    );
    Ok(())
}

/// Allocate a fresh NV21 buffer for `frame`.
pub fn to_nv21<F: Frame + ?Sized>(frame: &F) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(nv21_len(frame.size()));
    yuv420_to_nv21(frame, &mut out)?;
    Ok(out)
}

/// The luma plane of an NV21 buffer.
///
/// Returns `None` if `nv21` is too short for `size`.
pub fn luma(nv21: &[u8], size: Size) -> Option<&[u8]> {
    nv21.get(..size.pixel_count())
}

/// Verify that every offset the copy will compute lies inside its plane.
pub fn check_geometry(size: Size, planes: &[Plane<'_>]) -> Result<(), GeometryError> {
    if size.is_empty() {
        return Err(GeometryError::EmptyFrame);
    }
    if planes.len() != 3 {
        return Err(GeometryError::MissingPlanes {
            found: planes.len(),
        });
    }

    let width = size.width as usize;
    let height = size.height as usize;
    let y = &planes[0];
    if y.pixel_stride != 1 {
        return Err(GeometryError::LumaPixelStride {
            stride: y.pixel_stride,
        });
    }
    if y.row_stride < width {
        return Err(GeometryError::StrideTooSmall {
            plane: PlaneKind::Luma,
            stride: y.row_stride,
            min: width,
        });
    }
    let required = (height - 1)
        .checked_mul(y.row_stride)
        .and_then(|n| n.checked_add(width))
        .ok_or(GeometryError::StrideOverflow {
            plane: PlaneKind::Luma,
        })?;
    ensure_len(PlaneKind::Luma, y, required)?;

    let chroma = size.chroma();
    let (cw, ch) = (chroma.width as usize, chroma.height as usize);
    if cw == 0 || ch == 0 {
        return Ok(());
    }

    let u = &planes[1];
    if u.pixel_stride == 0 {
        return Err(GeometryError::ZeroPixelStride {
            plane: PlaneKind::ChromaU,
        });
    }
    // Chroma rows may overlap (row stride below the sample span); only the
    // furthest offset matters.
    let required = (cw - 1)
        .checked_mul(u.pixel_stride)
        .and_then(|span| (ch - 1).checked_mul(u.row_stride)?.checked_add(span))
        .and_then(|n| n.checked_add(1))
        .ok_or(GeometryError::StrideOverflow {
            plane: PlaneKind::ChromaU,
        })?;
    ensure_len(PlaneKind::ChromaU, u, required)?;
    ensure_len(PlaneKind::ChromaV, &planes[2], required)?;

    Ok(())
}

fn ensure_len(plane: PlaneKind, data: &Plane<'_>, required: usize) -> Result<(), GeometryError> {
    if data.data.len() < required {
        return Err(GeometryError::PlaneTooShort {
            plane,
            required,
            available: data.data.len(),
        });
    }
    Ok(())
}
