use std::time::Duration;

use edge_view::reassemble::{self, yuv420_to_nv21};
use edge_view::{Error, GeometryError, PlaneKind, RawFrame, Size, nv21_len};

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// A frame whose chroma planes are exactly as long as the strides require,
/// filled with distinct, non-repeating bytes.
fn synthetic(size: Size, luma_stride: usize, chroma_stride: usize, pix: usize) -> RawFrame {
    let (w, h) = (size.width as usize, size.height as usize);
    let (cw, ch) = (w / 2, h / 2);
    let chroma_len = (ch - 1) * chroma_stride + (cw - 1) * pix + 1;
    let luma_len = (h - 1) * luma_stride + w;
    RawFrame {
        size,
        luma: (0..luma_len).map(|i| (i * 7 % 251) as u8).collect(),
        luma_stride,
        u: (0..chroma_len).map(|i| (i * 13 % 239) as u8).collect(),
        v: (0..chroma_len).map(|i| (i * 17 % 233 + 3) as u8).collect(),
        chroma_row_stride: chroma_stride,
        chroma_pixel_stride: pix,
        timestamp: Duration::ZERO,
    }
}

#[test]
fn vu_pairs_follow_u_plane_strides() {
    init_test_tracing();
    let size = Size::new(16, 8);
    let w = size.width as usize;
    for pix in [1usize, 2] {
        for chroma_stride in [w / 2, w / 2 + 4] {
            let f = synthetic(size, w, chroma_stride, pix);
            let out = reassemble::to_nv21(&f).unwrap();

            assert_eq!(out.len(), nv21_len(size));
            assert_eq!(&out[..size.pixel_count()], &f.luma[..]);

            let pairs = &out[size.pixel_count()..];
            let mut k = 0;
            for r in 0..size.height as usize / 2 {
                for c in 0..w / 2 {
                    let src = r * chroma_stride + c * pix;
                    assert_eq!(
                        (pairs[k], pairs[k + 1]),
                        (f.v[src], f.u[src]),
                        "pix={pix} stride={chroma_stride} r={r} c={c}"
                    );
                    k += 2;
                }
            }
        }
    }
}

#[test]
fn output_length_is_one_and_a_half_pixels() {
    init_test_tracing();
    let mut out = Vec::new();
    for (w, h) in [(2u32, 2u32), (16, 8), (64, 48), (320, 240)] {
        let size = Size::new(w, h);
        let f = synthetic(size, w as usize + 12, w as usize + 8, 2);
        yuv420_to_nv21(&f, &mut out).unwrap();
        assert_eq!(out.len(), (w * h * 3 / 2) as usize);
    }
}

#[test]
fn padded_luma_stride_is_copied_row_by_row() {
    init_test_tracing();
    let size = Size::new(6, 4);
    let f = synthetic(size, 10, 3, 1);
    let out = reassemble::to_nv21(&f).unwrap();
    for row in 0..4 {
        assert_eq!(&out[row * 6..row * 6 + 6], &f.luma[row * 10..row * 10 + 6]);
    }
}

#[test]
fn odd_sizes_floor_the_chroma_grid() {
    init_test_tracing();
    let size = Size::new(7, 5);
    let f = synthetic(size, 7, 3, 1);
    let out = reassemble::to_nv21(&f).unwrap();
    assert_eq!(out.len(), 35 + 3 * 2 * 2);
    assert_eq!(reassemble::luma(&out, size).unwrap(), &f.luma[..35]);
}

#[test]
fn truncated_luma_plane_is_reported_not_read() {
    init_test_tracing();
    let size = Size::new(8, 4);
    let mut f = synthetic(size, 12, 4, 1);
    f.luma.truncate(20);
    let mut out = Vec::new();
    match yuv420_to_nv21(&f, &mut out) {
        Err(Error::Geometry(GeometryError::PlaneTooShort {
            plane: PlaneKind::Luma,
            required,
            available,
        })) => {
            assert_eq!(required, 3 * 12 + 8);
            assert_eq!(available, 20);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(out.is_empty());
}

#[test]
fn understated_chroma_stride_overruns_are_caught() {
    init_test_tracing();
    let size = Size::new(8, 8);
    let mut f = synthetic(size, 8, 4, 1);
    // Claim a wider stride than the plane was built with.
    f.chroma_row_stride = 16;
    assert!(matches!(
        reassemble::to_nv21(&f),
        Err(Error::Geometry(GeometryError::PlaneTooShort {
            plane: PlaneKind::ChromaU,
            ..
        }))
    ));
}
