use std::time::{Duration, Instant};

use edge_view::platform::software::SoftwareBackend;
use edge_view::platform::synthetic::{SyntheticCamera, SyntheticLayout, luma_value};
use edge_view::pool::FramePool;
use edge_view::process::{FnProcessor, Passthrough};
use edge_view::stream::CameraStream;
use edge_view::{
    Error, Frame, GeometryError, Pipeline, PipelineConfig, PixelFormat, Plane, Planes, Presenter,
    PresenterConfig, Ratio, RawFrame, Size, StreamConfig,
};

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn stream_config(width: u32, height: u32) -> StreamConfig {
    StreamConfig {
        size: Size::new(width, height),
        ..StreamConfig::default()
    }
}

fn presenter(size: Size) -> Presenter<SoftwareBackend> {
    let mut p = Presenter::new(
        SoftwareBackend::new(size.width, size.height),
        PresenterConfig::default(),
    )
    .unwrap();
    p.resize(size.width, size.height);
    p
}

/// A pooled frame with a geometry the reassembler must refuse.
struct BrokenFrame {
    buffer: edge_view::pool::PooledBuffer,
    size: Size,
}

impl Frame for BrokenFrame {
    type Timestamp = Duration;

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Yuv420
    }

    fn size(&self) -> Size {
        self.size
    }

    fn planes(&self) -> Planes<'_> {
        let mut planes = Planes::new();
        // Luma stride claims far more bytes than the buffer holds.
        planes.push(Plane::packed(&self.buffer, self.size.width as usize * 4));
        planes.push(Plane::packed(&self.buffer, self.size.width as usize / 2));
        planes.push(Plane::packed(&self.buffer, self.size.width as usize / 2));
        planes
    }

    fn timestamp(&self) -> Duration {
        Duration::ZERO
    }
}

#[test]
fn pass_through_shows_the_luma_plane() {
    init_test_tracing();
    let size = Size::new(8, 6);
    let layout = SyntheticLayout {
        luma_padding: 5,
        chroma_padding: 3,
        chroma_pixel_stride: 2,
    };
    let camera = SyntheticCamera::new(stream_config(8, 6), layout).unwrap();
    let mut p = presenter(size);
    let config = PipelineConfig {
        show_edges: false,
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(&config, Box::new(Passthrough), p.submitter());

    pipeline.handle_frame(camera.capture(2).unwrap()).unwrap();
    assert_eq!(camera.pool().outstanding(), 0);

    p.draw().unwrap();
    let shown = p.backend().displayed_luma();
    for y in 0..6 {
        for x in 0..8 {
            assert_eq!(shown[y * 8 + x], luma_value(x, y, 2), "pixel ({x}, {y})");
        }
    }
    assert_eq!(pipeline.stats().passed_through, 1);
    assert_eq!(pipeline.stats().processed, 0);
}

#[test]
fn bad_geometry_releases_the_frame_and_skips_presentation() {
    init_test_tracing();
    let size = Size::new(8, 4);
    let pool = FramePool::new(size.pixel_count() * 3 / 2, 2);
    let mut p = presenter(size);
    let mut pipeline = Pipeline::with_canny(&PipelineConfig::default(), p.submitter());

    let broken = BrokenFrame {
        buffer: pool.try_acquire().unwrap(),
        size,
    };
    let err = pipeline.handle_frame(broken).unwrap_err();
    assert!(matches!(
        err,
        Error::Geometry(GeometryError::PlaneTooShort { .. })
    ));
    assert_eq!(pool.outstanding(), 0);
    assert_eq!(pool.released(), 1);
    assert_eq!(pipeline.stats().rejected, 1);

    assert!(!p.draw().unwrap().presented);

    // The next good frame goes through.
    let camera = SyntheticCamera::new(stream_config(8, 4), SyntheticLayout::default()).unwrap();
    pipeline.handle_frame(camera.capture(0).unwrap()).unwrap();
    assert!(p.draw().unwrap().presented);
    assert_eq!(pipeline.stats().processed, 1);
}

#[test]
fn overflowing_strides_are_rejected_without_a_panic() {
    init_test_tracing();
    let size = Size::new(4, 4);
    let mut p = presenter(size);
    let mut pipeline = Pipeline::with_canny(&PipelineConfig::default(), p.submitter());

    let hostile = RawFrame {
        size,
        luma: vec![0; 16],
        luma_stride: usize::MAX / 2,
        u: vec![0; 4],
        v: vec![0; 4],
        chroma_row_stride: 2,
        chroma_pixel_stride: 1,
        timestamp: Duration::ZERO,
    };
    assert!(matches!(
        pipeline.handle_frame(hostile),
        Err(Error::Geometry(GeometryError::StrideOverflow { .. }))
    ));
    assert_eq!(pipeline.stats().rejected, 1);
    assert!(!p.draw().unwrap().presented);
}

#[test]
fn processor_output_starts_zeroed() {
    init_test_tracing();
    let size = Size::new(6, 4);
    let camera = SyntheticCamera::new(stream_config(6, 4), SyntheticLayout::default()).unwrap();
    let mut p = presenter(size);
    // Writes only the first row.
    let lazy = FnProcessor::new("first-row", |_input: &[u8], size: Size, output: &mut [u8]| {
        output[..size.width as usize].fill(200);
    });
    let mut pipeline = Pipeline::new(&PipelineConfig::default(), Box::new(lazy), p.submitter());

    pipeline.handle_frame(camera.capture(0).unwrap()).unwrap();
    pipeline.handle_frame(camera.capture(1).unwrap()).unwrap();
    p.draw().unwrap();

    let front = p.front().unwrap().data();
    assert!(front[..6].iter().all(|&b| b == 200));
    assert!(front[6..].iter().all(|&b| b == 0));
}

#[test]
fn toggle_switches_between_edges_and_luma() {
    init_test_tracing();
    let size = Size::new(16, 16);
    let camera = SyntheticCamera::new(stream_config(16, 16), SyntheticLayout::default()).unwrap();
    let mut p = presenter(size);
    let mut pipeline = Pipeline::with_canny(&PipelineConfig::default(), p.submitter());
    let toggle = pipeline.toggle();

    pipeline.handle_frame(camera.capture(0).unwrap()).unwrap();
    p.draw().unwrap();
    let edges = p.front().unwrap().data().to_vec();
    assert!(edges.iter().all(|&b| b == 0 || b == 255));

    assert!(!toggle.toggle());
    pipeline.handle_frame(camera.capture(0).unwrap()).unwrap();
    p.draw().unwrap();
    let luma = p.front().unwrap().data();
    assert_eq!(luma[17], luma_value(1, 1, 0));

    let stats = pipeline.stats();
    assert_eq!((stats.processed, stats.passed_through), (1, 1));
}

#[test]
fn attached_camera_feeds_the_presenter() {
    init_test_tracing();
    let config = StreamConfig {
        frame_rate: Ratio {
            numerator: 120,
            denominator: 1,
        },
        ..stream_config(32, 24)
    };
    let mut camera = SyntheticCamera::new(config, SyntheticLayout::default()).unwrap();
    let mut p = presenter(Size::new(32, 24));
    let pipeline = Pipeline::with_canny(&PipelineConfig::default(), p.submitter())
        .attach(&mut camera)
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut fresh = 0;
    while fresh < 5 && Instant::now() < deadline {
        if p.wait_for_frame(Duration::from_millis(200)).is_ok() {
            let outcome = p.draw().unwrap();
            if outcome.fresh {
                fresh += 1;
                assert!(outcome.latency.is_some());
            }
        }
    }
    camera.stop().unwrap();

    assert_eq!(fresh, 5);
    assert_eq!(camera.pool().outstanding(), 0);
    let stats = pipeline.lock().stats();
    assert!(stats.processed >= 5);
    assert_eq!(stats.rejected, 0);
}
