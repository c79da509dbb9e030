use std::time::{Duration, Instant};

use edge_view::mailbox::RecvTimeoutError;
use edge_view::platform::software::SoftwareBackend;
use edge_view::platform::synthetic::{SyntheticCamera, SyntheticLayout};
use edge_view::stream::CameraStream;
use edge_view::{Pipeline, PipelineConfig, Presenter, PresenterConfig, Ratio, Size, StreamConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = StreamConfig {
        size: Size::new(320, 240),
        frame_rate: Ratio {
            numerator: 30,
            denominator: 1,
        },
        ..StreamConfig::default()
    };
    // Padded rows and interleaved chroma, like most phone sensors.
    let layout = SyntheticLayout {
        luma_padding: 64,
        chroma_padding: 32,
        chroma_pixel_stride: 2,
    };
    let mut camera = SyntheticCamera::new(config.clone(), layout).expect("failed to create camera");

    let mut presenter = Presenter::new(
        SoftwareBackend::new(config.size.width, config.size.height),
        PresenterConfig::default(),
    )
    .expect("failed to create presenter");
    presenter.resize(config.size.width, config.size.height);

    let pipeline = Pipeline::with_canny(&PipelineConfig::default(), presenter.submitter());
    let toggle = pipeline.toggle();

    println!(
        "Streaming {}x{} @ {:.1} fps, edges {}",
        config.size.width,
        config.size.height,
        config.frame_rate.as_f64(),
        if toggle.get() { "on" } else { "off" },
    );

    let pipeline = pipeline.attach(&mut camera).expect("failed to start camera");

    let target_draws = 90u64;
    let started = Instant::now();
    while presenter.presented() < target_draws {
        match presenter.wait_for_frame(Duration::from_millis(500)) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) => {
                println!("No frame within 500 ms");
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                println!("Pipeline went away");
                break;
            }
        }
        let outcome = presenter.draw().expect("draw failed");

        if presenter.presented() == target_draws / 2 {
            let on = toggle.toggle();
            println!("Edges {}", if on { "on" } else { "off" });
        }
        if presenter.presented() % 15 == 0 {
            let stats = pipeline.lock().stats();
            println!(
                "draw {}: {:.1} FPS, frame {:.2} ms, latency {:.2} ms",
                presenter.presented(),
                outcome.fps,
                stats.last_frame_ms,
                presenter.latency().last_ms(),
            );
        }
    }

    camera.stop().expect("failed to stop camera");
    let stats = pipeline.lock().stats();
    println!(
        "\nDone in {:.2}s. processed={} passed_through={} rejected={} dropped={} starved={}",
        started.elapsed().as_secs_f64(),
        stats.processed,
        stats.passed_through,
        stats.rejected,
        presenter.dropped(),
        camera.stats().starved(),
    );
}
