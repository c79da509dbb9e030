use std::time::{Duration, Instant};

/// Instantaneous frames-per-second from the gap between consecutive samples.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    origin: Instant,
    previous: Option<f64>,
    fps: f64,
}

impl FpsMeter {
    pub fn new() -> Self {
        FpsMeter {
            origin: Instant::now(),
            previous: None,
            fps: 0.0,
        }
    }

    /// Record a sample taken at `now_secs` on any monotonic timeline.
    ///
    /// Returns `1 / Δt`, or `0` when this is the first sample or when `Δt` is
    /// zero or negative.
    pub fn sample(&mut self, now_secs: f64) -> f64 {
        let fps = match self.previous {
            Some(prev) => {
                let dt = now_secs - prev;
                if dt > 0.0 { 1.0 / dt } else { 0.0 }
            }
            None => 0.0,
        };
        self.previous = Some(now_secs);
        self.fps = fps;
        fps
    }

    /// Record a sample at the current monotonic time.
    pub fn tick(&mut self) -> f64 {
        let now = self.origin.elapsed().as_secs_f64();
        self.sample(now)
    }

    /// The most recent estimate.
    pub fn last(&self) -> f64 {
        self.fps
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        FpsMeter::new()
    }
}

/// Elapsed time between acquiring a frame and a later pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct LatencyMeter {
    last: Option<Duration>,
}

impl LatencyMeter {
    pub fn new() -> Self {
        LatencyMeter::default()
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.last = Some(elapsed);
    }

    /// Record the time elapsed since `acquired_at`.
    pub fn record_since(&mut self, acquired_at: Instant) -> Duration {
        let elapsed = acquired_at.elapsed();
        self.record(elapsed);
        elapsed
    }

    pub fn last(&self) -> Option<Duration> {
        self.last
    }

    /// The most recent sample in milliseconds, `0` before the first one.
    pub fn last_ms(&self) -> f64 {
        self.last.map_or(0.0, |d| d.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_16_6ms_reads_about_60fps() {
        let mut meter = FpsMeter::new();
        assert_eq!(meter.sample(0.0), 0.0);
        let mut t = 0.0;
        for _ in 0..10 {
            t += 0.0166;
            let fps = meter.sample(t);
            assert!((fps - 60.0).abs() < 0.5, "fps = {fps}");
        }
    }

    #[test]
    fn exact_frame_period_is_exact() {
        let mut meter = FpsMeter::new();
        meter.sample(1.0);
        let fps = meter.sample(1.0 + 1.0 / 60.0);
        assert!((fps - 60.0).abs() < 1e-6);
        assert_eq!(meter.last(), fps);
    }

    #[test]
    fn zero_or_negative_delta_reads_zero() {
        let mut meter = FpsMeter::new();
        meter.sample(2.0);
        assert_eq!(meter.sample(2.0), 0.0);
        assert_eq!(meter.sample(1.5), 0.0);
        assert_eq!(meter.last(), 0.0);
    }

    #[test]
    fn tick_uses_the_monotonic_clock() {
        let mut meter = FpsMeter::new();
        meter.tick();
        std::thread::sleep(Duration::from_millis(5));
        let fps = meter.tick();
        assert!(fps > 0.0 && fps <= 200.0, "fps = {fps}");
    }

    #[test]
    fn latency_reports_milliseconds() {
        let mut meter = LatencyMeter::new();
        assert_eq!(meter.last_ms(), 0.0);
        meter.record(Duration::from_micros(12_500));
        assert!((meter.last_ms() - 12.5).abs() < 1e-9);
    }
}
