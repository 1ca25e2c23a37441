use std::time::{Duration, Instant};

/// Timing snapshot for one drawn frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTiming {
    /// Time since the previous drawn frame. Zero for the first frame.
    pub interval: Duration,

    /// Smoothed interval (exponential moving average).
    pub smoothed: Duration,

    /// Zero-based index of the frame this snapshot belongs to.
    pub frame_index: u64,
}

impl FrameTiming {
    /// Frames per second implied by the smoothed interval, if any frames elapsed.
    pub fn fps(&self) -> Option<f32> {
        let secs = self.smoothed.as_secs_f32();
        (secs > 0.0).then(|| 1.0 / secs)
    }
}

/// Measures the interval between consecutive drawn frames on the render thread.
///
/// The clock starts lazily on the first `tick`, so time spent waiting for the
/// surface to become ready does not show up as a giant first interval.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    smoothed: Duration,
    frame_index: u64,
    smoothing: f32,
}

impl FrameClock {
    /// Creates a clock with a 0.1 smoothing factor.
    pub fn new() -> Self {
        Self::with_smoothing(0.1)
    }

    /// `smoothing` is the weight given to the newest interval, clamped to `(0, 1]`.
    pub fn with_smoothing(smoothing: f32) -> Self {
        Self {
            last: None,
            smoothed: Duration::ZERO,
            frame_index: 0,
            smoothing: smoothing.clamp(f32::EPSILON, 1.0),
        }
    }

    /// Number of frames ticked so far.
    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    /// Records a drawn frame at the current instant.
    pub fn tick(&mut self) -> FrameTiming {
        self.tick_at(Instant::now())
    }

    /// Records a drawn frame at `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTiming {
        let interval = self
            .last
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);

        if self.last.is_some() {
            self.smoothed = if self.smoothed.is_zero() {
                interval
            } else {
                self.smoothed.mul_f32(1.0 - self.smoothing) + interval.mul_f32(self.smoothing)
            };
        }

        self.last = Some(now);

        let timing = FrameTiming {
            interval,
            smoothed: self.smoothed,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        timing
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_zero_interval() {
        let mut clock = FrameClock::new();
        let t = clock.tick_at(Instant::now());
        assert_eq!(t.interval, Duration::ZERO);
        assert_eq!(t.frame_index, 0);
        assert_eq!(t.fps(), None);
    }

    #[test]
    fn intervals_follow_tick_instants() {
        let mut clock = FrameClock::with_smoothing(1.0);
        let base = Instant::now();
        clock.tick_at(base);
        let t = clock.tick_at(base + Duration::from_millis(16));
        assert_eq!(t.interval, Duration::from_millis(16));
        assert_eq!(t.smoothed, Duration::from_millis(16));
        assert_eq!(t.frame_index, 1);
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn smoothing_blends_toward_new_intervals() {
        let mut clock = FrameClock::with_smoothing(0.5);
        let base = Instant::now();
        clock.tick_at(base);
        clock.tick_at(base + Duration::from_millis(10));
        let t = clock.tick_at(base + Duration::from_millis(40));
        // 0.5 * 10ms + 0.5 * 30ms
        let ms = t.smoothed.as_secs_f64() * 1000.0;
        assert!((ms - 20.0).abs() < 0.01, "smoothed = {ms}");
    }
}
