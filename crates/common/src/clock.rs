//! Frame timing utilities.
//!
//! Export walks the source on a fixed frame grid (`FrameClock`), while the
//! live preview is paced by the display refresh (`RateController`). Both
//! work in seconds relative to recording start; nanosecond helpers exist for
//! wall-clock pacing.

/// Fraction of a frame below which a span's tail does not earn its own frame.
/// Absorbs rounding in spans computed as `end - start`.
const FRAME_EPSILON: f64 = 1e-6;

/// Fixed-rate frame grid over a source of known duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    fps: u32,
    duration_secs: f64,
}

impl FrameClock {
    /// Create a frame grid. A zero fps is treated as 1.
    pub fn new(fps: u32, duration_secs: f64) -> Self {
        Self {
            fps: fps.max(1),
            duration_secs: duration_secs.max(0.0),
        }
    }

    /// Frames per second.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Number of frames whose start time lies inside `[0, duration)`.
    pub fn total_frames(&self) -> u64 {
        (self.duration_secs * self.fps as f64 - FRAME_EPSILON)
            .ceil()
            .max(0.0) as u64
    }

    /// Presentation time of a frame index, in seconds.
    pub fn time_of(&self, frame_index: u64) -> f64 {
        frame_index as f64 / self.fps as f64
    }

    /// Iterate frame times in strictly increasing order.
    pub fn times(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        (0..self.total_frames()).map(move |i| (i, self.time_of(i)))
    }

    /// Convert an elapsed nanosecond value to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }

    /// Convert seconds to nanoseconds.
    pub fn secs_to_ns(secs: f64) -> u64 {
        (secs.max(0.0) * 1_000_000_000.0) as u64
    }
}

/// Frame rate controller for display-refresh pacing.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Forget the last tick so the next call fires immediately.
    pub fn reset(&mut self) {
        self.last_tick_ns = None;
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_clock_grid() {
        let clock = FrameClock::new(30, 1.0);
        assert_eq!(clock.total_frames(), 30);
        assert!((clock.time_of(15) - 0.5).abs() < 1e-12);

        let times: Vec<f64> = clock.times().map(|(_, t)| t).collect();
        assert!(times.windows(2).all(|w| w[1] > w[0]));
        assert!(*times.last().unwrap() < 1.0);
    }

    #[test]
    fn test_frame_clock_rounds_partial_frames_up() {
        let clock = FrameClock::new(10, 0.25);
        assert_eq!(clock.total_frames(), 3);
        assert_eq!(FrameClock::new(0, 2.0).fps(), 1);
    }

    #[test]
    fn test_frame_clock_ignores_rounding_in_subtracted_spans() {
        // 0.4 - 0.1 is 0.30000000000000004
        let clock = FrameClock::new(10, 0.4 - 0.1);
        assert_eq!(clock.total_frames(), 3);
        assert!(clock.times().all(|(_, t)| 0.1 + t < 0.4));
        assert_eq!(FrameClock::new(30, 0.0).total_frames(), 0);
    }

    #[test]
    fn test_ns_to_secs_conversion() {
        assert!((FrameClock::ns_to_secs(1_500_000_000) - 1.5).abs() < 1e-9);
        assert_eq!(FrameClock::secs_to_ns(2.0), 2_000_000_000);
        assert_eq!(FrameClock::secs_to_ns(-1.0), 0);
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(60);
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(1_000_000)); // 1ms later, too soon
        assert!(ctrl.should_tick(17_000_000)); // ~17ms later, should fire (60Hz ~ 16.67ms)

        ctrl.reset();
        assert!(ctrl.should_tick(17_500_000));
    }
}
