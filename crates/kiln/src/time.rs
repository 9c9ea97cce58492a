//! Frame timing.
//!
//! [`Time`] is a resource the app updates at the start of every frame.
//! [`FixedTimestep`] is the accumulator that decides how many fixed-update
//! ticks a frame gets. The clock itself is behind [`TimeSource`] so tests can
//! drive the main loop with [`ManualClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic clock used by the main loop.
pub trait TimeSource {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`], measured from its creation.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time, so a test
/// can keep one handle and give another to the app.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Frame timing resource.
#[derive(Clone, Copy, Debug, Default)]
pub struct Time {
    delta: Duration,
    elapsed: Duration,
    frame_count: u64,
    fixed_ticks: u64,
}

impl Time {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.frame_count += 1;
    }

    pub(crate) fn record_fixed_ticks(&mut self, ticks: u32) {
        self.fixed_ticks += u64::from(ticks);
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Fixed-update ticks run since startup.
    pub fn fixed_ticks(&self) -> u64 {
        self.fixed_ticks
    }

    pub fn fps(&self) -> f32 {
        let secs = self.delta.as_secs_f32();
        if secs > 0.0 { 1.0 / secs } else { 0.0 }
    }
}

/// Accumulates frame time and hands it out in whole fixed steps.
///
/// After every [`accumulate`](Self::accumulate) call the remainder satisfies
/// `0 <= remainder < step`.
#[derive(Clone, Copy, Debug)]
pub struct FixedTimestep {
    step: f32,
    accumulator: f32,
}

impl FixedTimestep {
    /// # Panics
    ///
    /// Panics unless `step` is positive and finite.
    pub fn new(step: f32) -> Self {
        assert!(
            step.is_finite() && step > 0.0,
            "fixed time step must be positive, got {step}"
        );
        Self {
            step,
            accumulator: 0.0,
        }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn remainder(&self) -> f32 {
        self.accumulator
    }

    /// Add `elapsed` seconds and return how many fixed ticks are due.
    pub fn accumulate(&mut self, elapsed: f32) -> u32 {
        self.accumulator += elapsed.max(0.0);
        let mut ticks = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            ticks += 1;
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_match_floor_of_accumulated_time() {
        // Binary fractions, so every sum below is exact.
        let step = 0.25f32;
        let mut fixed = FixedTimestep::new(step);
        let mut total_ticks = 0;
        let mut total_time = 0.0f32;
        for frame in [0.125f32, 0.375, 0.5, 0.0, 0.625, 0.0625, 0.9375] {
            total_ticks += fixed.accumulate(frame);
            total_time += frame;
            let expected = (total_time / step).floor() as u32;
            assert_eq!(total_ticks, expected, "after {total_time} s");
            assert_eq!(fixed.remainder(), total_time - expected as f32 * step);
            assert!(fixed.remainder() < step);
        }
        assert_eq!(total_ticks, 10);
    }

    #[test]
    fn exact_multiples() {
        let mut fixed = FixedTimestep::new(0.25);
        assert_eq!(fixed.accumulate(1.0), 4);
        assert_eq!(fixed.remainder(), 0.0);
        assert_eq!(fixed.accumulate(0.3), 1);
        assert!((fixed.remainder() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn negative_elapsed_is_ignored() {
        let mut fixed = FixedTimestep::new(0.5);
        assert_eq!(fixed.accumulate(-3.0), 0);
        assert_eq!(fixed.remainder(), 0.0);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn zero_step_panics() {
        FixedTimestep::new(0.0);
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(Duration::from_millis(20));
        assert_eq!(clock.now(), Duration::from_millis(20));
    }

    #[test]
    fn time_tracks_frames() {
        let mut time = Time::new();
        time.advance(Duration::from_millis(500));
        time.advance(Duration::from_millis(250));
        time.record_fixed_ticks(3);
        assert_eq!(time.frame_count(), 2);
        assert_eq!(time.elapsed(), Duration::from_millis(750));
        assert_eq!(time.delta_secs(), 0.25);
        assert_eq!(time.fps(), 4.0);
        assert_eq!(time.fixed_ticks(), 3);
    }
}
