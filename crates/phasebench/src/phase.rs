use std::time::Duration;

use tracing::debug;

use crate::catalog::ConfigurationCatalog;
use crate::clock::ClockSample;

/// Frames discarded after entering a measuring phase on a new configuration.
pub const DEFAULT_WARMUP_FRAMES: u32 = 512;
/// Length of one steady-state sampling window.
pub const DEFAULT_MEASURE_WINDOW: Duration = Duration::from_secs(2);
/// Length of the transition animation between configurations.
pub const DEFAULT_SETTLE_DURATION: Duration = Duration::from_secs(1);

/// Constants that shape the measure/settle cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    pub warmup_frames: u32,
    pub measure_window: Duration,
    pub settle_duration: Duration,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            warmup_frames: DEFAULT_WARMUP_FRAMES,
            measure_window: DEFAULT_MEASURE_WINDOW,
            settle_duration: DEFAULT_SETTLE_DURATION,
        }
    }
}

impl PhaseTimings {
    fn measure_window_micros(&self) -> u64 {
        duration_micros(self.measure_window)
    }

    fn settle_micros(&self) -> u64 {
        duration_micros(self.settle_duration)
    }
}

fn duration_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Steady-state frame counting on the current configuration.
    Measuring,
    /// Transition animation before the next configuration goes live.
    Settling,
}

/// Throughput sampled over one completed measuring window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceReport {
    pub index: usize,
    pub pass: usize,
    pub frames: u64,
    pub elapsed_us: u64,
}

impl PerformanceReport {
    pub fn fps(&self) -> f64 {
        if self.elapsed_us == 0 {
            return 0.0;
        }
        self.frames as f64 * 1_000_000.0 / self.elapsed_us as f64
    }

    pub fn ms_per_frame(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.elapsed_us as f64 / (self.frames as f64 * 1_000.0)
    }
}

/// Notification produced by a controller tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchEvent {
    /// The configuration at `index` is now being measured.
    Measuring { index: usize },
    /// A measuring window closed.
    Report(PerformanceReport),
}

/// Mutable core of the benchmark, owned by a [`PhaseController`].
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkState {
    phase: Phase,
    index: usize,
    pass: usize,
    frames: u64,
    phase_start: ClockSample,
    settle_start: ClockSample,
    warmup_remaining: u32,
    advance_pending: bool,
    animation: f32,
}

impl BenchmarkState {
    fn new(now: ClockSample, warmup_frames: u32) -> Self {
        Self {
            phase: Phase::Measuring,
            index: 0,
            pass: 0,
            frames: 0,
            phase_start: now,
            settle_start: now,
            warmup_remaining: warmup_frames,
            advance_pending: false,
            animation: 0.0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the configuration currently selected in the catalog.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Measurement pass within the current configuration.
    pub fn pass(&self) -> usize {
        self.pass
    }

    /// Frames counted in the current window (warm-up frames excluded).
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn phase_start(&self) -> ClockSample {
        self.phase_start
    }

    /// Timestamp at which the last settling phase started.
    pub fn settle_start(&self) -> ClockSample {
        self.settle_start
    }

    pub fn warmup_remaining(&self) -> u32 {
        self.warmup_remaining
    }

    pub fn advance_pending(&self) -> bool {
        self.advance_pending
    }

    /// Settle animation progress in `[0, 1]`; zero while measuring.
    pub fn animation(&self) -> f32 {
        self.animation
    }

    pub fn is_warming_up(&self) -> bool {
        self.phase == Phase::Measuring && self.warmup_remaining > 0
    }
}

/// Triangular settle envelope: rises 0→1 over the first half of the settle
/// duration, then falls back to 0.
pub fn settle_animation(elapsed_us: u64, settle_us: u64) -> f32 {
    if settle_us == 0 {
        return 0.0;
    }
    let t = elapsed_us as f64 / settle_us as f64;
    let value = if t < 0.5 { t / 0.5 } else { (1.0 - t) / 0.5 };
    value.clamp(0.0, 1.0) as f32
}

/// Drives the measure → settle → measure cycle one frame at a time.
#[derive(Debug, Clone)]
pub struct PhaseController {
    state: BenchmarkState,
    timings: PhaseTimings,
}

impl PhaseController {
    /// Starts measuring configuration 0 at `now`.
    pub fn new(timings: PhaseTimings, now: ClockSample) -> Self {
        Self {
            state: BenchmarkState::new(now, timings.warmup_frames),
            timings,
        }
    }

    pub fn state(&self) -> &BenchmarkState {
        &self.state
    }

    pub fn timings(&self) -> &PhaseTimings {
        &self.timings
    }

    /// Marks that the operator wants to move on. Honoured at the end of the
    /// current measuring window.
    pub fn request_advance(&mut self) {
        self.state.advance_pending = true;
    }

    /// Advances the state machine by one displayed frame.
    pub fn tick<P>(
        &mut self,
        catalog: &ConfigurationCatalog<P>,
        now: ClockSample,
    ) -> Option<BenchEvent> {
        match self.state.phase {
            Phase::Settling => self.tick_settling(catalog, now),
            Phase::Measuring => self.tick_measuring(catalog, now),
        }
    }

    fn tick_settling<P>(
        &mut self,
        catalog: &ConfigurationCatalog<P>,
        now: ClockSample,
    ) -> Option<BenchEvent> {
        let settle_us = self.timings.settle_micros();
        let elapsed = now.elapsed_micros_since(self.state.settle_start);
        if elapsed < settle_us {
            self.state.animation = settle_animation(elapsed, settle_us);
            return None;
        }

        let state = &mut self.state;
        state.phase = Phase::Measuring;
        state.index = catalog.next(state.index);
        state.pass = 0;
        state.frames = 0;
        state.phase_start = now;
        state.warmup_remaining = self.timings.warmup_frames;
        state.animation = 0.0;
        debug!(index = state.index, "settle finished; measuring next configuration");
        Some(BenchEvent::Measuring { index: state.index })
    }

    fn tick_measuring<P>(
        &mut self,
        catalog: &ConfigurationCatalog<P>,
        now: ClockSample,
    ) -> Option<BenchEvent> {
        let state = &mut self.state;
        if state.warmup_remaining > 0 {
            // Discarded frame: the window starts at the last warm-up frame.
            state.warmup_remaining -= 1;
            state.phase_start = now;
            return None;
        }

        state.frames += 1;
        let elapsed = now.elapsed_micros_since(state.phase_start);
        if elapsed < self.timings.measure_window_micros() {
            return None;
        }

        let report = PerformanceReport {
            index: state.index,
            pass: state.pass,
            frames: state.frames,
            elapsed_us: elapsed,
        };

        if state.advance_pending {
            state.advance_pending = false;
            state.phase = Phase::Settling;
            state.settle_start = now;
            state.animation = 0.0;
            debug!(index = state.index, "advance requested; settling");
        } else {
            state.frames = 0;
            state.phase_start = now;
            state.pass = (state.pass + 1) % catalog.at(state.index).pass_count();
        }

        Some(BenchEvent::Report(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Configuration;

    const FREQUENCY: u64 = 1_000_000_000;

    fn origin() -> ClockSample {
        ClockSample::from_parts(10_000, FREQUENCY, u64::MAX)
    }

    fn catalog() -> ConfigurationCatalog<()> {
        ConfigurationCatalog::new(vec![
            Configuration::new("alpha", ()),
            Configuration::new("beta", ()).with_passes(["texture()", "image"]),
        ])
        .unwrap()
    }

    fn timings(warmup_frames: u32) -> PhaseTimings {
        PhaseTimings {
            warmup_frames,
            ..PhaseTimings::default()
        }
    }

    #[test]
    fn defaults_match_lesson_constants() {
        let timings = PhaseTimings::default();
        assert_eq!(timings.warmup_frames, 512);
        assert_eq!(timings.measure_window, Duration::from_secs(2));
        assert_eq!(timings.settle_duration, Duration::from_secs(1));
    }

    #[test]
    fn report_formulas() {
        let report = PerformanceReport {
            index: 0,
            pass: 0,
            frames: 240,
            elapsed_us: 2_000_000,
        };
        assert!((report.fps() - 120.0).abs() < 1e-9);
        assert!((report.ms_per_frame() - 8.333_333).abs() < 1e-5);
    }

    #[test]
    fn settle_envelope_is_triangular() {
        let second = 1_000_000;
        assert!((settle_animation(0, second) - 0.0).abs() < 1e-6);
        assert!((settle_animation(250_000, second) - 0.5).abs() < 1e-6);
        assert!((settle_animation(500_000, second) - 1.0).abs() < 1e-6);
        assert!((settle_animation(750_000, second) - 0.5).abs() < 1e-6);
        assert_eq!(settle_animation(10, 0), 0.0);
    }

    #[test]
    fn warmup_frames_are_not_counted() {
        let catalog = catalog();
        let start = origin();
        let mut controller = PhaseController::new(timings(3), start);

        for frame in 1..=3u64 {
            let now = start.offset_micros(frame * 1_000);
            assert_eq!(controller.tick(&catalog, now), None);
            assert_eq!(controller.state().frames(), 0);
            assert_eq!(controller.state().phase_start(), now);
        }
        assert!(!controller.state().is_warming_up());

        controller.tick(&catalog, start.offset_micros(4_000));
        assert_eq!(controller.state().frames(), 1);
        assert_eq!(controller.state().phase_start(), start.offset_micros(3_000));
    }

    #[test]
    fn warmup_delays_the_window() {
        let catalog = catalog();
        let start = origin();
        let mut controller = PhaseController::new(timings(2), start);

        // Warm-up frames far apart must not close the window on their own.
        assert_eq!(controller.tick(&catalog, start.offset_micros(3_000_000)), None);
        assert_eq!(controller.tick(&catalog, start.offset_micros(6_000_000)), None);
        assert_eq!(controller.tick(&catalog, start.offset_micros(7_000_000)), None);
        let event = controller.tick(&catalog, start.offset_micros(8_000_000));
        assert_eq!(
            event,
            Some(BenchEvent::Report(PerformanceReport {
                index: 0,
                pass: 0,
                frames: 2,
                elapsed_us: 2_000_000,
            }))
        );
    }

    #[test]
    fn repeat_windows_rotate_passes() {
        let catalog = catalog();
        let start = origin();
        let mut controller = PhaseController::new(timings(0), start);

        // Move onto the two-pass configuration.
        controller.request_advance();
        controller.tick(&catalog, start.offset_micros(2_000_000));
        let settled = controller.tick(&catalog, start.offset_micros(3_000_000));
        assert_eq!(settled, Some(BenchEvent::Measuring { index: 1 }));

        let mut now = start.offset_micros(3_000_000);
        let mut passes = Vec::new();
        for _ in 0..3 {
            now = now.offset_micros(2_000_000);
            match controller.tick(&catalog, now) {
                Some(BenchEvent::Report(report)) => passes.push(report.pass),
                other => panic!("expected report, got {other:?}"),
            }
        }
        assert_eq!(passes, vec![0, 1, 0]);
        assert_eq!(controller.state().index(), 1);
    }

    #[test]
    fn advance_during_settle_waits_for_next_window() {
        let catalog = catalog();
        let start = origin();
        let mut controller = PhaseController::new(timings(0), start);
        controller.request_advance();
        controller.tick(&catalog, start.offset_micros(2_000_000));
        assert_eq!(controller.state().phase(), Phase::Settling);

        controller.request_advance();
        controller.tick(&catalog, start.offset_micros(3_100_000));
        assert_eq!(controller.state().phase(), Phase::Measuring);
        assert!(controller.state().advance_pending());
    }
}
