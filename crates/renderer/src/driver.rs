use phasebench::report::publish;
use phasebench::{
    BenchError, BenchEvent, Clock, ConfigurationCatalog, PhaseController, PhaseTimings,
    ReportSink,
};

use crate::input::InputPoller;
use crate::lesson::FrameView;

/// Outcome of one driven frame.
#[derive(Debug)]
pub enum FrameStep<'a, P> {
    Exit,
    Draw(FrameView<'a, P>),
}

/// Per-frame orchestration: input, phase tick, reporting, then a view of what
/// to draw.
pub struct FrameDriver<P, I, S> {
    clock: Clock,
    controller: PhaseController,
    catalog: ConfigurationCatalog<P>,
    input: I,
    sink: S,
    frame: u64,
}

impl<P, I, S> FrameDriver<P, I, S>
where
    I: InputPoller,
    S: ReportSink,
{
    /// Starts measuring configuration 0 and announces it on `sink`.
    pub fn new(
        clock: Clock,
        timings: PhaseTimings,
        catalog: ConfigurationCatalog<P>,
        input: I,
        mut sink: S,
    ) -> Result<Self, BenchError> {
        let now = clock.now()?;
        let controller = PhaseController::new(timings, now);
        publish(&mut sink, &catalog, &BenchEvent::Measuring { index: 0 });
        tracing::debug!(
            configurations = catalog.len(),
            warmup_frames = timings.warmup_frames,
            "frame driver ready"
        );
        Ok(Self {
            clock,
            controller,
            catalog,
            input,
            sink,
            frame: 0,
        })
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn controller(&self) -> &PhaseController {
        &self.controller
    }

    pub fn catalog(&self) -> &ConfigurationCatalog<P> {
        &self.catalog
    }

    pub fn step(&mut self) -> Result<FrameStep<'_, P>, BenchError> {
        if self.input.exit_requested() {
            tracing::info!("exit requested");
            return Ok(FrameStep::Exit);
        }
        if self.input.poll_advance_requested() {
            tracing::debug!("advance requested");
            self.controller.request_advance();
        }

        let now = self.clock.now()?;
        if let Some(event) = self.controller.tick(&self.catalog, now) {
            publish(&mut self.sink, &self.catalog, &event);
        }
        self.frame += 1;

        let state = self.controller.state();
        Ok(FrameStep::Draw(FrameView {
            configuration: self.catalog.at(state.index()),
            index: state.index(),
            phase: state.phase(),
            animation: state.animation(),
            pass: state.pass(),
            frame: self.frame,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use crossbeam_channel::unbounded;
    use phasebench::{ClockError, Configuration, ConsoleSink, Phase, TickSource};

    use crate::input::{OperatorCommand, OperatorInput};

    /// Microsecond counter advanced by the test.
    struct SteppedTicks(Arc<AtomicU64>);

    impl TickSource for SteppedTicks {
        fn frequency(&self) -> u64 {
            1_000_000
        }

        fn ticks(&self) -> Result<u64, ClockError> {
            Ok(self.0.load(Ordering::SeqCst))
        }
    }

    type TestDriver = FrameDriver<(), OperatorInput, ConsoleSink<Vec<u8>>>;

    fn driver(input: OperatorInput) -> (TestDriver, Arc<AtomicU64>) {
        let ticks = Arc::new(AtomicU64::new(0));
        let clock = Clock::new(SteppedTicks(ticks.clone())).unwrap();
        let catalog = ConfigurationCatalog::new(vec![
            Configuration::new("Atomic Counter Buffer", ()),
            Configuration::new("Shader Storage Buffer Object", ()),
        ])
        .unwrap();
        let timings = PhaseTimings {
            warmup_frames: 0,
            ..PhaseTimings::default()
        };
        let driver =
            FrameDriver::new(clock, timings, catalog, input, ConsoleSink::new(Vec::new())).unwrap();
        (driver, ticks)
    }

    fn output(driver: &TestDriver) -> Vec<String> {
        String::from_utf8_lossy(driver.sink().get_ref())
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn step_at(driver: &mut TestDriver, ticks: &AtomicU64, micros: u64) -> Option<(usize, Phase)> {
        ticks.store(micros, Ordering::SeqCst);
        match driver.step().unwrap() {
            FrameStep::Draw(view) => Some((view.index, view.phase)),
            FrameStep::Exit => None,
        }
    }

    #[test]
    fn announces_first_configuration() {
        let (driver, _) = driver(OperatorInput::new());
        assert_eq!(output(&driver), vec!["*** measuring Atomic Counter Buffer"]);
    }

    #[test]
    fn console_advance_moves_to_next_configuration() {
        let (tx, rx) = unbounded();
        let (mut driver, ticks) = driver(OperatorInput::from_receiver(rx));

        step_at(&mut driver, &ticks, 1_000_000);
        tx.send(OperatorCommand::Advance).unwrap();
        assert_eq!(
            step_at(&mut driver, &ticks, 2_000_000),
            Some((0, Phase::Settling))
        );
        assert_eq!(
            step_at(&mut driver, &ticks, 3_000_000),
            Some((1, Phase::Measuring))
        );

        let lines = output(&driver);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("frames=2 us=2000000"));
        assert_eq!(lines[2], "*** measuring Shader Storage Buffer Object");
    }

    #[test]
    fn frame_numbers_increase() {
        let (mut driver, ticks) = driver(OperatorInput::new());
        for expected in 1..=3 {
            ticks.store(expected * 10, Ordering::SeqCst);
            match driver.step().unwrap() {
                FrameStep::Draw(view) => assert_eq!(view.frame, expected),
                FrameStep::Exit => panic!("unexpected exit"),
            }
        }
    }

    #[test]
    fn exit_stops_before_ticking() {
        let (tx, rx) = unbounded();
        let (mut driver, ticks) = driver(OperatorInput::from_receiver(rx));
        tx.send(OperatorCommand::Exit).unwrap();
        assert_eq!(step_at(&mut driver, &ticks, 5_000_000), None);
        assert_eq!(driver.controller().state().frames(), 0);
    }
}
