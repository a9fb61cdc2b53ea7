//! Timing and rotation core for the GPU micro-benchmarks.
//!
//! Every lesson renders the same way: a continuous, vsync-free frame loop that
//! measures throughput over a fixed window, repeats the window until the
//! operator asks to move on, then plays a short settle animation before the
//! next configuration goes live.
//!
//! ```text
//!   frame ──▶ PhaseController::tick(catalog, Clock::now())
//!                 │
//!                 ├─ Measuring: warm-up discard ─▶ count ─▶ window closed?
//!                 │                                        ├─ advance pending ─▶ Settling
//!                 │                                        └─ otherwise ─▶ repeat window
//!                 └─ Settling: triangle animation ─▶ 1 s elapsed ─▶ next config, Measuring
//!
//!   BenchEvent ──▶ report::publish ──▶ ReportSink (stdout + tracing)
//! ```
//!
//! Nothing here touches the GPU; the renderer crate feeds frames in and applies
//! the resulting [`phase::BenchmarkState`] to its resources.

pub mod catalog;
pub mod clock;
pub mod error;
pub mod phase;
pub mod report;

pub use catalog::{CatalogError, Configuration, ConfigurationCatalog};
pub use clock::{elapsed_microseconds, Clock, ClockError, ClockSample, MonotonicTicks, TickSource};
pub use error::BenchError;
pub use phase::{
    settle_animation, BenchEvent, BenchmarkState, PerformanceReport, Phase, PhaseController,
    PhaseTimings,
};
pub use report::{ConsoleSink, ReportSink};
