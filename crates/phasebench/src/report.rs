use std::io::{self, Write};

use crate::catalog::ConfigurationCatalog;
use crate::phase::{BenchEvent, PerformanceReport};

/// Consumer of benchmark notifications.
pub trait ReportSink {
    /// A configuration has just become the one under measurement.
    fn measuring(&mut self, name: &str);
    /// A measuring window closed. `pass` names the read path when the
    /// configuration alternates between several.
    fn report(&mut self, name: &str, pass: Option<&str>, report: &PerformanceReport);
}

pub fn format_measuring(name: &str) -> String {
    format!("*** measuring {name}")
}

pub fn format_report(pass: Option<&str>, report: &PerformanceReport) -> String {
    let line = format!(
        "frames={} us={} fps={:.2} ms-per-frame={:.4}",
        report.frames,
        report.elapsed_us,
        report.fps(),
        report.ms_per_frame()
    );
    match pass {
        Some(label) => format!("{label}: {line}"),
        None => line,
    }
}

/// Resolves names for `event` against `catalog` and forwards it to `sink`.
pub fn publish<P, S>(sink: &mut S, catalog: &ConfigurationCatalog<P>, event: &BenchEvent)
where
    S: ReportSink + ?Sized,
{
    match event {
        BenchEvent::Measuring { index } => sink.measuring(catalog.at(*index).name()),
        BenchEvent::Report(report) => {
            let configuration = catalog.at(report.index);
            sink.report(
                configuration.name(),
                configuration.pass_label(report.pass),
                report,
            );
        }
    }
}

/// Writes human readable lines to a stream and mirrors them as tracing events.
pub struct ConsoleSink<W> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        let result = writeln!(self.out, "{line}").and_then(|_| self.out.flush());
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to write benchmark output");
        }
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn measuring(&mut self, name: &str) {
        tracing::info!(configuration = name, "measuring");
        self.write_line(&format_measuring(name));
    }

    fn report(&mut self, name: &str, pass: Option<&str>, report: &PerformanceReport) {
        tracing::info!(
            configuration = name,
            pass = pass.unwrap_or("-"),
            frames = report.frames,
            us = report.elapsed_us,
            fps = report.fps(),
            ms_per_frame = report.ms_per_frame(),
            "measurement window closed"
        );
        self.write_line(&format_report(pass, report));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Configuration;

    fn sample_report(pass: usize) -> PerformanceReport {
        PerformanceReport {
            index: 1,
            pass,
            frames: 1_000,
            elapsed_us: 2_000_000,
        }
    }

    #[test]
    fn measuring_line() {
        assert_eq!(format_measuring("RGBA8"), "*** measuring RGBA8");
    }

    #[test]
    fn report_line_carries_derived_quantities() {
        let line = format_report(None, &sample_report(0));
        assert_eq!(line, "frames=1000 us=2000000 fps=500.00 ms-per-frame=2.0000");
    }

    #[test]
    fn report_line_is_prefixed_by_pass_label() {
        let line = format_report(Some("image"), &sample_report(1));
        assert!(line.starts_with("image: frames=1000"));
    }

    #[test]
    fn publish_resolves_names_from_catalog() {
        let catalog = ConfigurationCatalog::new(vec![
            Configuration::new("first", ()),
            Configuration::new("second", ()).with_passes(["texture()", "image"]),
        ])
        .unwrap();
        let mut sink = ConsoleSink::new(Vec::new());

        publish(&mut sink, &catalog, &BenchEvent::Measuring { index: 1 });
        publish(&mut sink, &catalog, &BenchEvent::Report(sample_report(1)));

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "*** measuring second");
        assert_eq!(
            lines[1],
            "image: frames=1000 us=2000000 fps=500.00 ms-per-frame=2.0000"
        );
    }
}
