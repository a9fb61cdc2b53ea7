mod binder;
mod counters;

use std::process::ExitCode;

use renderer::{Lesson, LessonRequirements};

use crate::binder::AtomicsBinder;

fn lesson() -> Lesson {
    Lesson {
        title: "atomics",
        summary: "This lesson compares the performance of atomics in a counters-only buffer and in a general storage buffer.",
        switches: "counter buffer and storage buffer",
        window_size: Lesson::WINDOW_SIZE,
        requirements: LessonRequirements {
            downlevel: wgpu::DownlevelFlags::FRAGMENT_WRITABLE_STORAGE,
            ..LessonRequirements::default()
        },
    }
}

fn main() -> ExitCode {
    renderer::initialise_tracing();
    renderer::run_guarded(|| renderer::run_lesson::<AtomicsBinder>(&lesson()))
}
