mod binder;
mod targets;

use std::process::ExitCode;

use renderer::{Lesson, LessonRequirements};

use crate::binder::FramebufferSwapBinder;

fn lesson() -> Lesson {
    Lesson {
        title: "fboswap",
        summary: "This lesson compares switching between complete offscreen framebuffers and re-attaching targets on one framebuffer.",
        switches: "framebuffer switching and target re-attachment",
        window_size: Lesson::WINDOW_SIZE,
        requirements: LessonRequirements::default(),
    }
}

fn main() -> ExitCode {
    renderer::initialise_tracing();
    renderer::run_guarded(|| renderer::run_lesson::<FramebufferSwapBinder>(&lesson()))
}
