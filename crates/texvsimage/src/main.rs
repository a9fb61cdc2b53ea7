mod binder;
mod options;

use std::process::ExitCode;

use renderer::{Lesson, LessonRequirements};

use crate::binder::TextureVsImageBinder;
use crate::options::MINIFY_SIZE;

fn lesson() -> Lesson {
    Lesson {
        title: "texvsimage",
        summary: "This lesson compares the read performance between filtered texture sampling and direct texel loads.",
        switches: "sampler configurations",
        window_size: Lesson::WINDOW_SIZE,
        requirements: LessonRequirements {
            min_texture_dimension: MINIFY_SIZE,
            ..LessonRequirements::default()
        },
    }
}

fn main() -> ExitCode {
    renderer::initialise_tracing();
    renderer::run_guarded(|| renderer::run_lesson::<TextureVsImageBinder>(&lesson()))
}
