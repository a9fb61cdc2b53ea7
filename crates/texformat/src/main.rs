mod binder;
mod formats;

use std::process::ExitCode;

use renderer::{Lesson, LessonRequirements};

use crate::binder::TextureFormatBinder;

fn lesson() -> Lesson {
    Lesson {
        title: "texformat",
        summary: "This lesson compares the read performance of the same image stored in different texture formats.",
        switches: "texture formats",
        window_size: Lesson::WINDOW_SIZE,
        requirements: LessonRequirements {
            optional_features: wgpu::Features::TEXTURE_FORMAT_16BIT_NORM,
            ..LessonRequirements::default()
        },
    }
}

fn main() -> ExitCode {
    renderer::initialise_tracing();
    renderer::run_guarded(|| renderer::run_lesson::<TextureFormatBinder>(&lesson()))
}
