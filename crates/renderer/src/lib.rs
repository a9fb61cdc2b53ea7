//! Windowing and GPU host for the phasebench lessons.
//!
//! Each lesson binary describes itself with a [`Lesson`] and implements
//! [`ResourceBinder`]; everything else lives here. The overall flow is:
//!
//! ```text
//!   lesson main ──▶ run_guarded ──▶ run_lesson::<Binder>
//!                                       │ GpuContext (requirements check)
//!                                       │ Binder::create ─▶ resources + catalog
//!                                       ▼
//!                              winit event loop ──▶ RedrawRequested
//!                                       │
//!                     FrameDriver::step ─┤ input ─▶ PhaseController::tick ─▶ stdout
//!                                       ▼
//!                         Binder::encode ─▶ submit ─▶ present
//! ```
//!
//! Rendering never waits for the display: the surface prefers immediate
//! presentation and a redraw is requested as soon as the loop goes idle.

mod compile;
pub mod driver;
pub mod gpu;
pub mod input;
mod lesson;
mod window;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use anyhow::Result;
use phasebench::BenchError;
use tracing_subscriber::EnvFilter;

pub use compile::{compile_quad_shader, compile_wgsl, compose_quad_shader, QUAD_VERTEX_WGSL};
pub use driver::{FrameDriver, FrameStep};
pub use gpu::GpuContext;
pub use input::{InputPoller, OperatorCommand, OperatorInput};
pub use lesson::{FrameView, Lesson, LessonRequirements, ResourceBinder};
pub use window::run_lesson;

const PANIC_EXIT_CODE: u8 = 101;

/// Installs the fmt subscriber; `RUST_LOG` overrides the default `info`.
pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wgpu_core=warn,wgpu_hal=warn,naga=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Runs `body`, turning an error or a panic into one fatal diagnostic and a
/// non-zero exit code.
pub fn run_guarded<F>(body: F) -> ExitCode
where
    F: FnOnce() -> Result<()>,
{
    match guarded_exit_code(body) {
        0 => ExitCode::SUCCESS,
        code => ExitCode::from(code),
    }
}

fn guarded_exit_code<F>(body: F) -> u8
where
    F: FnOnce() -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            tracing::error!(error = %err, "lesson aborted");
            eprintln!("fatal: {err:#}");
            exit_code_for(&err)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(%message, "lesson panicked");
            eprintln!("fatal: unexpected failure: {message}");
            PANIC_EXIT_CODE
        }
    }
}

/// Exit code for `err`, taken from the first [`BenchError`] in its chain.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BenchError>())
        .map_or(1, BenchError::exit_code)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn exit_code_found_through_context() {
        let err = Err::<(), _>(BenchError::precondition("gpu", "storage"))
            .context("failed to open lesson window")
            .unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn plain_errors_exit_with_one() {
        assert_eq!(exit_code_for(&anyhow!("boom")), 1);
    }

    #[test]
    fn panic_payloads_are_described() {
        let payload = panic::catch_unwind(|| panic!("lost device")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "lost device");

        let formatted = panic::catch_unwind(|| panic!("frame {}", 7)).unwrap_err();
        assert_eq!(panic_message(formatted.as_ref()), "frame 7");
    }

    #[test]
    fn guarded_body_maps_outcomes_to_exit_codes() {
        assert_eq!(guarded_exit_code(|| Ok(())), 0);
        assert_eq!(guarded_exit_code(|| Err(anyhow!("nope"))), 1);
        assert_eq!(
            guarded_exit_code(|| Err(BenchError::precondition("gpu", "images").into())),
            2
        );
        assert_eq!(guarded_exit_code(|| panic!("device lost")), PANIC_EXIT_CODE);
    }
}
