use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use phasebench::{BenchError, Clock, ConsoleSink, PhaseTimings};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::driver::{FrameDriver, FrameStep};
use crate::gpu::GpuContext;
use crate::input::OperatorInput;
use crate::lesson::{Lesson, ResourceBinder};

type LessonDriver<P> = FrameDriver<P, OperatorInput, ConsoleSink<std::io::Stdout>>;

/// Result of one redraw.
#[derive(Debug)]
enum FrameStatus {
    Presented,
    Exit,
}

#[derive(Debug)]
enum FrameError {
    Surface(wgpu::SurfaceError),
    Fatal(anyhow::Error),
}

/// GPU state for the lesson window. Field order keeps the surface dropped
/// before the window it was created from.
struct WindowState<B: ResourceBinder> {
    binder: B,
    gpu: GpuContext,
    window: Arc<Window>,
}

impl<B: ResourceBinder> WindowState<B> {
    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        self.binder.resize(&self.gpu);
    }

    fn render_frame(&mut self, driver: &mut LessonDriver<B::Params>) -> Result<FrameStatus, FrameError> {
        let frame = self
            .gpu
            .surface
            .get_current_texture()
            .map_err(FrameError::Surface)?;

        let view = match driver.step().map_err(|err| FrameError::Fatal(err.into()))? {
            FrameStep::Exit => return Ok(FrameStatus::Exit),
            FrameStep::Draw(view) => view,
        };

        let target = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.binder
            .encode(&self.gpu, &view, &target, &mut encoder)
            .map_err(FrameError::Fatal)?;
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(FrameStatus::Presented)
    }
}

/// Opens the lesson window and drives frames until the operator exits.
pub fn run_lesson<B: ResourceBinder>(lesson: &Lesson) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let (width, height) = lesson.window_size;
    let window = WindowBuilder::new()
        .with_title(lesson.title)
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create lesson window: {err}"))?;
    let window = Arc::new(window);

    let gpu = GpuContext::new(window.as_ref(), window.inner_size(), &lesson.requirements)?;
    println!("GPU adapter: {}", gpu.adapter.name);
    println!("GPU backend: {:?} ({:?})", gpu.adapter.backend, gpu.adapter.device_type);
    println!("GPU driver: {}\n", gpu.adapter.driver);
    println!("{}", lesson.summary);
    println!(
        "Press <esc> (or type q) to exit; <space bar> (or enter) to switch between {} ...\n",
        lesson.switches
    );

    let (binder, catalog) =
        B::create(&gpu).with_context(|| format!("failed to build {} resources", lesson.title))?;
    let clock = Clock::monotonic().map_err(BenchError::from)?;
    let mut driver = FrameDriver::new(
        clock,
        PhaseTimings::default(),
        catalog,
        OperatorInput::with_console(),
        ConsoleSink::stdout(),
    )?;

    let mut state = WindowState {
        binder,
        gpu,
        window,
    };
    let mut fatal = None;

    let run_result = event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state == ElementState::Pressed && !event.repeat {
                            driver.input_mut().handle_key(&event.logical_key);
                        }
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                    }
                    WindowEvent::RedrawRequested => match state.render_frame(&mut driver) {
                        Ok(FrameStatus::Presented) => {}
                        Ok(FrameStatus::Exit) => elwt.exit(),
                        Err(FrameError::Surface(err)) => match err {
                            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                                let size = state.gpu.size;
                                state.resize(size);
                            }
                            wgpu::SurfaceError::OutOfMemory => {
                                fatal = Some(anyhow!("surface out of memory"));
                                elwt.exit();
                            }
                            wgpu::SurfaceError::Timeout => {
                                tracing::debug!("surface timeout; retrying next frame");
                            }
                            other => {
                                tracing::warn!("surface error: {other:?}; retrying next frame");
                            }
                        },
                        Err(FrameError::Fatal(err)) => {
                            fatal = Some(err);
                            elwt.exit();
                        }
                    },
                    _ => {}
                }
            }
            Event::AboutToWait => {
                state.window.request_redraw();
            }
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("lesson event loop error: {err}"))?;
    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
