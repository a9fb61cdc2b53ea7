use anyhow::{anyhow, Context as AnyhowContext, Result};
use phasebench::BenchError;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::lesson::LessonRequirements;

/// Adapter facts printed at startup and used in diagnostics.
#[derive(Clone, Debug)]
pub struct AdapterSummary {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub driver: String,
}

impl AdapterSummary {
    fn from_info(info: &wgpu::AdapterInfo) -> Self {
        let driver = if info.driver_info.is_empty() {
            info.driver.clone()
        } else {
            format!("{} {}", info.driver, info.driver_info)
        };
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            driver,
        }
    }
}

/// Instance, surface, device and queue for one lesson window.
pub struct GpuContext {
    _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub adapter: AdapterSummary,
    features: wgpu::Features,
}

impl GpuContext {
    /// Creates the device after checking the lesson's capability requirements.
    ///
    /// A missing capability surfaces as `BenchError::FatalPrecondition`.
    pub fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        requirements: &LessonRequirements,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        // The window is owned next to this context and outlives the surface.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_summary = AdapterSummary::from_info(&adapter.get_info());
        let limits = adapter.limits();
        let available = adapter.features();
        tracing::debug!(
            name = %adapter_summary.name,
            backend = ?adapter_summary.backend,
            device_type = ?adapter_summary.device_type,
            "selected GPU adapter"
        );

        requirements.check(
            &adapter_summary.name,
            available,
            adapter.get_downlevel_capabilities().flags,
            &limits,
        )?;

        let optional = requirements.optional_features & available;
        let skipped = requirements.optional_features - optional;
        if !skipped.is_empty() {
            tracing::warn!(?skipped, "optional adapter features unavailable");
        }
        let required_features = requirements.features | optional;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("phasebench device"),
            required_features,
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let max_dimension = limits.max_texture_dimension_2d;
        let width = initial_size.width.max(1);
        let height = initial_size.height.max(1);
        if width > max_dimension || height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}"
            );
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
        let present_mode = select_present_mode(&surface_caps.present_modes);
        if present_mode != wgpu::PresentMode::Immediate {
            tracing::warn!(
                ?present_mode,
                "immediate presentation unavailable; frame rate may be tied to the display"
            );
        }
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let size = PhysicalSize::new(width, height);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::debug!(?present_mode, ?surface_format, width, height, "configured surface");

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size,
            adapter: adapter_summary,
            features: required_features,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Whether `features` were enabled on the device.
    pub fn supports(&self, features: wgpu::Features) -> bool {
        self.features.contains(features)
    }

    /// Runs `build` inside validation and out-of-memory error scopes so a
    /// rejected resource becomes `BenchError::ResourceCreation`.
    pub fn checked<T>(&self, resource: &str, build: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = build(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(BenchError::resource(resource, err).into());
        }
        Ok(value)
    }
}

/// Prefers presentation without vertical sync: Immediate, then Mailbox,
/// then whatever the surface offers first (Fifo is always supported).
pub fn select_present_mode(available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|mode| available.contains(mode))
        .or_else(|| {
            available
                .iter()
                .copied()
                .find(|mode| *mode == wgpu::PresentMode::Fifo)
        })
        .unwrap_or(wgpu::PresentMode::Fifo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::PresentMode;

    #[test]
    fn immediate_wins_when_offered() {
        let modes = [PresentMode::Fifo, PresentMode::Mailbox, PresentMode::Immediate];
        assert_eq!(select_present_mode(&modes), PresentMode::Immediate);
    }

    #[test]
    fn mailbox_is_second_choice() {
        let modes = [PresentMode::Fifo, PresentMode::Mailbox];
        assert_eq!(select_present_mode(&modes), PresentMode::Mailbox);
    }

    #[test]
    fn fifo_is_the_fallback() {
        assert_eq!(select_present_mode(&[PresentMode::Fifo]), PresentMode::Fifo);
        assert_eq!(select_present_mode(&[]), PresentMode::Fifo);
    }
}
