use anyhow::Result;
use phasebench::{BenchError, Configuration, ConfigurationCatalog, Phase};

use crate::gpu::GpuContext;

/// Capabilities a lesson cannot run without.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LessonRequirements {
    pub features: wgpu::Features,
    /// Requested when present; configurations that need them are dropped
    /// from the catalog otherwise.
    pub optional_features: wgpu::Features,
    pub downlevel: wgpu::DownlevelFlags,
    pub min_texture_dimension: u32,
}

impl Default for LessonRequirements {
    fn default() -> Self {
        Self {
            features: wgpu::Features::empty(),
            optional_features: wgpu::Features::empty(),
            downlevel: wgpu::DownlevelFlags::empty(),
            min_texture_dimension: 0,
        }
    }
}

impl LessonRequirements {
    pub fn check(
        &self,
        adapter: &str,
        features: wgpu::Features,
        downlevel: wgpu::DownlevelFlags,
        limits: &wgpu::Limits,
    ) -> Result<(), BenchError> {
        let missing_features = self.features - features;
        if !missing_features.is_empty() {
            return Err(BenchError::precondition(
                adapter,
                format!("features {missing_features:?}"),
            ));
        }
        let missing_downlevel = self.downlevel - downlevel;
        if !missing_downlevel.is_empty() {
            return Err(BenchError::precondition(
                adapter,
                format!("downlevel capabilities {missing_downlevel:?}"),
            ));
        }
        if limits.max_texture_dimension_2d < self.min_texture_dimension {
            return Err(BenchError::precondition(
                adapter,
                format!(
                    "2D textures of {} texels (maximum is {})",
                    self.min_texture_dimension, limits.max_texture_dimension_2d
                ),
            ));
        }
        Ok(())
    }
}

/// Static description of a lesson binary.
#[derive(Clone, Debug)]
pub struct Lesson {
    pub title: &'static str,
    /// One line printed at startup describing what is compared.
    pub summary: &'static str,
    /// What the space bar switches between.
    pub switches: &'static str,
    pub window_size: (u32, u32),
    pub requirements: LessonRequirements,
}

impl Lesson {
    pub const WINDOW_SIZE: (u32, u32) = (640, 480);
}

/// Everything a binder needs to encode one frame.
#[derive(Debug)]
pub struct FrameView<'a, P> {
    pub configuration: &'a Configuration<P>,
    pub index: usize,
    pub phase: Phase,
    pub animation: f32,
    pub pass: usize,
    /// Frames driven since startup, starting at 1.
    pub frame: u64,
}

impl<P> FrameView<'_, P> {
    pub fn is_settling(&self) -> bool {
        self.phase == Phase::Settling
    }

    /// Horizontal collapse for the shared quad vertex stage.
    pub fn quad_offset(&self) -> f32 {
        if self.is_settling() {
            self.animation
        } else {
            0.0
        }
    }

    pub fn params(&self) -> &P {
        self.configuration.params()
    }
}

/// Applies a configuration's GPU resources and encodes the frame's draw.
///
/// Resources are built once in [`ResourceBinder::create`]; `encode` only
/// selects among them.
pub trait ResourceBinder: Sized {
    type Params;

    fn create(gpu: &GpuContext) -> Result<(Self, ConfigurationCatalog<Self::Params>)>;

    fn resize(&mut self, _gpu: &GpuContext) {}

    fn encode(
        &mut self,
        gpu: &GpuContext,
        frame: &FrameView<'_, Self::Params>,
        target: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<()>;
}
