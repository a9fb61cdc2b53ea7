use anyhow::{Context, Result};
use phasebench::{Configuration, ConfigurationCatalog};
use renderer::gpu::pipeline::{
    create_quad_pipeline, draw_quad, sampler_entry, texture_entry, uniform_entry, QuadPipelineDesc,
};
use renderer::gpu::texture::{
    create_encoded_texture, load_sample_image, nearest_repeat_sampler, RgbaImage,
};
use renderer::gpu::{QuadUniformBuffer, QuadUniforms};
use renderer::{compile_quad_shader, FrameView, GpuContext, ResourceBinder};

use crate::formats::{format_configurations, FormatParams, SampleKind};

const FLOAT_FRAGMENT: &str = include_str!("shaders/float.wgsl");
const SINT_FRAGMENT: &str = include_str!("shaders/sint.wgsl");
const UINT_FRAGMENT: &str = include_str!("shaders/uint.wgsl");

/// One pipeline per fragment stage kind.
struct ReadPipeline {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
}

impl ReadPipeline {
    fn new(gpu: &GpuContext, kind: SampleKind) -> Result<Self> {
        let (label, fragment) = match kind {
            SampleKind::Float => ("texformat float", FLOAT_FRAGMENT),
            SampleKind::Sint => ("texformat sint", SINT_FRAGMENT),
            SampleKind::Uint => ("texformat uint", UINT_FRAGMENT),
        };
        let module = compile_quad_shader(&gpu.device, label, fragment)?;

        let mut entries = vec![uniform_entry(0), texture_entry(1, kind.texture_sample_type())];
        if kind == SampleKind::Float {
            entries.push(sampler_entry(2, wgpu::SamplerBindingType::NonFiltering));
        }
        let layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &entries,
            });
        let pipeline = gpu.checked(label, |device| {
            create_quad_pipeline(
                device,
                &QuadPipelineDesc {
                    label,
                    module: &module,
                    fragment_entry: "fs_main",
                    bind_group_layout: &layout,
                    target_format: gpu.surface_format(),
                },
            )
        })?;
        Ok(Self { layout, pipeline })
    }
}

/// Reads one full-window image per frame from a texture in the configured
/// format.
pub struct TextureFormatBinder {
    uniforms: QuadUniformBuffer,
    float: ReadPipeline,
    sint: ReadPipeline,
    uint: ReadPipeline,
    /// Parallel to the catalog.
    bind_groups: Vec<wgpu::BindGroup>,
}

impl TextureFormatBinder {
    fn pipeline(&self, kind: SampleKind) -> &ReadPipeline {
        match kind {
            SampleKind::Float => &self.float,
            SampleKind::Sint => &self.sint,
            SampleKind::Uint => &self.uint,
        }
    }

    fn bind_format(
        &self,
        gpu: &GpuContext,
        sampler: &wgpu::Sampler,
        image: &RgbaImage,
        configuration: &Configuration<FormatParams>,
    ) -> Result<wgpu::BindGroup> {
        let params = configuration.params();
        let label = format!("texformat {}", configuration.name());
        let texture = gpu.checked(&label, |device| {
            create_encoded_texture(device, &gpu.queue, &label, image, params.encoding)
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniforms.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&view),
            },
        ];
        if params.kind == SampleKind::Float {
            entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        gpu.checked(&label, |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&label),
                layout: &self.pipeline(params.kind).layout,
                entries: &entries,
            })
        })
    }
}

impl ResourceBinder for TextureFormatBinder {
    type Params = FormatParams;

    fn create(gpu: &GpuContext) -> Result<(Self, ConfigurationCatalog<FormatParams>)> {
        let catalog = ConfigurationCatalog::new(format_configurations())?.filter(|configuration| {
            let supported = gpu.supports(configuration.params().required_features());
            if !supported {
                tracing::warn!(
                    format = configuration.name(),
                    "format unsupported on this device; skipping"
                );
            }
            supported
        })?;

        let mut binder = Self {
            uniforms: QuadUniformBuffer::new(&gpu.device),
            float: ReadPipeline::new(gpu, SampleKind::Float)?,
            sint: ReadPipeline::new(gpu, SampleKind::Sint)?,
            uint: ReadPipeline::new(gpu, SampleKind::Uint)?,
            bind_groups: Vec::with_capacity(catalog.len()),
        };

        let image = load_sample_image();
        let sampler = nearest_repeat_sampler(&gpu.device, "texformat sampler");
        for configuration in catalog.iter() {
            let bind_group = binder.bind_format(gpu, &sampler, &image, configuration)?;
            binder.bind_groups.push(bind_group);
        }
        tracing::info!(
            formats = catalog.len(),
            width = image.width(),
            height = image.height(),
            "uploaded sample image in every format"
        );
        Ok((binder, catalog))
    }

    fn encode(
        &mut self,
        gpu: &GpuContext,
        frame: &FrameView<'_, FormatParams>,
        target: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<()> {
        let params = frame.params();
        self.uniforms.write(
            &gpu.queue,
            QuadUniforms::new(frame.quad_offset(), params.read_scale()),
        );
        let bind_group = self
            .bind_groups
            .get(frame.index)
            .with_context(|| format!("no resources bound for configuration {}", frame.index))?;
        draw_quad(encoder, target, &self.pipeline(params.kind).pipeline, bind_group);
        Ok(())
    }
}
