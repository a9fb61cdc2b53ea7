use anyhow::{Context, Result};
use phasebench::ConfigurationCatalog;
use renderer::gpu::pipeline::{
    create_quad_pipeline, draw_quad, sampler_entry, texture_entry, uniform_entry, QuadPipelineDesc,
};
use renderer::gpu::texture::{
    build_mip_chain, create_rgba_texture, load_sample_image, resize_square,
};
use renderer::gpu::{QuadUniformBuffer, QuadUniforms};
use renderer::{compile_quad_shader, FrameView, GpuContext, ResourceBinder};

use crate::options::{
    sampler_configurations, window_image_level, SamplerOption, SourceTexture, IMAGE_PASS,
    MAGNIFY_SIZE, MAGNIFY_SOURCE_LEVEL, MINIFY_SIZE,
};

const SAMPLED_FRAGMENT: &str = include_str!("shaders/sampled.wgsl");
const TEXEL_LOAD_FRAGMENT: &str = include_str!("shaders/texel_load.wgsl");

struct QuadProgram {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
}

impl QuadProgram {
    fn new(
        gpu: &GpuContext,
        label: &str,
        fragment: &str,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> Result<Self> {
        let module = compile_quad_shader(&gpu.device, label, fragment)?;
        let layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries,
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

/// The two source textures. The magnification texture is a copy of one
/// level of the minification chain.
struct SourceTextures {
    minify: wgpu::Texture,
    magnify: wgpu::Texture,
}

impl SourceTextures {
    fn upload(gpu: &GpuContext) -> Result<Self> {
        let image = load_sample_image();
        let levels = build_mip_chain(resize_square(&image, MINIFY_SIZE));
        tracing::debug!(levels = levels.len(), size = MINIFY_SIZE, "built minification chain");

        let minify = gpu.checked("texvsimage minify", |device| {
            create_rgba_texture(
                device,
                &gpu.queue,
                "texvsimage minify",
                &levels,
                wgpu::TextureUsages::COPY_SRC,
            )
        })??;

        let extent = wgpu::Extent3d {
            width: MAGNIFY_SIZE,
            height: MAGNIFY_SIZE,
            depth_or_array_layers: 1,
        };
        let magnify = gpu.checked("texvsimage magnify", |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("texvsimage magnify"),
                size: extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        })?;

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("texvsimage magnify copy"),
            });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &minify,
                mip_level: MAGNIFY_SOURCE_LEVEL,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: &magnify,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            extent,
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        Ok(Self { minify, magnify })
    }

    fn get(&self, source: SourceTexture) -> &wgpu::Texture {
        match source {
            SourceTexture::Magnify => &self.magnify,
            SourceTexture::Minify => &self.minify,
        }
    }

    fn level_view(&self, level: u32) -> wgpu::TextureView {
        self.minify.create_view(&wgpu::TextureViewDescriptor {
            label: Some("texvsimage level"),
            base_mip_level: level,
            mip_level_count: Some(1),
            ..Default::default()
        })
    }
}

/// Alternates filtered sampling and unfiltered texel loads for each sampler
/// option.
pub struct TextureVsImageBinder {
    uniforms: QuadUniformBuffer,
    sampled: QuadProgram,
    texel_load: QuadProgram,
    sources: SourceTextures,
    /// Parallel to the catalog.
    sampled_groups: Vec<wgpu::BindGroup>,
    magnify_level_group: wgpu::BindGroup,
    window_level_group: wgpu::BindGroup,
    window_level: u32,
}

impl TextureVsImageBinder {
    fn level_group(
        device: &wgpu::Device,
        program: &QuadProgram,
        uniforms: &QuadUniformBuffer,
        sources: &SourceTextures,
        level: u32,
    ) -> wgpu::BindGroup {
        let view = sources.level_view(level);
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texvsimage image pass"),
            layout: &program.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
            ],
        })
    }

    fn sampled_group(&self, gpu: &GpuContext, option: &SamplerOption) -> Result<wgpu::BindGroup> {
        let view = self
            .sources
            .get(option.source)
            .create_view(&wgpu::TextureViewDescriptor {
                label: Some("texvsimage sampled"),
                mip_level_count: option.sampled_levels(),
                ..Default::default()
            });
        gpu.checked("texvsimage sampled bind group", |device| {
            let sampler = device.create_sampler(&option.sampler_descriptor());
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("texvsimage texture pass"),
                layout: &self.sampled.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.uniforms.binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            })
        })
    }
}

impl ResourceBinder for TextureVsImageBinder {
    type Params = SamplerOption;

    fn create(gpu: &GpuContext) -> Result<(Self, ConfigurationCatalog<SamplerOption>)> {
        let catalog = ConfigurationCatalog::new(sampler_configurations())?;

        let float = wgpu::TextureSampleType::Float { filterable: true };
        let sampled = QuadProgram::new(
            gpu,
            "texvsimage texture",
            SAMPLED_FRAGMENT,
            &[
                uniform_entry(0),
                texture_entry(1, float),
                sampler_entry(2, wgpu::SamplerBindingType::Filtering),
            ],
        )?;
        let texel_load = QuadProgram::new(
            gpu,
            "texvsimage image",
            TEXEL_LOAD_FRAGMENT,
            &[uniform_entry(0), texture_entry(1, float)],
        )?;

        let uniforms = QuadUniformBuffer::new(&gpu.device);
        let sources = SourceTextures::upload(gpu).context("failed to upload source textures")?;
        let window_level = window_image_level(gpu.size.width, gpu.size.height);
        let magnify_level_group =
            Self::level_group(&gpu.device, &texel_load, &uniforms, &sources, MAGNIFY_SOURCE_LEVEL);
        let window_level_group =
            Self::level_group(&gpu.device, &texel_load, &uniforms, &sources, window_level);

        let mut binder = Self {
            uniforms,
            sampled,
            texel_load,
            sources,
            sampled_groups: Vec::with_capacity(catalog.len()),
            magnify_level_group,
            window_level_group,
            window_level,
        };
        for configuration in catalog.iter() {
            let group = binder.sampled_group(gpu, configuration.params())?;
            binder.sampled_groups.push(group);
        }
        tracing::info!(window_level, "image pass reads window-sized level");
        Ok((binder, catalog))
    }

    fn resize(&mut self, gpu: &GpuContext) {
        let level = window_image_level(gpu.size.width, gpu.size.height);
        if level == self.window_level {
            return;
        }
        tracing::info!(
            from = self.window_level,
            to = level,
            "window resized; image pass level changed"
        );
        self.window_level = level;
        self.window_level_group =
            Self::level_group(&gpu.device, &self.texel_load, &self.uniforms, &self.sources, level);
    }

    fn encode(
        &mut self,
        gpu: &GpuContext,
        frame: &FrameView<'_, SamplerOption>,
        target: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<()> {
        self.uniforms
            .write(&gpu.queue, QuadUniforms::new(frame.quad_offset(), 1.0));

        let option = frame.params();
        let (pipeline, group) = if frame.pass == IMAGE_PASS && !frame.is_settling() {
            let level = option.image_level(gpu.size.width, gpu.size.height);
            let group = if level == self.window_level {
                &self.window_level_group
            } else {
                &self.magnify_level_group
            };
            (&self.texel_load.pipeline, group)
        } else {
            let group = self
                .sampled_groups
                .get(frame.index)
                .with_context(|| format!("no sampler bound for configuration {}", frame.index))?;
            (&self.sampled.pipeline, group)
        };
        draw_quad(encoder, target, pipeline, group);
        Ok(())
    }
}
