use anyhow::Result;
use phasebench::ConfigurationCatalog;
use renderer::gpu::pipeline::{
    create_quad_pipeline, draw_quad, sampler_entry, texture_entry, uniform_entry, QuadPipelineDesc,
};
use renderer::gpu::texture::{create_rgba_texture, load_sample_image, nearest_repeat_sampler};
use renderer::gpu::{QuadUniformBuffer, QuadUniforms};
use renderer::{compile_quad_shader, compile_wgsl, FrameView, GpuContext, ResourceBinder};

use crate::targets::{switch_configurations, target_extent, target_slot, SwitchMode, TARGET_FORMAT};

const SAMPLED_FRAGMENT: &str = include_str!("shaders/sampled.wgsl");
const BLIT_WGSL: &str = include_str!("shaders/blit.wgsl");

/// Offscreen colour texture plus the state that makes it a ready framebuffer.
struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    blit_group: wgpu::BindGroup,
}

/// Copies an offscreen target onto the swapchain with linear filtering.
struct Blitter {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    sampler: wgpu::Sampler,
}

impl Blitter {
    fn new(gpu: &GpuContext) -> Result<Self> {
        let module = compile_wgsl(&gpu.device, "fboswap blit", BLIT_WGSL)?;
        let layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("fboswap blit"),
                entries: &[
                    texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
                    sampler_entry(1, wgpu::SamplerBindingType::Filtering),
                ],
            });
        let pipeline_layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("fboswap blit"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
        let pipeline = gpu.checked("fboswap blit pipeline", |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("fboswap blit"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_blit"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_blit"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.surface_format(),
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            })
        })?;
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("fboswap blit sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Ok(Self {
            layout,
            pipeline,
            sampler,
        })
    }

    fn bind(&self, device: &wgpu::Device, view: &wgpu::TextureView) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fboswap blit source"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn blit(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        source: &wgpu::BindGroup,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("fboswap blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, source, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

/// Renders into one of two offscreen targets per frame, then blits it to the
/// window.
pub struct FramebufferSwapBinder {
    uniforms: QuadUniformBuffer,
    scene_group: wgpu::BindGroup,
    offscreen_pipeline: wgpu::RenderPipeline,
    /// Quad drawn straight to the swapchain while settling.
    window_pipeline: wgpu::RenderPipeline,
    blitter: Blitter,
    targets: [OffscreenTarget; 2],
}

impl FramebufferSwapBinder {
    fn offscreen_target(
        gpu: &GpuContext,
        blitter: &Blitter,
        slot: usize,
    ) -> Result<OffscreenTarget> {
        let label = format!("fboswap target {slot}");
        let texture = gpu.checked(&label, |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&label),
                size: target_extent(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let blit_group = blitter.bind(&gpu.device, &view);
        Ok(OffscreenTarget {
            texture,
            view,
            blit_group,
        })
    }
}

impl ResourceBinder for FramebufferSwapBinder {
    type Params = SwitchMode;

    fn create(gpu: &GpuContext) -> Result<(Self, ConfigurationCatalog<SwitchMode>)> {
        let catalog = ConfigurationCatalog::new(switch_configurations())?;

        let module = compile_quad_shader(&gpu.device, "fboswap scene", SAMPLED_FRAGMENT)?;
        let scene_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("fboswap scene"),
                entries: &[
                    uniform_entry(0),
                    texture_entry(1, wgpu::TextureSampleType::Float { filterable: true }),
                    sampler_entry(2, wgpu::SamplerBindingType::Filtering),
                ],
            });
        let scene_pipeline = |label: &str, target_format: wgpu::TextureFormat| {
            gpu.checked(label, |device| {
                create_quad_pipeline(
                    device,
                    &QuadPipelineDesc {
                        label,
                        module: &module,
                        fragment_entry: "fs_main",
                        bind_group_layout: &scene_layout,
                        target_format,
                    },
                )
            })
        };
        let offscreen_pipeline = scene_pipeline("fboswap offscreen", TARGET_FORMAT)?;
        let window_pipeline = scene_pipeline("fboswap window", gpu.surface_format())?;

        let image = load_sample_image();
        let texture = gpu.checked("fboswap texture", |device| {
            create_rgba_texture(
                device,
                &gpu.queue,
                "fboswap texture",
                std::slice::from_ref(&image),
                wgpu::TextureUsages::empty(),
            )
        })??;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = nearest_repeat_sampler(&gpu.device, "fboswap sampler");
        let uniforms = QuadUniformBuffer::new(&gpu.device);
        let scene_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fboswap scene"),
            layout: &scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.binding(),
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
        });

        let blitter = Blitter::new(gpu)?;
        let targets = [
            Self::offscreen_target(gpu, &blitter, 0)?,
            Self::offscreen_target(gpu, &blitter, 1)?,
        ];
        tracing::debug!(
            targets = targets.len(),
            format = ?TARGET_FORMAT,
            "created offscreen targets"
        );

        Ok((
            Self {
                uniforms,
                scene_group,
                offscreen_pipeline,
                window_pipeline,
                blitter,
                targets,
            },
            catalog,
        ))
    }

    fn encode(
        &mut self,
        gpu: &GpuContext,
        frame: &FrameView<'_, SwitchMode>,
        target: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<()> {
        self.uniforms
            .write(&gpu.queue, QuadUniforms::new(frame.quad_offset(), 1.0));

        if frame.is_settling() {
            draw_quad(encoder, target, &self.window_pipeline, &self.scene_group);
            return Ok(());
        }

        let slot = &self.targets[target_slot(frame.frame)];
        let reattached;
        let (view, blit_group) = match frame.params() {
            SwitchMode::PrebuiltTargets => (&slot.view, &slot.blit_group),
            SwitchMode::Reattach => {
                let view = slot
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let blit_group = self.blitter.bind(&gpu.device, &view);
                reattached = (view, blit_group);
                (&reattached.0, &reattached.1)
            }
        };

        draw_quad(encoder, view, &self.offscreen_pipeline, &self.scene_group);
        self.blitter.blit(encoder, target, blit_group);
        Ok(())
    }
}
