use anyhow::Result;
use phasebench::ConfigurationCatalog;
use renderer::gpu::pipeline::{
    create_quad_pipeline, draw_quad, sampler_entry, storage_entry, texture_entry, uniform_entry,
    QuadPipelineDesc,
};
use renderer::gpu::texture::{create_rgba_texture, load_sample_image, nearest_repeat_sampler};
use renderer::gpu::{QuadUniformBuffer, QuadUniforms};
use renderer::{compile_quad_shader, FrameView, GpuContext, ResourceBinder};
use wgpu::util::DeviceExt;

use crate::counters::{counter_configurations, CounterStorage};

const SAMPLED_FRAGMENT: &str = include_str!("shaders/sampled.wgsl");
const COUNTER_BUFFER_FRAGMENT: &str = include_str!("shaders/counter_buffer.wgsl");
const STORAGE_BLOCK_FRAGMENT: &str = include_str!("shaders/storage_block.wgsl");

/// Counter buffer plus the bind group exposing it at binding 3.
struct CounterBinding {
    _buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Increments 128 atomics per fragment, either in a counters-only buffer or in
/// a general storage block.
pub struct AtomicsBinder {
    uniforms: QuadUniformBuffer,
    /// Plain textured quad drawn while settling.
    sampled: wgpu::RenderPipeline,
    counter_buffer: wgpu::RenderPipeline,
    storage_block: wgpu::RenderPipeline,
    counter_binding: CounterBinding,
    storage_binding: CounterBinding,
}

impl AtomicsBinder {
    fn pipeline(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        fragment: &str,
    ) -> Result<wgpu::RenderPipeline> {
        let module = compile_quad_shader(&gpu.device, label, fragment)?;
        gpu.checked(label, |device| {
            create_quad_pipeline(
                device,
                &QuadPipelineDesc {
                    label,
                    module: &module,
                    fragment_entry: "fs_main",
                    bind_group_layout: layout,
                    target_format: gpu.surface_format(),
                },
            )
        })
    }

    fn counter_binding(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        uniforms: &QuadUniformBuffer,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        storage: CounterStorage,
    ) -> Result<CounterBinding> {
        let label = storage.label();
        gpu.checked(label, |device| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&storage.initial_contents()),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: buffer.as_entire_binding(),
                    },
                ],
            });
            CounterBinding {
                _buffer: buffer,
                bind_group,
            }
        })
    }

    fn binding(&self, storage: CounterStorage) -> &CounterBinding {
        match storage {
            CounterStorage::CounterBuffer => &self.counter_binding,
            CounterStorage::StorageBlock => &self.storage_binding,
        }
    }
}

impl ResourceBinder for AtomicsBinder {
    type Params = CounterStorage;

    fn create(gpu: &GpuContext) -> Result<(Self, ConfigurationCatalog<CounterStorage>)> {
        let catalog = ConfigurationCatalog::new(counter_configurations())?;

        // One layout for every pipeline; the settle shader ignores binding 3.
        let layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("atomics layout"),
                entries: &[
                    uniform_entry(0),
                    texture_entry(1, wgpu::TextureSampleType::Float { filterable: true }),
                    sampler_entry(2, wgpu::SamplerBindingType::Filtering),
                    storage_entry(3),
                ],
            });

        let image = load_sample_image();
        let texture = gpu.checked("atomics texture", |device| {
            create_rgba_texture(
                device,
                &gpu.queue,
                "atomics texture",
                std::slice::from_ref(&image),
                wgpu::TextureUsages::empty(),
            )
        })??;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = nearest_repeat_sampler(&gpu.device, "atomics sampler");
        let uniforms = QuadUniformBuffer::new(&gpu.device);

        let counter_binding = Self::counter_binding(
            gpu,
            &layout,
            &uniforms,
            &view,
            &sampler,
            CounterStorage::CounterBuffer,
        )?;
        let storage_binding = Self::counter_binding(
            gpu,
            &layout,
            &uniforms,
            &view,
            &sampler,
            CounterStorage::StorageBlock,
        )?;

        let binder = Self {
            sampled: Self::pipeline(gpu, &layout, "atomics settle", SAMPLED_FRAGMENT)?,
            counter_buffer: Self::pipeline(
                gpu,
                &layout,
                "atomics counter buffer",
                COUNTER_BUFFER_FRAGMENT,
            )?,
            storage_block: Self::pipeline(
                gpu,
                &layout,
                "atomics storage block",
                STORAGE_BLOCK_FRAGMENT,
            )?,
            uniforms,
            counter_binding,
            storage_binding,
        };
        tracing::debug!(
            counter_bytes = CounterStorage::CounterBuffer.buffer_size(),
            block_bytes = CounterStorage::StorageBlock.buffer_size(),
            "cleared counter buffers"
        );
        Ok((binder, catalog))
    }

    fn encode(
        &mut self,
        gpu: &GpuContext,
        frame: &FrameView<'_, CounterStorage>,
        target: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<()> {
        self.uniforms
            .write(&gpu.queue, QuadUniforms::new(frame.quad_offset(), 1.0));

        let storage = *frame.params();
        let pipeline = if frame.is_settling() {
            &self.sampled
        } else {
            match storage {
                CounterStorage::CounterBuffer => &self.counter_buffer,
                CounterStorage::StorageBlock => &self.storage_block,
            }
        };
        // Passes that write storage are ordered by wgpu's usage tracking, so
        // no explicit barrier is recorded between frames.
        draw_quad(encoder, target, pipeline, &self.binding(storage).bind_group);
        Ok(())
    }
}
