use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Mirrors `QuadParams` in `shaders/quad.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuadUniforms {
    pub offset: f32,
    pub scale: f32,
    pub _padding: [f32; 2],
}

impl QuadUniforms {
    pub fn new(offset: f32, scale: f32) -> Self {
        Self {
            offset,
            scale,
            _padding: [0.0; 2],
        }
    }
}

/// Uniform buffer holding the quad parameters, rewritten before each draw.
pub struct QuadUniformBuffer {
    buffer: wgpu::Buffer,
    last: Option<QuadUniforms>,
}

impl QuadUniformBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad uniforms"),
            contents: bytemuck::bytes_of(&QuadUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self { buffer, last: None }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    /// Uploads `uniforms` unless they match what the buffer already holds.
    pub fn write(&mut self, queue: &wgpu::Queue, uniforms: QuadUniforms) {
        if self.last == Some(uniforms) {
            return;
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&uniforms));
        self.last = Some(uniforms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_wgsl_struct() {
        assert_eq!(std::mem::size_of::<QuadUniforms>(), 16);
        let uniforms = QuadUniforms::new(0.25, 255.0);
        let bytes = bytemuck::bytes_of(&uniforms);
        assert_eq!(&bytes[0..4], &0.25f32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &255.0f32.to_ne_bytes());
    }
}
