use std::borrow::Cow;

use anyhow::Result;
use phasebench::BenchError;

/// Shared vertex stage: an attribute-less four vertex strip covering the
/// centre of the target, collapsed horizontally by `quad.offset`.
pub const QUAD_VERTEX_WGSL: &str = include_str!("shaders/quad.wgsl");

/// Entry point of the shared vertex stage.
pub const QUAD_VERTEX_ENTRY: &str = "vs_main";

/// Joins the shared vertex stage with a lesson fragment stage.
///
/// Fragment sources see the `quad` uniform, `VertexOut` and
/// `texel_coords` declared by the prelude.
pub fn compose_quad_shader(fragment: &str) -> String {
    format!("{QUAD_VERTEX_WGSL}\n// fragment stage\n{fragment}")
}

/// Compiles WGSL and turns validation failures into `ResourceCreation` errors
/// instead of the default uncaptured-error panic.
pub fn compile_wgsl(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_owned())),
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(BenchError::resource(format!("shader `{label}`"), err).into());
    }
    tracing::debug!(label, bytes = source.len(), "compiled shader module");
    Ok(module)
}

/// Compiles a lesson fragment stage together with the shared quad vertex stage.
pub fn compile_quad_shader(
    device: &wgpu::Device,
    label: &str,
    fragment: &str,
) -> Result<wgpu::ShaderModule> {
    compile_wgsl(device, label, &compose_quad_shader(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_declares_vertex_stage_and_uniform() {
        assert!(QUAD_VERTEX_WGSL.contains("@vertex"));
        assert!(QUAD_VERTEX_WGSL.contains(&format!("fn {QUAD_VERTEX_ENTRY}(")));
        assert!(QUAD_VERTEX_WGSL.contains("var<uniform> quad"));
    }

    #[test]
    fn composed_source_keeps_prelude_first() {
        let fragment = "@fragment\nfn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let composed = compose_quad_shader(fragment);
        let vertex_at = composed.find("@vertex").unwrap();
        let fragment_at = composed.find("@fragment").unwrap();
        assert!(vertex_at < fragment_at);
        assert!(composed.ends_with(fragment));
    }
}
