//! GPU plumbing shared by every lesson.
//!
//! - `context` owns wgpu instance/device/surface wiring, checks lesson
//!   requirements and rebuilds swapchain state when the window resizes.
//! - `pipeline` builds the attribute-less quad pipelines and bind group
//!   layout entries.
//! - `uniforms` mirrors the quad parameter block and writes it through the
//!   queue each frame.
//! - `texture` loads the sample image, converts texels per format and builds
//!   mip chains.

mod context;
pub mod pipeline;
pub mod texture;
mod uniforms;

pub use context::{select_present_mode, AdapterSummary, GpuContext};
pub use uniforms::{QuadUniformBuffer, QuadUniforms};
