//! GPU plumbing shared by renderers.

pub mod gpu;
pub mod shader;

pub use gpu::GpuContext;
pub use shader::{CompiledShader, SegmentedShader};
