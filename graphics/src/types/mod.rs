//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the frame graph.

mod buffer;
mod common;
mod pipeline;
mod sampler;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{ClearValue, Extent3d, ScissorRect, Viewport};
pub use pipeline::{
    BlendMode, ColorAttachmentDesc, CompareFunction, ComputePipelineDesc, CullMode,
    DepthAttachmentDesc, DepthState, LoadOp, RasterPipelineDesc, RenderPassDesc, StoreOp,
};
pub use sampler::{AddressMode, FilterMode, SamplerDescriptor};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
