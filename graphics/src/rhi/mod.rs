//! Rendering hardware interface.
//!
//! The frame graph talks to the GPU through two object-safe traits:
//! [`RhiBackend`] owns device-level operations (resource creation, queue
//! submission) and [`RhiCommandList`] records commands. The only backend in
//! tree is [`DummyBackend`](dummy::DummyBackend), which records every command
//! into an inspectable log instead of touching hardware.

mod dummy;

pub use dummy::{DummyBackend, RecordedCommand, SubmittedBatch};

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::GraphicsError;
use crate::types::{
    BufferDescriptor, ClearValue, ComputePipelineDesc, Extent3d, LoadOp, RasterPipelineDesc,
    SamplerDescriptor, ScissorRect, StoreOp, TextureDescriptor, TextureFormat, Viewport,
};

/// GPU-side state of a texture, used to derive barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    /// Contents undefined, no layout established yet.
    #[default]
    Undefined,
    /// Bound as a color attachment.
    ColorAttachment,
    /// Bound as a depth/stencil attachment.
    DepthStencilAttachment,
    /// Sampled or read from a shader.
    ShaderRead,
    /// Readable and writable from shaders in the same pass.
    General,
}

/// CPU-visible completion flag for a GPU submission.
///
/// Cloning shares the underlying flag, so a fence returned from submit can
/// be waited on from multiple places.
#[derive(Debug, Clone, Default)]
pub struct Fence {
    signaled: Arc<AtomicBool>,
}

impl Fence {
    /// Create an unsignaled fence.
    pub fn new() -> Self {
        Self {
            signaled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a fence that is already signaled.
    pub fn signaled() -> Self {
        Self {
            signaled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Check completion without blocking.
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    /// Mark the submission complete.
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    /// Return the fence to the unsignaled state.
    pub fn reset(&self) {
        self.signaled.store(false, Ordering::Release);
    }

    /// Block until the fence is signaled.
    pub fn wait(&self) {
        while !self.is_signaled() {
            std::thread::yield_now();
        }
    }

    /// Block until the fence is signaled or `timeout` elapses.
    ///
    /// Returns `true` if the fence was signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        while !self.is_signaled() {
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::yield_now();
        }
        true
    }
}

/// Backend-owned texture object.
///
/// Carries enough metadata for barrier derivation and render pass setup;
/// the `id` ties it back to the backend's internal bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhiTexture {
    id: u64,
    name: String,
    format: TextureFormat,
    size: Extent3d,
}

impl RhiTexture {
    pub(crate) fn new(id: u64, name: impl Into<String>, desc: &TextureDescriptor) -> Self {
        Self {
            id,
            name: name.into(),
            format: desc.format,
            size: desc.size,
        }
    }

    /// Backend-internal identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Debug name the texture was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texel format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Size of the base mip level.
    pub fn size(&self) -> Extent3d {
        self.size
    }
}

/// Backend-owned buffer object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhiBuffer {
    id: u64,
    name: String,
    size: u64,
}

impl RhiBuffer {
    pub(crate) fn new(id: u64, name: impl Into<String>, desc: &BufferDescriptor) -> Self {
        Self {
            id,
            name: name.into(),
            size: desc.size,
        }
    }

    /// Backend-internal identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Debug name the buffer was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Color attachment binding for a render pass.
#[derive(Debug)]
pub struct RenderPassColorAttachment<'a> {
    pub texture: &'a RhiTexture,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearValue,
}

/// Depth/stencil attachment binding for a render pass.
#[derive(Debug)]
pub struct RenderPassDepthAttachment<'a> {
    pub texture: &'a RhiTexture,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearValue,
}

/// Device-level backend operations.
pub trait RhiBackend: Send + Sync {
    /// Backend name for diagnostics.
    fn name(&self) -> &str;

    /// Create a texture. The descriptor has already been validated.
    fn create_texture(
        &self,
        name: &str,
        desc: &TextureDescriptor,
    ) -> Result<RhiTexture, GraphicsError>;

    /// Destroy a texture. Must only be called when the GPU is done with it.
    fn destroy_texture(&self, texture: &RhiTexture);

    /// Create a buffer. The descriptor has already been validated.
    fn create_buffer(&self, name: &str, desc: &BufferDescriptor)
        -> Result<RhiBuffer, GraphicsError>;

    /// Destroy a buffer. Must only be called when the GPU is done with it.
    fn destroy_buffer(&self, buffer: &RhiBuffer);

    /// Create a command list in the idle state.
    fn create_command_list(&self) -> Box<dyn RhiCommandList>;

    /// Submit an ended command list to the queue.
    ///
    /// The returned fence is signaled when the GPU finishes the batch.
    fn submit(&self, cmd: &mut dyn RhiCommandList) -> Fence;
}

/// Command recording operations.
pub trait RhiCommandList: Send {
    fn begin(&mut self);
    fn end(&mut self);

    /// Discard recorded commands and return to the initial state.
    fn reset(&mut self);

    /// Transition a texture between states.
    fn pipeline_barrier(&mut self, texture: &RhiTexture, old: ResourceState, new: ResourceState);

    fn begin_render_pass(
        &mut self,
        colors: &[RenderPassColorAttachment<'_>],
        depth: Option<&RenderPassDepthAttachment<'_>>,
    );
    fn end_render_pass(&mut self);

    fn bind_raster_pipeline(&mut self, desc: &RasterPipelineDesc);
    fn bind_compute_pipeline(&mut self, desc: &ComputePipelineDesc);

    fn set_viewport(&mut self, viewport: &Viewport);
    fn set_scissor(&mut self, rect: &ScissorRect);

    /// Bind raw uniform data to a slot.
    fn set_uniform_bytes(&mut self, slot: u32, data: &[u8]);
    /// Bind a texture for sampling to a slot.
    fn set_texture(&mut self, slot: u32, texture: &RhiTexture);
    /// Bind a sampler to a slot.
    fn set_sampler(&mut self, slot: u32, desc: &SamplerDescriptor);
    /// Bind a texture for unordered (storage) access to a slot.
    fn set_unordered_access(&mut self, slot: u32, texture: &RhiTexture);

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &RhiBuffer);
    fn set_index_buffer(&mut self, buffer: &RhiBuffer);

    fn draw(&mut self, vertex_count: u32, instance_count: u32);
    fn draw_indexed(&mut self, index_count: u32, instance_count: u32);
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Downcast support for backends that need their concrete list type
    /// back at submit time.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
