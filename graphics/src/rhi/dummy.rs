//! Dummy GPU backend for testing and development.
//!
//! This backend performs no GPU work. Every recorded command lands in an
//! inspectable log, and submissions complete either immediately or, in
//! manual completion mode, only when the test says so. That makes it
//! possible to test fence-driven recycling without real hardware.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::types::{
    BufferDescriptor, ComputePipelineDesc, RasterPipelineDesc, SamplerDescriptor, ScissorRect,
    TextureDescriptor, Viewport,
};

use super::{
    Fence, RenderPassColorAttachment, RenderPassDepthAttachment, ResourceState, RhiBackend,
    RhiBuffer, RhiCommandList, RhiTexture,
};

/// One command as recorded by the dummy backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Begin,
    End,
    PipelineBarrier {
        texture: String,
        old: ResourceState,
        new: ResourceState,
    },
    BeginRenderPass {
        colors: Vec<String>,
        depth: Option<String>,
    },
    EndRenderPass,
    BindRasterPipeline {
        name: String,
    },
    BindComputePipeline {
        name: String,
    },
    SetViewport,
    SetScissor,
    SetUniform {
        slot: u32,
        len: usize,
    },
    SetTexture {
        slot: u32,
        texture: String,
    },
    SetSampler {
        slot: u32,
    },
    SetUnorderedAccess {
        slot: u32,
        texture: String,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: String,
    },
    SetIndexBuffer {
        buffer: String,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
}

/// A submitted command list's recorded contents.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedBatch {
    /// Commands in recording order, including `Begin` and `End`.
    pub commands: Vec<RecordedCommand>,
}

impl SubmittedBatch {
    /// Barriers in this batch, in recording order.
    pub fn barriers(&self) -> Vec<&RecordedCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, RecordedCommand::PipelineBarrier { .. }))
            .collect()
    }
}

#[derive(Debug, Default)]
struct DummyCommandList {
    commands: Vec<RecordedCommand>,
}

impl RhiCommandList for DummyCommandList {
    fn begin(&mut self) {
        self.commands.push(RecordedCommand::Begin);
    }

    fn end(&mut self) {
        self.commands.push(RecordedCommand::End);
    }

    fn reset(&mut self) {
        self.commands.clear();
    }

    fn pipeline_barrier(&mut self, texture: &RhiTexture, old: ResourceState, new: ResourceState) {
        log::trace!(
            "DummyBackend: barrier {} {:?} -> {:?}",
            texture.name(),
            old,
            new
        );
        self.commands.push(RecordedCommand::PipelineBarrier {
            texture: texture.name().to_string(),
            old,
            new,
        });
    }

    fn begin_render_pass(
        &mut self,
        colors: &[RenderPassColorAttachment<'_>],
        depth: Option<&RenderPassDepthAttachment<'_>>,
    ) {
        self.commands.push(RecordedCommand::BeginRenderPass {
            colors: colors.iter().map(|a| a.texture.name().to_string()).collect(),
            depth: depth.map(|a| a.texture.name().to_string()),
        });
    }

    fn end_render_pass(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn bind_raster_pipeline(&mut self, desc: &RasterPipelineDesc) {
        self.commands.push(RecordedCommand::BindRasterPipeline {
            name: desc.name.clone(),
        });
    }

    fn bind_compute_pipeline(&mut self, desc: &ComputePipelineDesc) {
        self.commands.push(RecordedCommand::BindComputePipeline {
            name: desc.name.clone(),
        });
    }

    fn set_viewport(&mut self, _viewport: &Viewport) {
        self.commands.push(RecordedCommand::SetViewport);
    }

    fn set_scissor(&mut self, _rect: &ScissorRect) {
        self.commands.push(RecordedCommand::SetScissor);
    }

    fn set_uniform_bytes(&mut self, slot: u32, data: &[u8]) {
        self.commands.push(RecordedCommand::SetUniform {
            slot,
            len: data.len(),
        });
    }

    fn set_texture(&mut self, slot: u32, texture: &RhiTexture) {
        self.commands.push(RecordedCommand::SetTexture {
            slot,
            texture: texture.name().to_string(),
        });
    }

    fn set_sampler(&mut self, slot: u32, _desc: &SamplerDescriptor) {
        self.commands.push(RecordedCommand::SetSampler { slot });
    }

    fn set_unordered_access(&mut self, slot: u32, texture: &RhiTexture) {
        self.commands.push(RecordedCommand::SetUnorderedAccess {
            slot,
            texture: texture.name().to_string(),
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &RhiBuffer) {
        self.commands.push(RecordedCommand::SetVertexBuffer {
            slot,
            buffer: buffer.name().to_string(),
        });
    }

    fn set_index_buffer(&mut self, buffer: &RhiBuffer) {
        self.commands.push(RecordedCommand::SetIndexBuffer {
            buffer: buffer.name().to_string(),
        });
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.commands.push(RecordedCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.commands.push(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(RecordedCommand::Dispatch { x, y, z });
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Dummy GPU backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_id: AtomicU64,
    manual_completion: bool,
    live_textures: Mutex<Vec<String>>,
    destroyed_textures: Mutex<Vec<String>>,
    live_buffers: Mutex<Vec<String>>,
    submissions: Mutex<Vec<SubmittedBatch>>,
    pending: Mutex<VecDeque<Fence>>,
}

impl DummyBackend {
    /// Create a backend whose submissions complete immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend whose submissions stay incomplete until
    /// [`complete_next`](Self::complete_next) or
    /// [`complete_all`](Self::complete_all) is called.
    pub fn with_manual_completion() -> Self {
        Self {
            manual_completion: true,
            ..Self::default()
        }
    }

    /// Signal the oldest pending submission's fence.
    ///
    /// Returns `false` if nothing was pending.
    pub fn complete_next(&self) -> bool {
        match self.pending.lock().pop_front() {
            Some(fence) => {
                fence.signal();
                true
            }
            None => false,
        }
    }

    /// Signal every pending submission's fence.
    pub fn complete_all(&self) {
        let mut pending = self.pending.lock();
        for fence in pending.drain(..) {
            fence.signal();
        }
    }

    /// Number of submissions the GPU has not "finished" yet.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Snapshot of everything submitted so far, in submission order.
    pub fn submitted_batches(&self) -> Vec<SubmittedBatch> {
        self.submissions.lock().clone()
    }

    /// Number of command lists submitted so far.
    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }

    /// Number of textures currently alive.
    pub fn live_texture_count(&self) -> usize {
        self.live_textures.lock().len()
    }

    /// Names of destroyed textures, in destruction order.
    pub fn destroyed_texture_names(&self) -> Vec<String> {
        self.destroyed_textures.lock().clone()
    }

    /// Number of buffers currently alive.
    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.lock().len()
    }
}

impl RhiBackend for DummyBackend {
    fn name(&self) -> &str {
        "Dummy Backend"
    }

    fn create_texture(
        &self,
        name: &str,
        desc: &TextureDescriptor,
    ) -> Result<RhiTexture, GraphicsError> {
        log::trace!(
            "DummyBackend: creating texture '{}' ({}x{}x{}, {:?})",
            name,
            desc.size.width,
            desc.size.height,
            desc.size.depth,
            desc.format
        );
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live_textures.lock().push(name.to_string());
        Ok(RhiTexture::new(id, name, desc))
    }

    fn destroy_texture(&self, texture: &RhiTexture) {
        log::trace!("DummyBackend: destroying texture '{}'", texture.name());
        let mut live = self.live_textures.lock();
        if let Some(pos) = live.iter().position(|n| n == texture.name()) {
            live.remove(pos);
        }
        self.destroyed_textures
            .lock()
            .push(texture.name().to_string());
    }

    fn create_buffer(
        &self,
        name: &str,
        desc: &BufferDescriptor,
    ) -> Result<RhiBuffer, GraphicsError> {
        log::trace!(
            "DummyBackend: creating buffer '{}' ({} bytes)",
            name,
            desc.size
        );
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live_buffers.lock().push(name.to_string());
        Ok(RhiBuffer::new(id, name, desc))
    }

    fn destroy_buffer(&self, buffer: &RhiBuffer) {
        log::trace!("DummyBackend: destroying buffer '{}'", buffer.name());
        let mut live = self.live_buffers.lock();
        if let Some(pos) = live.iter().position(|n| n == buffer.name()) {
            live.remove(pos);
        }
    }

    fn create_command_list(&self) -> Box<dyn RhiCommandList> {
        Box::new(DummyCommandList::default())
    }

    fn submit(&self, cmd: &mut dyn RhiCommandList) -> Fence {
        let list = cmd
            .as_any_mut()
            .downcast_mut::<DummyCommandList>()
            .expect("dummy backend received a foreign command list");
        let commands = std::mem::take(&mut list.commands);
        log::trace!("DummyBackend: submitting {} commands", commands.len());
        self.submissions.lock().push(SubmittedBatch { commands });

        let fence = Fence::new();
        if self.manual_completion {
            self.pending.lock().push_back(fence.clone());
        } else {
            fence.signal();
        }
        fence
    }
}
