//! Frame graph core.
//!
//! A [`RenderGraph`] is a list of passes and sync points executed strictly
//! in registration order. Each frame runs four phases:
//!
//! 1. **Setup** — every pass's setup closure declares resource accesses
//!    through a [`GraphBuilder`]. Declarations are rebuilt from scratch each
//!    frame, so the graph can change shape frame to frame.
//! 2. **Barrier planning** — declarations are compared against the
//!    registry's tracked states; only actual transitions become barriers.
//! 3. **Recording** — each pass gets a pooled command list: planned
//!    barriers first, then the declared pipeline and render pass, then the
//!    pass's execute closure.
//! 4. **Submission** — recorded lists are submitted in registration order;
//!    the caller gets the last fence to hand to the frame pacer.
//!
//! Registration order being execution order is a deliberate simplification:
//! passes are not reordered behind the author's back, and the author is
//! responsible for declaring producers before consumers.

mod access;
mod barrier;
mod builder;

pub use access::{AccessDecl, PassDeclaration, ResourceAccess};
pub use barrier::{plan_pass_barriers, Barrier};
pub use builder::GraphBuilder;

use std::collections::HashMap;
use std::sync::Arc;

use vermilion_core::arena::Handle;

use crate::command::{CommandList, CommandListPool};
use crate::error::GraphicsError;
use crate::pacer::FramePacer;
use crate::registry::ResourceRegistry;
use crate::rhi::{
    Fence, RenderPassColorAttachment, RenderPassDepthAttachment, RhiBackend, RhiBuffer, RhiTexture,
};
use crate::types::{Extent3d, ScissorRect, Viewport};

/// Long-lived state shared by every graph execution.
///
/// Owns the registry, the command list pool, and the frame pacer. One
/// context serves many graphs and many frames.
pub struct GraphContext {
    backend: Arc<dyn RhiBackend>,
    registry: ResourceRegistry,
    pool: CommandListPool,
    pacer: FramePacer,
    render_resolution: Extent3d,
    output_resolution: Extent3d,
    frame_index: u64,
}

impl GraphContext {
    /// Create a context with the given number of frames in flight.
    pub fn new(backend: Arc<dyn RhiBackend>, frames_in_flight: usize) -> Self {
        log::trace!("graph context on backend '{}'", backend.name());
        Self {
            registry: ResourceRegistry::new(backend.clone()),
            pool: CommandListPool::new(backend.clone()),
            backend,
            pacer: FramePacer::new(frames_in_flight),
            render_resolution: Extent3d::new_2d(1280, 720),
            output_resolution: Extent3d::new_2d(1280, 720),
            frame_index: 0,
        }
    }

    /// Start a frame: wait out the frame slot, then recycle command lists
    /// and destroy retired resources whose fences signaled in the meantime.
    pub fn begin_frame(&mut self) {
        self.pacer.begin_frame();
        self.pool.retire_completed();
        self.registry.destroy_retired_completed();
        self.frame_index += 1;
    }

    /// Finish a frame with the fence returned by
    /// [`RenderGraph::execute`].
    pub fn end_frame(&mut self, fence: Fence) {
        self.pacer.end_frame(fence);
    }

    /// Block until all in-flight GPU work completes, every command list is
    /// back in the pool, and retired resources are destroyed.
    pub fn wait_idle(&mut self) {
        self.pacer.wait_idle();
        self.pool.drain();
        self.pool.reset();
        self.registry.destroy_retired_completed();
    }

    /// Resolution internal render targets are sized for.
    pub fn render_resolution(&self) -> Extent3d {
        self.render_resolution
    }

    /// Resolution of the final output.
    pub fn output_resolution(&self) -> Extent3d {
        self.output_resolution
    }

    pub fn set_render_resolution(&mut self, resolution: Extent3d) {
        assert!(resolution.is_valid(), "render resolution with zero dimension");
        self.render_resolution = resolution;
    }

    pub fn set_output_resolution(&mut self, resolution: Extent3d) {
        assert!(resolution.is_valid(), "output resolution with zero dimension");
        self.output_resolution = resolution;
    }

    /// Frames started so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn backend(&self) -> &Arc<dyn RhiBackend> {
        &self.backend
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.registry
    }

    pub fn pool(&self) -> &CommandListPool {
        &self.pool
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }
}

/// Recording interface handed to a pass's execute closure.
pub struct ExecuteContext<'a> {
    cmd: &'a mut CommandList,
    registry: &'a ResourceRegistry,
    render_resolution: Extent3d,
    output_resolution: Extent3d,
    frame_index: u64,
}

impl<'a> ExecuteContext<'a> {
    /// The pass's command list, already inside its render pass if one was
    /// declared.
    pub fn cmd(&mut self) -> &mut CommandList {
        self.cmd
    }

    /// Backend texture for a handle declared during setup.
    pub fn texture(&self, handle: Handle) -> Result<&RhiTexture, GraphicsError> {
        Ok(self.registry.resolve(handle)?.texture())
    }

    /// Bind a declared texture for sampling.
    pub fn bind_texture(&mut self, slot: u32, handle: Handle) -> Result<(), GraphicsError> {
        let texture = self.registry.resolve(handle)?.texture();
        self.cmd.set_texture(slot, texture);
        Ok(())
    }

    /// Backend buffer for a handle declared during setup.
    pub fn buffer(&self, handle: Handle) -> Result<&RhiBuffer, GraphicsError> {
        Ok(self.registry.resolve_buffer(handle)?.buffer())
    }

    /// Bind a declared buffer as a vertex stream.
    pub fn bind_vertex_buffer(&mut self, slot: u32, handle: Handle) -> Result<(), GraphicsError> {
        let buffer = self.registry.resolve_buffer(handle)?.buffer();
        self.cmd.set_vertex_buffer(slot, buffer);
        Ok(())
    }

    /// Bind a declared buffer as the index stream.
    pub fn bind_index_buffer(&mut self, handle: Handle) -> Result<(), GraphicsError> {
        let buffer = self.registry.resolve_buffer(handle)?.buffer();
        self.cmd.set_index_buffer(buffer);
        Ok(())
    }

    pub fn render_resolution(&self) -> Extent3d {
        self.render_resolution
    }

    pub fn output_resolution(&self) -> Extent3d {
        self.output_resolution
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

trait ErasedPass {
    fn name(&self) -> &str;
    fn setup(&mut self, builder: &mut GraphBuilder<'_>);
    fn execute(&mut self, ctx: &mut ExecuteContext<'_>);
}

struct TypedPass<D, S, E> {
    name: String,
    data: D,
    setup: S,
    execute: E,
}

impl<D, S, E> ErasedPass for TypedPass<D, S, E>
where
    S: FnMut(&mut D, &mut GraphBuilder<'_>),
    E: FnMut(&D, &mut ExecuteContext<'_>),
{
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, builder: &mut GraphBuilder<'_>) {
        (self.setup)(&mut self.data, builder);
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) {
        (self.execute)(&self.data, ctx);
    }
}

struct PassNode {
    pass: Box<dyn ErasedPass>,
    decl: PassDeclaration,
    barriers: Vec<Barrier>,
}

enum GraphNode {
    Pass(PassNode),
    SyncPoint {
        name: String,
        callback: Box<dyn FnMut()>,
    },
}

/// An ordered list of passes and sync points.
#[derive(Default)]
pub struct RenderGraph {
    nodes: Vec<GraphNode>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass.
    ///
    /// `data` is per-pass state owned by the graph; `setup` may mutate it
    /// while declaring resources, `execute` reads it while recording.
    pub fn add_pass<D, S, E>(&mut self, name: impl Into<String>, data: D, setup: S, execute: E)
    where
        D: 'static,
        S: FnMut(&mut D, &mut GraphBuilder<'_>) + 'static,
        E: FnMut(&D, &mut ExecuteContext<'_>) + 'static,
    {
        self.nodes.push(GraphNode::Pass(PassNode {
            pass: Box::new(TypedPass {
                name: name.into(),
                data,
                setup,
                execute,
            }),
            decl: PassDeclaration::default(),
            barriers: Vec::new(),
        }));
    }

    /// Append a CPU sync point.
    ///
    /// When execution reaches it, all previously recorded passes are
    /// submitted, then the callback runs.
    pub fn add_sync_point(&mut self, name: impl Into<String>, callback: impl FnMut() + 'static) {
        self.nodes.push(GraphNode::SyncPoint {
            name: name.into(),
            callback: Box::new(callback),
        });
    }

    /// Number of passes (sync points excluded).
    pub fn pass_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, GraphNode::Pass(_)))
            .count()
    }

    /// Run one frame of this graph: setup, barrier planning, recording,
    /// submission.
    ///
    /// Returns the fence of the last submission, already signaled if the
    /// graph submitted nothing.
    pub fn execute(&mut self, ctx: &mut GraphContext) -> Result<Fence, GraphicsError> {
        log::trace!(
            "executing graph: {} passes, frame {}",
            self.pass_count(),
            ctx.frame_index
        );

        ctx.registry.begin_build(&ctx.pool.in_flight_fences());
        let mut created_textures = HashMap::new();
        let mut created_buffers = HashMap::new();

        for node in &mut self.nodes {
            if let GraphNode::Pass(pass_node) = node {
                pass_node.decl = PassDeclaration::default();
                let mut graph_builder = GraphBuilder::new(
                    &mut ctx.registry,
                    &mut pass_node.decl,
                    &mut created_textures,
                    &mut created_buffers,
                    ctx.render_resolution,
                    ctx.output_resolution,
                );
                pass_node.pass.setup(&mut graph_builder);
            }
        }

        for node in &mut self.nodes {
            if let GraphNode::Pass(pass_node) = node {
                pass_node.barriers = plan_pass_barriers(&pass_node.decl, &mut ctx.registry)?;
            }
        }

        let mut recorded: Vec<CommandList> = Vec::new();
        let mut last_fence: Option<Fence> = None;
        for node in &mut self.nodes {
            match node {
                GraphNode::Pass(pass_node) => {
                    let mut cmd = ctx.pool.get_command_list();
                    cmd.begin_recording();
                    if let Err(err) = record_pass(
                        pass_node,
                        &mut cmd,
                        &ctx.registry,
                        ctx.render_resolution,
                        ctx.output_resolution,
                        ctx.frame_index,
                    ) {
                        // Hand every unsubmitted list back so the pool
                        // stays consistent after the failed frame.
                        ctx.pool.discard(cmd);
                        for cmd in recorded.drain(..) {
                            ctx.pool.discard(cmd);
                        }
                        return Err(err);
                    }
                    cmd.finish();
                    recorded.push(cmd);
                }
                GraphNode::SyncPoint { name, callback } => {
                    for cmd in recorded.drain(..) {
                        last_fence = Some(ctx.pool.submit(cmd));
                    }
                    log::trace!("sync point '{name}'");
                    callback();
                }
            }
        }
        for cmd in recorded.drain(..) {
            last_fence = Some(ctx.pool.submit(cmd));
        }

        Ok(last_fence.unwrap_or_else(Fence::signaled))
    }
}

fn record_pass(
    node: &mut PassNode,
    cmd: &mut CommandList,
    registry: &ResourceRegistry,
    render_resolution: Extent3d,
    output_resolution: Extent3d,
    frame_index: u64,
) -> Result<(), GraphicsError> {
    log::trace!("recording pass '{}'", node.pass.name());

    for barrier in &node.barriers {
        let texture = registry.resolve(barrier.handle)?.texture();
        cmd.pipeline_barrier(texture, barrier.old_state, barrier.new_state);
    }

    if let Some(desc) = &node.decl.raster_pipeline {
        cmd.bind_raster_pipeline(desc);
    }
    if let Some(desc) = &node.decl.compute_pipeline {
        cmd.bind_compute_pipeline(desc);
    }

    // Targets whose access got upgraded to ReadWrite are bound as storage
    // by the pass itself, not as attachments.
    let mut colors = Vec::new();
    for target in &node.decl.color_targets {
        match node.decl.access_for(target.handle) {
            Some(ResourceAccess::Create) | Some(ResourceAccess::Write) => {
                colors.push(RenderPassColorAttachment {
                    texture: registry.resolve(target.handle)?.texture(),
                    load_op: target.load_op,
                    store_op: target.store_op,
                    clear: target.clear,
                });
            }
            _ => {}
        }
    }
    let mut depth = None;
    if let Some(target) = &node.decl.depth_target {
        if matches!(
            node.decl.access_for(target.handle),
            Some(ResourceAccess::Create) | Some(ResourceAccess::DepthStencilWrite)
        ) {
            depth = Some(RenderPassDepthAttachment {
                texture: registry.resolve(target.handle)?.texture(),
                load_op: target.load_op,
                store_op: target.store_op,
                clear: target.clear,
            });
        }
    }

    let in_render_pass = !colors.is_empty() || depth.is_some();
    if in_render_pass {
        cmd.begin_render_pass(&colors, depth.as_ref());
        let viewport = node
            .decl
            .viewport
            .unwrap_or_else(|| Viewport::full(render_resolution.width, render_resolution.height));
        cmd.set_viewport(&viewport);
        let scissor = node
            .decl
            .scissor
            .unwrap_or_else(|| ScissorRect::full(render_resolution.width, render_resolution.height));
        cmd.set_scissor(&scissor);
    }

    let mut exec = ExecuteContext {
        cmd,
        registry,
        render_resolution,
        output_resolution,
        frame_index,
    };
    node.pass.execute(&mut exec);

    if in_render_pass {
        cmd.end_render_pass();
    }
    Ok(())
}
