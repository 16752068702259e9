//! Pass setup interface.
//!
//! During graph setup each pass receives a [`GraphBuilder`] and declares
//! the resources it touches, its pipeline, and its render state. Nothing is
//! recorded here; the declarations drive barrier planning and command
//! recording afterwards.

use std::collections::HashMap;

use vermilion_core::arena::Handle;

use crate::graph::access::{ColorTargetDecl, DepthTargetDecl, PassDeclaration, ResourceAccess};
use crate::registry::ResourceRegistry;
use crate::types::{
    BufferDescriptor, ClearValue, ComputePipelineDesc, Extent3d, LoadOp, RasterPipelineDesc,
    RenderPassDesc, ScissorRect, StoreOp, TextureDescriptor, Viewport,
};

/// Declaration interface handed to a pass's setup closure.
pub struct GraphBuilder<'a> {
    registry: &'a mut ResourceRegistry,
    decl: &'a mut PassDeclaration,
    created_textures: &'a mut HashMap<String, TextureDescriptor>,
    created_buffers: &'a mut HashMap<String, BufferDescriptor>,
    render_resolution: Extent3d,
    output_resolution: Extent3d,
}

impl<'a> GraphBuilder<'a> {
    pub(crate) fn new(
        registry: &'a mut ResourceRegistry,
        decl: &'a mut PassDeclaration,
        created_textures: &'a mut HashMap<String, TextureDescriptor>,
        created_buffers: &'a mut HashMap<String, BufferDescriptor>,
        render_resolution: Extent3d,
        output_resolution: Extent3d,
    ) -> Self {
        Self {
            registry,
            decl,
            created_textures,
            created_buffers,
            render_resolution,
            output_resolution,
        }
    }

    /// Declare a texture this pass creates and writes.
    ///
    /// The registry reuses an existing texture of the same name if the
    /// descriptor is compatible. Two passes creating the same name with
    /// different descriptors in one build is a graph authoring error and
    /// panics. An invalid descriptor is logged and yields
    /// [`Handle::INVALID`].
    pub fn create_texture(&mut self, name: &str, desc: &TextureDescriptor) -> Handle {
        if let Some(earlier) = self.created_textures.get(name) {
            assert!(
                earlier.is_compatible_with(desc),
                "texture '{name}' created twice in one build with different descriptors"
            );
        }

        let handle = self.registry.get_or_create(name, desc);
        if !handle.is_valid() {
            return Handle::INVALID;
        }
        self.created_textures.insert(name.to_string(), *desc);

        let access = if desc.format.is_depth_stencil() {
            // Created depth targets are attachments from the start.
            self.decl.depth_target = Some(DepthTargetDecl {
                handle,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear: ClearValue::DEPTH_ONE,
            });
            ResourceAccess::Create
        } else {
            self.decl.color_targets.push(ColorTargetDecl {
                handle,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear: ClearValue::BLACK,
            });
            ResourceAccess::Create
        };
        self.decl.declare(handle, access);
        handle
    }

    /// Handle for a texture registered by an earlier pass.
    ///
    /// Panics if the name is unknown; declaration order is the execution
    /// order, so a miss means the graph is wired wrong.
    pub fn get_texture(&self, name: &str) -> Handle {
        match self.registry.handle_by_name(name) {
            Some(handle) => handle,
            None => panic!("unknown texture '{name}' requested during pass setup"),
        }
    }

    /// Declare a buffer this pass creates.
    ///
    /// Buffers carry no tracked state and need no barriers; registering one
    /// makes it resolvable by name for later passes and bindable during
    /// execution. Same conflict and validity rules as
    /// [`create_texture`](Self::create_texture).
    pub fn create_buffer(&mut self, name: &str, desc: &BufferDescriptor) -> Handle {
        if let Some(earlier) = self.created_buffers.get(name) {
            assert!(
                earlier == desc,
                "buffer '{name}' created twice in one build with different descriptors"
            );
        }

        let handle = self.registry.get_or_create_buffer(name, desc);
        if !handle.is_valid() {
            return Handle::INVALID;
        }
        self.created_buffers.insert(name.to_string(), *desc);
        handle
    }

    /// Handle for a buffer registered by an earlier pass.
    ///
    /// Panics if the name is unknown, like
    /// [`get_texture`](Self::get_texture).
    pub fn get_buffer(&self, name: &str) -> Handle {
        match self.registry.buffer_handle_by_name(name) {
            Some(handle) => handle,
            None => panic!("unknown buffer '{name}' requested during pass setup"),
        }
    }

    /// Declare a shader read of a texture.
    ///
    /// An invalid handle is logged and ignored so a failed
    /// [`create_texture`](Self::create_texture) upstream degrades to a
    /// missing binding instead of a crash.
    pub fn read_texture(&mut self, handle: Handle) {
        if !self.check_handle(handle, "read") {
            return;
        }
        self.decl.declare(handle, ResourceAccess::Read);
    }

    /// Declare a color attachment write.
    ///
    /// `clear` selects [`LoadOp::Clear`]; `None` loads existing contents.
    pub fn write_texture(&mut self, handle: Handle, clear: Option<ClearValue>) {
        if !self.check_handle(handle, "write") {
            return;
        }
        self.decl.color_targets.push(ColorTargetDecl {
            handle,
            load_op: if clear.is_some() {
                LoadOp::Clear
            } else {
                LoadOp::Load
            },
            store_op: StoreOp::Store,
            clear: clear.unwrap_or(ClearValue::BLACK),
        });
        self.decl.declare(handle, ResourceAccess::Write);
    }

    /// Declare a depth/stencil attachment write.
    pub fn write_depth_stencil(&mut self, handle: Handle, clear: Option<ClearValue>) {
        if !self.check_handle(handle, "depth write") {
            return;
        }
        self.decl.depth_target = Some(DepthTargetDecl {
            handle,
            load_op: if clear.is_some() {
                LoadOp::Clear
            } else {
                LoadOp::Load
            },
            store_op: StoreOp::Store,
            clear: clear.unwrap_or(ClearValue::DEPTH_ONE),
        });
        self.decl.declare(handle, ResourceAccess::DepthStencilWrite);
    }

    /// Set the shader pair, keeping any raster state already declared with
    /// [`set_pipeline`](Self::set_pipeline).
    pub fn set_shader(&mut self, vertex: impl Into<String>, fragment: impl Into<String>) {
        let vertex = vertex.into();
        let fragment = fragment.into();
        match &mut self.decl.raster_pipeline {
            Some(desc) => {
                desc.vertex_shader = vertex;
                desc.fragment_shader = Some(fragment);
            }
            None => {
                let name = vertex.clone();
                self.decl.raster_pipeline = Some(RasterPipelineDesc::new(name, vertex, fragment));
            }
        }
    }

    /// Declare the pass's attachments in one call.
    ///
    /// Equivalent to a [`write_texture`](Self::write_texture) /
    /// [`write_depth_stencil`](Self::write_depth_stencil) per attachment,
    /// with explicit load and store ops.
    pub fn set_render_pass(&mut self, desc: &RenderPassDesc) {
        for color in &desc.colors {
            if !self.check_handle(color.handle, "render pass color") {
                continue;
            }
            self.decl.color_targets.push(ColorTargetDecl {
                handle: color.handle,
                load_op: color.load_op,
                store_op: color.store_op,
                clear: color.clear,
            });
            self.decl.declare(color.handle, ResourceAccess::Write);
        }
        if let Some(depth) = &desc.depth {
            if self.check_handle(depth.handle, "render pass depth") {
                self.decl.depth_target = Some(DepthTargetDecl {
                    handle: depth.handle,
                    load_op: depth.load_op,
                    store_op: depth.store_op,
                    clear: depth.clear,
                });
                self.decl.declare(depth.handle, ResourceAccess::DepthStencilWrite);
            }
        }
    }

    /// Set the rasterization pipeline bound before the execute closure runs.
    pub fn set_pipeline(&mut self, desc: RasterPipelineDesc) {
        self.decl.raster_pipeline = Some(desc);
    }

    /// Set the compute pipeline bound before the execute closure runs.
    pub fn set_compute_pipeline(&mut self, desc: ComputePipelineDesc) {
        self.decl.compute_pipeline = Some(desc);
    }

    /// Override the viewport for this pass. Defaults to the full render
    /// resolution.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        assert!(viewport.is_valid(), "viewport with non-positive size");
        self.decl.viewport = Some(viewport);
    }

    /// Override the scissor rect for this pass.
    pub fn set_scissor(&mut self, rect: ScissorRect) {
        self.decl.scissor = Some(rect);
    }

    /// Skip automatic barriers for this pass's write accesses.
    ///
    /// For passes that manage their own transitions. Read barriers are
    /// still emitted, and tracked state advances as if the barriers had
    /// been recorded.
    pub fn skip_texture_write_barriers(&mut self) {
        self.decl.skip_texture_write_barriers = true;
    }

    /// Resolution internal render targets are sized for.
    pub fn get_render_resolution(&self) -> Extent3d {
        self.render_resolution
    }

    /// Resolution of the final output.
    pub fn get_output_resolution(&self) -> Extent3d {
        self.output_resolution
    }

    fn check_handle(&self, handle: Handle, what: &str) -> bool {
        if !handle.is_valid() {
            log::warn!("ignoring {what} declaration for an invalid texture handle");
            return false;
        }
        assert!(
            self.registry.resolve(handle).is_ok(),
            "texture handle from a previous build used in a pass declaration"
        );
        true
    }
}
