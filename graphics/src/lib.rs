//! # Vermilion Graphics
//!
//! Frame graph and render scheduling core for Vermilion.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`RenderGraph`] - Passes and sync points executed in registration order
//! - [`ResourceRegistry`] - Named textures addressed by generational handles
//! - [`CommandListPool`] - Pooled command lists with fence-driven recycling
//! - [`FramePacer`] - Frames-in-flight pacing against completion fences
//! - [`DoubleBuffered`] - Pending/current per-frame CPU data
//! - [`rhi`] - Backend traits plus a recording dummy backend for tests
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use vermilion_graphics::rhi::DummyBackend;
//! use vermilion_graphics::types::{TextureDescriptor, TextureFormat, TextureUsage};
//! use vermilion_graphics::{GraphContext, RenderGraph};
//!
//! let backend = Arc::new(DummyBackend::new());
//! let mut ctx = GraphContext::new(backend, 2);
//!
//! let mut graph = RenderGraph::new();
//! graph.add_pass(
//!     "main",
//!     (),
//!     |_, builder| {
//!         builder.create_texture(
//!             "scene_color",
//!             &TextureDescriptor::new_2d(
//!                 1280,
//!                 720,
//!                 TextureFormat::Rgba16Float,
//!                 TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED,
//!             ),
//!         );
//!     },
//!     |_, exec| {
//!         exec.cmd().draw(3, 1);
//!     },
//! );
//!
//! ctx.begin_frame();
//! let fence = graph.execute(&mut ctx).unwrap();
//! ctx.end_frame(fence);
//! ctx.wait_idle();
//! ```

pub mod command;
pub mod error;
pub mod frame;
pub mod graph;
pub mod pacer;
pub mod registry;
pub mod rhi;
pub mod types;

// Re-export main types for convenience
pub use command::{CommandList, CommandListPool, CommandListState};
pub use error::GraphicsError;
pub use frame::DoubleBuffered;
pub use graph::{
    Barrier, ExecuteContext, GraphBuilder, GraphContext, RenderGraph, ResourceAccess,
};
pub use pacer::FramePacer;
pub use registry::ResourceRegistry;
pub use rhi::{Fence, ResourceState};
pub use types::{
    ClearValue, Extent3d, TextureDescriptor, TextureFormat, TextureUsage, Viewport,
};
pub use vermilion_core::arena::Handle;

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Vermilion Graphics v{} initialized", VERSION);
}
