//! Pipeline and render pass state descriptors.

use vermilion_core::arena::Handle;

use super::ClearValue;

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling.
    None,
    /// Cull front-facing triangles.
    Front,
    /// Cull back-facing triangles.
    #[default]
    Back,
}

/// Color blend mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// No blending, source replaces destination.
    #[default]
    Opaque,
    /// Standard alpha blending.
    Alpha,
    /// Additive blending.
    Additive,
}

/// Depth comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    Never,
    #[default]
    Less,
    LessEqual,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Always,
}

/// Depth test and write configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    /// Enable the depth test.
    pub test_enabled: bool,
    /// Write passing fragments to the depth buffer.
    pub write_enabled: bool,
    /// Comparison used by the depth test.
    pub compare: CompareFunction,
}

impl DepthState {
    /// Depth test and write enabled with the default comparison.
    pub const READ_WRITE: DepthState = DepthState {
        test_enabled: true,
        write_enabled: true,
        compare: CompareFunction::Less,
    };

    /// Depth fully disabled.
    pub const DISABLED: DepthState = DepthState {
        test_enabled: false,
        write_enabled: false,
        compare: CompareFunction::Always,
    };
}

impl Default for DepthState {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// Description of a rasterization pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RasterPipelineDesc {
    /// Debug name.
    pub name: String,
    /// Vertex shader identifier.
    pub vertex_shader: String,
    /// Fragment shader identifier. `None` for depth-only pipelines.
    pub fragment_shader: Option<String>,
    /// Face culling.
    pub cull_mode: CullMode,
    /// Color blending.
    pub blend_mode: BlendMode,
    /// Depth state.
    pub depth: DepthState,
}

impl RasterPipelineDesc {
    /// Create a pipeline description with default raster state.
    pub fn new(
        name: impl Into<String>,
        vertex_shader: impl Into<String>,
        fragment_shader: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            vertex_shader: vertex_shader.into(),
            fragment_shader: Some(fragment_shader.into()),
            cull_mode: CullMode::default(),
            blend_mode: BlendMode::default(),
            depth: DepthState::default(),
        }
    }

    /// Create a depth-only pipeline description (no fragment shader).
    pub fn depth_only(name: impl Into<String>, vertex_shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertex_shader: vertex_shader.into(),
            fragment_shader: None,
            cull_mode: CullMode::default(),
            blend_mode: BlendMode::Opaque,
            depth: DepthState::READ_WRITE,
        }
    }
}

/// Description of a compute pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComputePipelineDesc {
    /// Debug name.
    pub name: String,
    /// Compute shader identifier.
    pub shader: String,
}

impl ComputePipelineDesc {
    /// Create a compute pipeline description.
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
        }
    }
}

/// A color attachment in an explicit render pass declaration.
#[derive(Debug, Clone, Copy)]
pub struct ColorAttachmentDesc {
    pub handle: Handle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearValue,
}

impl ColorAttachmentDesc {
    /// Attachment cleared to a color at pass begin.
    pub fn cleared(handle: Handle, clear: ClearValue) -> Self {
        Self {
            handle,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            clear,
        }
    }

    /// Attachment whose existing contents are kept.
    pub fn loaded(handle: Handle) -> Self {
        Self {
            handle,
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
            clear: ClearValue::BLACK,
        }
    }
}

/// The depth/stencil attachment in an explicit render pass declaration.
#[derive(Debug, Clone, Copy)]
pub struct DepthAttachmentDesc {
    pub handle: Handle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearValue,
}

impl DepthAttachmentDesc {
    /// Depth attachment cleared to the far plane at pass begin.
    pub fn cleared(handle: Handle) -> Self {
        Self {
            handle,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            clear: ClearValue::DEPTH_ONE,
        }
    }
}

/// An explicit render pass declaration, an alternative to declaring
/// attachments one write at a time.
#[derive(Debug, Clone, Default)]
pub struct RenderPassDesc {
    pub colors: Vec<ColorAttachmentDesc>,
    pub depth: Option<DepthAttachmentDesc>,
}

/// What happens to an attachment's contents at render pass begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadOp {
    /// Preserve existing contents.
    #[default]
    Load,
    /// Clear to the attachment's clear value.
    Clear,
    /// Contents are undefined.
    DontCare,
}

/// What happens to an attachment's contents at render pass end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    /// Write results to memory.
    #[default]
    Store,
    /// Results may be discarded.
    Discard,
}
