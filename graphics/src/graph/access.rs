//! Per-pass resource access declarations.

use vermilion_core::arena::Handle;

use crate::rhi::ResourceState;
use crate::types::{
    ClearValue, ComputePipelineDesc, LoadOp, RasterPipelineDesc, ScissorRect, StoreOp,
    TextureFormat, Viewport,
};

/// How a pass uses a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAccess {
    /// Created by this pass and written as an attachment.
    Create,
    /// Sampled or read from a shader.
    Read,
    /// Written as a color attachment.
    Write,
    /// Read and written by the same pass (storage access).
    ReadWrite,
    /// Written as a depth/stencil attachment.
    DepthStencilWrite,
}

impl ResourceAccess {
    /// Check whether the access reads the resource.
    pub fn is_read(self) -> bool {
        matches!(self, ResourceAccess::Read | ResourceAccess::ReadWrite)
    }

    /// Check whether the access writes the resource.
    pub fn is_write(self) -> bool {
        !matches!(self, ResourceAccess::Read)
    }

    /// State the resource must be in for this access.
    pub fn required_state(self, format: TextureFormat) -> ResourceState {
        match self {
            ResourceAccess::Create | ResourceAccess::Write => {
                if format.is_depth_stencil() {
                    ResourceState::DepthStencilAttachment
                } else {
                    ResourceState::ColorAttachment
                }
            }
            ResourceAccess::DepthStencilWrite => ResourceState::DepthStencilAttachment,
            ResourceAccess::Read => ResourceState::ShaderRead,
            ResourceAccess::ReadWrite => ResourceState::General,
        }
    }

    /// Combine two accesses declared for the same resource in one pass.
    ///
    /// A read combined with any write becomes `ReadWrite`, which selects the
    /// general state and drops the resource from the pass's attachments.
    fn merge(self, other: ResourceAccess) -> ResourceAccess {
        use ResourceAccess::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Read, w) | (w, Read) if w.is_write() => ReadWrite,
            (ReadWrite, _) | (_, ReadWrite) => ReadWrite,
            // Create subsumes plain writes.
            (Create, Write) | (Write, Create) => Create,
            (Create, DepthStencilWrite)
            | (DepthStencilWrite, Create)
            | (Write, DepthStencilWrite)
            | (DepthStencilWrite, Write) => DepthStencilWrite,
            (a, _) => a,
        }
    }
}

/// One resource's merged access within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecl {
    pub handle: Handle,
    pub access: ResourceAccess,
}

/// A color attachment declared by a pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColorTargetDecl {
    pub handle: Handle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearValue,
}

/// The depth/stencil attachment declared by a pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DepthTargetDecl {
    pub handle: Handle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearValue,
}

/// Everything a pass declared during setup.
///
/// Frozen once setup returns; barrier planning and execution read it.
#[derive(Debug, Default)]
pub struct PassDeclaration {
    pub(crate) accesses: Vec<AccessDecl>,
    pub(crate) raster_pipeline: Option<RasterPipelineDesc>,
    pub(crate) compute_pipeline: Option<ComputePipelineDesc>,
    pub(crate) color_targets: Vec<ColorTargetDecl>,
    pub(crate) depth_target: Option<DepthTargetDecl>,
    pub(crate) viewport: Option<Viewport>,
    pub(crate) scissor: Option<ScissorRect>,
    pub(crate) skip_texture_write_barriers: bool,
}

impl PassDeclaration {
    /// Record an access, merging with any earlier access to the same
    /// resource.
    pub(crate) fn declare(&mut self, handle: Handle, access: ResourceAccess) {
        for decl in &mut self.accesses {
            if decl.handle == handle {
                decl.access = decl.access.merge(access);
                return;
            }
        }
        self.accesses.push(AccessDecl { handle, access });
    }

    /// Declared accesses in declaration order.
    pub fn accesses(&self) -> &[AccessDecl] {
        &self.accesses
    }

    /// Merged access for a handle, if declared.
    pub fn access_for(&self, handle: Handle) -> Option<ResourceAccess> {
        self.accesses
            .iter()
            .find(|decl| decl.handle == handle)
            .map(|decl| decl.access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(index: u32) -> Handle {
        // Arena handles start at generation 0.
        let mut arena = vermilion_core::arena::Arena::new();
        for _ in 0..=index {
            arena.insert(());
        }
        arena.handle_at(index).unwrap()
    }

    #[test]
    fn test_read_write_upgrade() {
        let mut decl = PassDeclaration::default();
        let h = handle(0);

        decl.declare(h, ResourceAccess::Read);
        decl.declare(h, ResourceAccess::Write);

        assert_eq!(decl.access_for(h), Some(ResourceAccess::ReadWrite));
        assert_eq!(decl.accesses().len(), 1);
    }

    #[test]
    fn test_write_then_read_upgrade() {
        let mut decl = PassDeclaration::default();
        let h = handle(0);

        decl.declare(h, ResourceAccess::Write);
        decl.declare(h, ResourceAccess::Read);

        assert_eq!(decl.access_for(h), Some(ResourceAccess::ReadWrite));
    }

    #[test]
    fn test_repeated_access_is_stable() {
        let mut decl = PassDeclaration::default();
        let h = handle(0);

        decl.declare(h, ResourceAccess::Read);
        decl.declare(h, ResourceAccess::Read);

        assert_eq!(decl.access_for(h), Some(ResourceAccess::Read));
        assert_eq!(decl.accesses().len(), 1);
    }

    #[test]
    fn test_create_subsumes_write() {
        let mut decl = PassDeclaration::default();
        let h = handle(0);

        decl.declare(h, ResourceAccess::Create);
        decl.declare(h, ResourceAccess::Write);

        assert_eq!(decl.access_for(h), Some(ResourceAccess::Create));
    }

    #[test]
    fn test_distinct_handles_stay_separate() {
        let mut decl = PassDeclaration::default();
        let a = handle(0);
        let b = handle(1);

        decl.declare(a, ResourceAccess::Read);
        decl.declare(b, ResourceAccess::Write);

        assert_eq!(decl.accesses().len(), 2);
        assert_eq!(decl.access_for(a), Some(ResourceAccess::Read));
        assert_eq!(decl.access_for(b), Some(ResourceAccess::Write));
    }

    #[test]
    fn test_required_states() {
        assert_eq!(
            ResourceAccess::Write.required_state(TextureFormat::Rgba8Unorm),
            ResourceState::ColorAttachment
        );
        assert_eq!(
            ResourceAccess::Write.required_state(TextureFormat::Depth32Float),
            ResourceState::DepthStencilAttachment
        );
        assert_eq!(
            ResourceAccess::Read.required_state(TextureFormat::Rgba8Unorm),
            ResourceState::ShaderRead
        );
        assert_eq!(
            ResourceAccess::ReadWrite.required_state(TextureFormat::Rgba8Unorm),
            ResourceState::General
        );
    }
}
