//! Barrier planning from pass declarations.
//!
//! After setup, each pass's declarations are walked in order and compared
//! against the registry's tracked states. A barrier is planned only when a
//! resource is not already in the state the access needs, so back-to-back
//! reads of the same texture cost one transition, not one per pass.

use vermilion_core::arena::Handle;

use crate::error::GraphicsError;
use crate::graph::access::PassDeclaration;
use crate::registry::ResourceRegistry;
use crate::rhi::ResourceState;

/// A planned state transition, recorded ahead of a pass's commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrier {
    pub handle: Handle,
    pub old_state: ResourceState,
    pub new_state: ResourceState,
}

/// Plan the barriers a pass needs, advancing the registry's tracked states.
///
/// Write barriers are omitted when the pass opted out via
/// `skip_texture_write_barriers`, but the tracked state still advances: the
/// pass promises to perform the transition itself, and later passes plan
/// against the state it leaves behind.
pub fn plan_pass_barriers(
    decl: &PassDeclaration,
    registry: &mut ResourceRegistry,
) -> Result<Vec<Barrier>, GraphicsError> {
    let mut barriers = Vec::new();
    for access_decl in decl.accesses() {
        let slot = registry.resolve(access_decl.handle)?;
        let current = slot.state();
        let required = access_decl.access.required_state(slot.descriptor().format);
        if current == required {
            continue;
        }

        let skip = decl.skip_texture_write_barriers && access_decl.access.is_write();
        if !skip {
            barriers.push(Barrier {
                handle: access_decl.handle,
                old_state: current,
                new_state: required,
            });
        }
        registry.record_transition(access_decl.handle, required);
    }
    Ok(barriers)
}
