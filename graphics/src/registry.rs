//! Named transient resource registry.
//!
//! The registry owns every texture and buffer the frame graph touches.
//! Resources are addressed by name at declaration time and by generational
//! [`Handle`] during execution. Handles are only valid for the build that
//! issued them: [`ResourceRegistry::begin_build`] invalidates all
//! outstanding handles, so a handle smuggled across frames fails
//! [`resolve`](ResourceRegistry::resolve) instead of reaching a resource
//! that may have been replaced.
//!
//! A named resource survives across builds as long as it is requested with a
//! compatible descriptor. Requesting it with a different descriptor replaces
//! it with a fresh one. The GPU runs one or more frames behind the CPU, so
//! the replaced backend object cannot be destroyed right away; it is parked
//! in a retirement queue together with the completion fences of the work
//! that was in flight when the build started, and destroyed only once all of
//! them have signaled.

use std::collections::HashMap;
use std::sync::Arc;

use vermilion_core::arena::{Arena, Handle};

use crate::error::GraphicsError;
use crate::rhi::{Fence, ResourceState, RhiBackend, RhiBuffer, RhiTexture};
use crate::types::{BufferDescriptor, TextureDescriptor};

/// A registered texture with its tracked GPU state.
#[derive(Debug, PartialEq)]
pub struct ResourceSlot {
    name: String,
    desc: TextureDescriptor,
    texture: RhiTexture,
    state: ResourceState,
}

impl ResourceSlot {
    /// Name the resource was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor the resource was created with.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.desc
    }

    /// Backend texture object.
    pub fn texture(&self) -> &RhiTexture {
        &self.texture
    }

    /// Last known GPU state.
    pub fn state(&self) -> ResourceState {
        self.state
    }
}

/// A registered buffer.
///
/// Buffers carry no tracked state; they do not participate in barrier
/// planning.
#[derive(Debug, PartialEq)]
pub struct BufferSlot {
    name: String,
    desc: BufferDescriptor,
    buffer: RhiBuffer,
}

impl BufferSlot {
    /// Name the buffer was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor the buffer was created with.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.desc
    }

    /// Backend buffer object.
    pub fn buffer(&self) -> &RhiBuffer {
        &self.buffer
    }
}

#[derive(Debug)]
enum RetiredObject {
    Texture(RhiTexture),
    Buffer(RhiBuffer),
}

/// A replaced backend object waiting for in-flight GPU work to finish.
#[derive(Debug)]
struct RetiredResource {
    object: RetiredObject,
    guards: Vec<Fence>,
}

/// Owner of all frame graph textures and buffers.
pub struct ResourceRegistry {
    backend: Arc<dyn RhiBackend>,
    slots: Arena<ResourceSlot>,
    by_name: HashMap<String, u32>,
    buffer_slots: Arena<BufferSlot>,
    buffers_by_name: HashMap<String, u32>,
    // Fences covering GPU work that was in flight when the current build
    // started; replaced objects are guarded by a copy of this set.
    frame_guards: Vec<Fence>,
    retired: Vec<RetiredResource>,
}

impl ResourceRegistry {
    /// Create an empty registry backed by `backend`.
    pub fn new(backend: Arc<dyn RhiBackend>) -> Self {
        Self {
            backend,
            slots: Arena::new(),
            by_name: HashMap::new(),
            buffer_slots: Arena::new(),
            buffers_by_name: HashMap::new(),
            frame_guards: Vec::new(),
            retired: Vec::new(),
        }
    }

    /// Number of registered textures.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check whether no textures are registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of registered buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffer_slots.len()
    }

    /// Number of replaced objects awaiting deferred destruction.
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    /// Start a new graph build, invalidating every handle issued before.
    ///
    /// `in_flight` is the set of completion fences covering GPU work that
    /// may still reference registered resources. Any resource replaced or
    /// released during this build is destroyed only after all of them have
    /// signaled. Registered resources survive; fresh handles for them come
    /// from the next [`get_or_create`](Self::get_or_create).
    pub fn begin_build(&mut self, in_flight: &[Fence]) {
        self.destroy_retired_completed();
        self.frame_guards = in_flight.to_vec();
        self.slots.invalidate_handles();
        self.buffer_slots.invalidate_handles();
    }

    /// Get the texture registered under `name`, creating it if needed.
    ///
    /// Repeated calls with the same name and a compatible descriptor in one
    /// build return the same handle. An incompatible descriptor retires the
    /// old texture and registers a new one under the same name. An invalid
    /// descriptor is logged and yields [`Handle::INVALID`].
    pub fn get_or_create(&mut self, name: &str, desc: &TextureDescriptor) -> Handle {
        if !desc.is_valid() {
            log::error!("invalid texture descriptor for '{name}': {desc:?}");
            return Handle::INVALID;
        }

        if let Some(&index) = self.by_name.get(name) {
            let handle = match self.slots.handle_at(index) {
                Some(handle) => handle,
                None => {
                    log::error!("registry name map points at empty slot for '{name}'");
                    return Handle::INVALID;
                }
            };
            let slot = match self.slots.get(handle) {
                Some(slot) => slot,
                None => return Handle::INVALID,
            };
            if slot.desc.is_compatible_with(desc) {
                return handle;
            }

            log::trace!("recreating '{name}' with a changed descriptor");
            if let Some(old) = self.slots.remove(handle) {
                self.retire(RetiredObject::Texture(old.texture));
            }
            self.by_name.remove(name);
        }

        let texture = match self.backend.create_texture(name, desc) {
            Ok(texture) => texture,
            Err(err) => {
                log::error!("failed to create texture '{name}': {err}");
                return Handle::INVALID;
            }
        };
        let handle = self.slots.insert(ResourceSlot {
            name: name.to_string(),
            desc: *desc,
            texture,
            state: ResourceState::Undefined,
        });
        self.by_name.insert(name.to_string(), handle.index());
        handle
    }

    /// Get the buffer registered under `name`, creating it if needed.
    ///
    /// Same contract as [`get_or_create`](Self::get_or_create): idempotent
    /// for a matching descriptor within one build, retires and recreates on
    /// a changed descriptor, and an invalid descriptor is logged and yields
    /// [`Handle::INVALID`].
    pub fn get_or_create_buffer(&mut self, name: &str, desc: &BufferDescriptor) -> Handle {
        if !desc.is_valid() {
            log::error!("invalid buffer descriptor for '{name}': {desc:?}");
            return Handle::INVALID;
        }

        if let Some(&index) = self.buffers_by_name.get(name) {
            let handle = match self.buffer_slots.handle_at(index) {
                Some(handle) => handle,
                None => {
                    log::error!("registry name map points at empty buffer slot for '{name}'");
                    return Handle::INVALID;
                }
            };
            let slot = match self.buffer_slots.get(handle) {
                Some(slot) => slot,
                None => return Handle::INVALID,
            };
            if slot.desc == *desc {
                return handle;
            }

            log::trace!("recreating buffer '{name}' with a changed descriptor");
            if let Some(old) = self.buffer_slots.remove(handle) {
                self.retire(RetiredObject::Buffer(old.buffer));
            }
            self.buffers_by_name.remove(name);
        }

        let buffer = match self.backend.create_buffer(name, desc) {
            Ok(buffer) => buffer,
            Err(err) => {
                log::error!("failed to create buffer '{name}': {err}");
                return Handle::INVALID;
            }
        };
        let handle = self.buffer_slots.insert(BufferSlot {
            name: name.to_string(),
            desc: *desc,
            buffer,
        });
        self.buffers_by_name.insert(name.to_string(), handle.index());
        handle
    }

    /// Current handle for the texture registered under `name`, if any.
    pub fn handle_by_name(&self, name: &str) -> Option<Handle> {
        let &index = self.by_name.get(name)?;
        self.slots.handle_at(index)
    }

    /// Current handle for the buffer registered under `name`, if any.
    pub fn buffer_handle_by_name(&self, name: &str) -> Option<Handle> {
        let &index = self.buffers_by_name.get(name)?;
        self.buffer_slots.handle_at(index)
    }

    /// Resolve a texture handle issued by the current build.
    pub fn resolve(&self, handle: Handle) -> Result<&ResourceSlot, GraphicsError> {
        self.slots.get(handle).ok_or(GraphicsError::StaleHandle)
    }

    /// Resolve a buffer handle issued by the current build.
    pub fn resolve_buffer(&self, handle: Handle) -> Result<&BufferSlot, GraphicsError> {
        self.buffer_slots
            .get(handle)
            .ok_or(GraphicsError::StaleHandle)
    }

    /// Record a state transition planned for a texture.
    ///
    /// Panics on a stale handle: transitions are planned from declarations
    /// made in the same build, so a miss is a programming error.
    pub fn record_transition(&mut self, handle: Handle, new_state: ResourceState) {
        let slot = self
            .slots
            .get_mut(handle)
            .expect("state transition recorded for a stale handle");
        slot.state = new_state;
    }

    /// Unregister the texture under `name`, retiring its backend object.
    ///
    /// Returns `false` if the name is unknown. The backend object is
    /// destroyed once the work guarding the current build completes.
    pub fn release(&mut self, name: &str) -> bool {
        let Some(index) = self.by_name.remove(name) else {
            return false;
        };
        if let Some(handle) = self.slots.handle_at(index) {
            if let Some(slot) = self.slots.remove(handle) {
                self.retire(RetiredObject::Texture(slot.texture));
                return true;
            }
        }
        false
    }

    /// Unregister the buffer under `name`, retiring its backend object.
    pub fn release_buffer(&mut self, name: &str) -> bool {
        let Some(index) = self.buffers_by_name.remove(name) else {
            return false;
        };
        if let Some(handle) = self.buffer_slots.handle_at(index) {
            if let Some(slot) = self.buffer_slots.remove(handle) {
                self.retire(RetiredObject::Buffer(slot.buffer));
                return true;
            }
        }
        false
    }

    /// Destroy retired objects whose guarding fences have all signaled.
    pub fn destroy_retired_completed(&mut self) {
        let mut index = 0;
        while index < self.retired.len() {
            if self.retired[index].guards.iter().all(Fence::is_signaled) {
                let done = self.retired.swap_remove(index);
                match done.object {
                    RetiredObject::Texture(texture) => self.backend.destroy_texture(&texture),
                    RetiredObject::Buffer(buffer) => self.backend.destroy_buffer(&buffer),
                }
            } else {
                index += 1;
            }
        }
    }

    fn retire(&mut self, object: RetiredObject) {
        if self.frame_guards.iter().all(Fence::is_signaled) {
            match object {
                RetiredObject::Texture(texture) => self.backend.destroy_texture(&texture),
                RetiredObject::Buffer(buffer) => self.backend.destroy_buffer(&buffer),
            }
            return;
        }
        self.retired.push(RetiredResource {
            object,
            guards: self.frame_guards.clone(),
        });
    }
}
