//! Command list pooling and recycling.
//!
//! Command lists move through a strict state machine:
//!
//! | State     | Meaning                                   |
//! |-----------|-------------------------------------------|
//! | Idle      | In the pool, ready to record              |
//! | Recording | Between `begin_recording` and `finish`    |
//! | Ended     | Recorded, waiting for submit              |
//! | Submitted | On the queue, waiting for its fence       |
//!
//! Recycling is driven purely by fences: a submitted list returns to its
//! allocator only after [`CommandListPool::retire_completed`] observes its
//! fence signaled. Nothing in the pool keys off wall-clock time.
//!
//! Each allocator keeps a hard free/in-use partition over its lists;
//! violations (double return, recycling an unsubmitted list) panic rather
//! than corrupt the pool.

use std::sync::Arc;

use bytemuck::Pod;
use parking_lot::Mutex;

use crate::rhi::{
    Fence, RenderPassColorAttachment, RenderPassDepthAttachment, ResourceState, RhiBackend,
    RhiBuffer, RhiCommandList, RhiTexture,
};
use crate::types::{
    ComputePipelineDesc, RasterPipelineDesc, SamplerDescriptor, ScissorRect, Viewport,
};

/// Lifecycle state of a [`CommandList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandListState {
    Idle,
    Recording,
    Ended,
    Submitted,
}

/// Identifies a command list's home slot in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandListId {
    allocator: u32,
    index: u32,
}

/// A pooled command list with enforced state transitions.
///
/// Recording methods panic unless the list is in the `Recording` state.
pub struct CommandList {
    id: CommandListId,
    state: CommandListState,
    rhi: Box<dyn RhiCommandList>,
}

impl CommandList {
    fn new(id: CommandListId, rhi: Box<dyn RhiCommandList>) -> Self {
        Self {
            id,
            state: CommandListState::Idle,
            rhi,
        }
    }

    /// Home slot of this list.
    pub fn id(&self) -> CommandListId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CommandListState {
        self.state
    }

    /// Transition `Idle -> Recording`.
    pub fn begin_recording(&mut self) {
        assert_eq!(
            self.state,
            CommandListState::Idle,
            "begin_recording on a non-idle command list"
        );
        self.rhi.begin();
        self.state = CommandListState::Recording;
    }

    /// Transition `Recording -> Ended`.
    pub fn finish(&mut self) {
        assert_eq!(
            self.state,
            CommandListState::Recording,
            "finish on a command list that is not recording"
        );
        self.rhi.end();
        self.state = CommandListState::Ended;
    }

    fn assert_recording(&self) {
        assert_eq!(
            self.state,
            CommandListState::Recording,
            "command recorded outside begin_recording/finish"
        );
    }

    pub fn pipeline_barrier(&mut self, texture: &RhiTexture, old: ResourceState, new: ResourceState) {
        self.assert_recording();
        self.rhi.pipeline_barrier(texture, old, new);
    }

    pub fn begin_render_pass(
        &mut self,
        colors: &[RenderPassColorAttachment<'_>],
        depth: Option<&RenderPassDepthAttachment<'_>>,
    ) {
        self.assert_recording();
        self.rhi.begin_render_pass(colors, depth);
    }

    pub fn end_render_pass(&mut self) {
        self.assert_recording();
        self.rhi.end_render_pass();
    }

    pub fn bind_raster_pipeline(&mut self, desc: &RasterPipelineDesc) {
        self.assert_recording();
        self.rhi.bind_raster_pipeline(desc);
    }

    pub fn bind_compute_pipeline(&mut self, desc: &ComputePipelineDesc) {
        self.assert_recording();
        self.rhi.bind_compute_pipeline(desc);
    }

    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.assert_recording();
        self.rhi.set_viewport(viewport);
    }

    pub fn set_scissor(&mut self, rect: &ScissorRect) {
        self.assert_recording();
        self.rhi.set_scissor(rect);
    }

    /// Bind a plain-old-data uniform value to a slot.
    pub fn set_uniform<T: Pod>(&mut self, slot: u32, value: &T) {
        self.assert_recording();
        self.rhi.set_uniform_bytes(slot, bytemuck::bytes_of(value));
    }

    /// Bind a slice of plain-old-data uniform values to a slot.
    pub fn upload_uniform<T: Pod>(&mut self, slot: u32, values: &[T]) {
        self.assert_recording();
        self.rhi.set_uniform_bytes(slot, bytemuck::cast_slice(values));
    }

    pub fn set_texture(&mut self, slot: u32, texture: &RhiTexture) {
        self.assert_recording();
        self.rhi.set_texture(slot, texture);
    }

    pub fn set_sampler(&mut self, slot: u32, desc: &SamplerDescriptor) {
        self.assert_recording();
        self.rhi.set_sampler(slot, desc);
    }

    pub fn set_unordered_access(&mut self, slot: u32, texture: &RhiTexture) {
        self.assert_recording();
        self.rhi.set_unordered_access(slot, texture);
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: &RhiBuffer) {
        self.assert_recording();
        self.rhi.set_vertex_buffer(slot, buffer);
    }

    pub fn set_index_buffer(&mut self, buffer: &RhiBuffer) {
        self.assert_recording();
        self.rhi.set_index_buffer(buffer);
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.assert_recording();
        self.rhi.draw(vertex_count, instance_count);
    }

    pub fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.assert_recording();
        self.rhi.draw_indexed(index_count, instance_count);
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.assert_recording();
        self.rhi.dispatch(x, y, z);
    }

    fn mark_submitted(&mut self) {
        assert_eq!(
            self.state,
            CommandListState::Ended,
            "submit on a command list that was not ended"
        );
        self.state = CommandListState::Submitted;
    }

    fn recycle(&mut self) {
        assert_eq!(
            self.state,
            CommandListState::Submitted,
            "recycle on a command list that was never submitted"
        );
        self.rhi.reset();
        self.state = CommandListState::Idle;
    }
}

/// Fixed-capacity allocator holding command lists of one batch.
struct CommandAllocator {
    // A checked-out list's slot holds None until it comes back.
    lists: Vec<Option<CommandList>>,
    free: Vec<u32>,
    in_use: Vec<bool>,
}

impl CommandAllocator {
    fn new(backend: &dyn RhiBackend, allocator: u32, capacity: u32) -> Self {
        let lists = (0..capacity)
            .map(|index| {
                Some(CommandList::new(
                    CommandListId { allocator, index },
                    backend.create_command_list(),
                ))
            })
            .collect();
        Self {
            lists,
            free: (0..capacity).rev().collect(),
            in_use: vec![false; capacity as usize],
        }
    }

    fn acquire(&mut self) -> Option<CommandList> {
        let index = self.free.pop()?;
        debug_assert!(!self.in_use[index as usize], "free list held an in-use slot");
        self.in_use[index as usize] = true;
        let list = self.lists[index as usize]
            .take()
            .expect("free slot held no command list");
        Some(list)
    }

    fn give_back(&mut self, list: CommandList) {
        let index = list.id.index;
        assert!(
            self.in_use[index as usize],
            "command list returned twice to its allocator"
        );
        assert_eq!(list.state, CommandListState::Idle, "non-idle list returned");
        self.in_use[index as usize] = false;
        self.lists[index as usize] = Some(list);
        self.free.push(index);
    }

    fn free_count(&self) -> usize {
        self.free.len()
    }

    fn all_free(&self) -> bool {
        self.free.len() == self.lists.len()
    }
}

struct PendingSubmission {
    fence: Fence,
    list: CommandList,
}

/// Pool of command lists with bounded growth and fence-driven recycling.
pub struct CommandListPool {
    backend: Arc<dyn RhiBackend>,
    allocators: Mutex<Vec<CommandAllocator>>,
    pending: Mutex<Vec<PendingSubmission>>,
    max_allocators: u32,
    lists_per_allocator: u32,
}

impl CommandListPool {
    /// Default growth limit.
    pub const DEFAULT_MAX_ALLOCATORS: u32 = 4;
    /// Default allocator capacity.
    pub const DEFAULT_LISTS_PER_ALLOCATOR: u32 = 8;

    /// Create a pool with default limits.
    pub fn new(backend: Arc<dyn RhiBackend>) -> Self {
        Self::with_limits(
            backend,
            Self::DEFAULT_MAX_ALLOCATORS,
            Self::DEFAULT_LISTS_PER_ALLOCATOR,
        )
    }

    /// Create a pool with explicit growth limits.
    pub fn with_limits(
        backend: Arc<dyn RhiBackend>,
        max_allocators: u32,
        lists_per_allocator: u32,
    ) -> Self {
        assert!(max_allocators >= 1, "pool needs at least one allocator");
        assert!(lists_per_allocator >= 1, "allocator needs at least one list");
        let first = CommandAllocator::new(backend.as_ref(), 0, lists_per_allocator);
        Self {
            backend,
            allocators: Mutex::new(vec![first]),
            pending: Mutex::new(Vec::new()),
            max_allocators,
            lists_per_allocator,
        }
    }

    /// Check out an idle command list, growing the pool if needed.
    ///
    /// Panics once the growth limit is reached and every list is in flight.
    /// Running out of command lists means submissions are not completing,
    /// which is not a condition worth limping through.
    pub fn get_command_list(&self) -> CommandList {
        let mut allocators = self.allocators.lock();
        for allocator in allocators.iter_mut() {
            if let Some(list) = allocator.acquire() {
                return list;
            }
        }

        if (allocators.len() as u32) < self.max_allocators {
            let index = allocators.len() as u32;
            log::trace!("growing command list pool to {} allocators", index + 1);
            let mut allocator =
                CommandAllocator::new(self.backend.as_ref(), index, self.lists_per_allocator);
            let list = allocator
                .acquire()
                .expect("fresh allocator had no free list");
            allocators.push(allocator);
            return list;
        }

        panic!(
            "command list pool exhausted: {} allocators x {} lists all in flight",
            self.max_allocators, self.lists_per_allocator
        );
    }

    /// Return a list that was checked out but never recorded.
    pub fn return_unused(&self, list: CommandList) {
        assert_eq!(
            list.state,
            CommandListState::Idle,
            "return_unused on a list with recorded work"
        );
        self.give_back(list);
    }

    /// Take back a checked-out list, discarding any recorded commands.
    ///
    /// For recordings abandoned partway; the list returns to the pool
    /// idle. A submitted list cannot be discarded, its fence owns it.
    pub fn discard(&self, mut list: CommandList) {
        match list.state {
            CommandListState::Recording | CommandListState::Ended => {
                list.rhi.reset();
                list.state = CommandListState::Idle;
            }
            CommandListState::Idle => {}
            CommandListState::Submitted => {
                panic!("discard on a submitted command list")
            }
        }
        self.give_back(list);
    }

    /// Submit an ended list to the queue.
    ///
    /// The list stays checked out until its fence signals and a later
    /// [`retire_completed`](Self::retire_completed) picks it up.
    pub fn submit(&self, mut list: CommandList) -> Fence {
        list.mark_submitted();
        let fence = self.backend.submit(list.rhi.as_mut());
        self.pending.lock().push(PendingSubmission {
            fence: fence.clone(),
            list,
        });
        fence
    }

    /// Recycle every submitted list whose fence has signaled.
    pub fn retire_completed(&self) {
        let mut pending = self.pending.lock();
        let mut index = 0;
        while index < pending.len() {
            if pending[index].fence.is_signaled() {
                let mut done = pending.swap_remove(index);
                done.list.recycle();
                self.give_back(done.list);
            } else {
                index += 1;
            }
        }
    }

    /// Block until every in-flight submission completes, then recycle.
    pub fn drain(&self) {
        for fence in self.in_flight_fences() {
            fence.wait();
        }
        self.retire_completed();
    }

    /// Frame-boundary reset.
    ///
    /// Recycles confirmed completions and verifies every allocator's free
    /// set is back at full capacity. Panics if any submission is still in
    /// flight or any list is still checked out; the caller confirms
    /// completions first (e.g. via [`drain`](Self::drain)).
    pub fn reset(&self) {
        self.assert_quiescent();
        log::trace!("command list pool reset");
    }

    /// Assert the pool is quiescent at a frame boundary.
    ///
    /// Panics if any list is still checked out or in flight.
    pub fn assert_quiescent(&self) {
        self.retire_completed();
        assert!(
            self.pending.lock().is_empty(),
            "command lists still in flight at frame boundary"
        );
        let allocators = self.allocators.lock();
        assert!(
            allocators.iter().all(|a| a.all_free()),
            "command lists still checked out at frame boundary"
        );
    }

    /// Number of submissions whose fences have not signaled.
    pub fn pending_submissions(&self) -> usize {
        self.pending.lock().len()
    }

    /// Completion fences of every in-flight submission.
    pub fn in_flight_fences(&self) -> Vec<Fence> {
        self.pending
            .lock()
            .iter()
            .map(|p| p.fence.clone())
            .collect()
    }

    /// Number of idle lists across all allocators.
    pub fn free_count(&self) -> usize {
        self.allocators.lock().iter().map(|a| a.free_count()).sum()
    }

    /// Number of allocators the pool has grown to.
    pub fn allocator_count(&self) -> usize {
        self.allocators.lock().len()
    }

    fn give_back(&self, list: CommandList) {
        let mut allocators = self.allocators.lock();
        let slot = list.id.allocator as usize;
        assert!(slot < allocators.len(), "list from a foreign pool returned");
        allocators[slot].give_back(list);
    }
}
