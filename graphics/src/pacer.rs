//! Frame pacing for multiple frames in flight.
//!
//! With N frames in flight there are N frame slots, each remembering the
//! completion fence of the last frame submitted through it. Starting a new
//! frame waits for its slot's fence, so the CPU never gets more than N
//! frames ahead of the GPU and never rewrites per-frame resources the GPU
//! is still reading.
//!
//! ```text
//! frames_in_flight = 2
//!
//! Slot 0: [Frame 0] --> [Frame 2] --> [Frame 4] -->
//! Slot 1: [Frame 1] --> [Frame 3] --> [Frame 5] -->
//! ```

use std::time::Duration;

use crate::rhi::Fence;

/// Paces frame starts against GPU completion fences.
///
/// Not thread-safe; owned by the render thread.
#[derive(Debug)]
pub struct FramePacer {
    /// Fence per slot, `None` until the slot is first used.
    slot_fences: Vec<Option<Fence>>,
    current_slot: usize,
    frame_count: u64,
}

impl FramePacer {
    /// Create a pacer allowing `frames_in_flight` overlapping frames.
    ///
    /// Panics if `frames_in_flight` is 0.
    pub fn new(frames_in_flight: usize) -> Self {
        assert!(frames_in_flight > 0, "frames_in_flight must be at least 1");
        Self {
            slot_fences: (0..frames_in_flight).map(|_| None).collect(),
            current_slot: 0,
            frame_count: 0,
        }
    }

    /// Start a frame, blocking until the current slot's previous frame
    /// completes.
    pub fn begin_frame(&mut self) {
        if let Some(fence) = &self.slot_fences[self.current_slot] {
            fence.wait();
        }
        self.frame_count += 1;
        log::trace!(
            "begin frame {} (slot {})",
            self.frame_count,
            self.current_slot
        );
    }

    /// Like [`begin_frame`](Self::begin_frame) with a timeout.
    ///
    /// Returns `false`, without starting the frame, if the slot did not
    /// become ready in time.
    pub fn begin_frame_timeout(&mut self, timeout: Duration) -> bool {
        if let Some(fence) = &self.slot_fences[self.current_slot] {
            if !fence.wait_timeout(timeout) {
                return false;
            }
        }
        self.frame_count += 1;
        true
    }

    /// Record the frame's completion fence and advance to the next slot.
    pub fn end_frame(&mut self, fence: Fence) {
        log::trace!("end frame {} (slot {})", self.frame_count, self.current_slot);
        self.slot_fences[self.current_slot] = Some(fence);
        self.current_slot = (self.current_slot + 1) % self.slot_fences.len();
    }

    /// Block until every slot's fence is signaled.
    ///
    /// Call before destroying GPU resources.
    pub fn wait_idle(&self) {
        for fence in self.slot_fences.iter().flatten() {
            fence.wait();
        }
    }

    /// Number of frames that may overlap.
    pub fn frames_in_flight(&self) -> usize {
        self.slot_fences.len()
    }

    /// Slot the next frame will use.
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Total frames started.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Check, without blocking, whether all in-flight work is done.
    pub fn is_idle(&self) -> bool {
        self.slot_fences
            .iter()
            .flatten()
            .all(|fence| fence.is_signaled())
    }
}

impl Default for FramePacer {
    /// Two frames in flight, the usual choice.
    fn default() -> Self {
        Self::new(2)
    }
}
