//! Double-buffered per-frame CPU data.

/// Two copies of per-frame data with an explicit swap.
///
/// The *pending* slot is what the current frame writes; the *current* slot
/// is what rendering reads. [`swap`](Self::swap) flips them once per frame,
/// so readers always see the previous frame's fully written data and never
/// a half-updated one.
#[derive(Debug, Default)]
pub struct DoubleBuffered<T> {
    slots: [T; 2],
    current: usize,
    swap_count: u64,
}

/// Opaque marker for counting swaps, see
/// [`DoubleBuffered::swaps_since`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapMarker(u64);

impl<T> DoubleBuffered<T> {
    /// Create with explicit initial values for the current and pending
    /// slots.
    pub fn new(current: T, pending: T) -> Self {
        Self {
            slots: [current, pending],
            current: 0,
            swap_count: 0,
        }
    }

    /// The slot rendering reads this frame.
    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    /// Mutable access to the current slot.
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.slots[self.current]
    }

    /// The slot this frame writes into.
    pub fn pending_mut(&mut self) -> &mut T {
        &mut self.slots[1 - self.current]
    }

    /// Make pending current and expose the old current for rewriting.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
        self.swap_count += 1;
    }

    /// Total number of swaps performed.
    pub fn swap_count(&self) -> u64 {
        self.swap_count
    }

    /// Marker for asserting swap discipline later.
    pub fn swap_marker(&self) -> SwapMarker {
        SwapMarker(self.swap_count)
    }

    /// Swaps performed since `marker` was taken.
    pub fn swaps_since(&self, marker: SwapMarker) -> u64 {
        self.swap_count - marker.0
    }
}
