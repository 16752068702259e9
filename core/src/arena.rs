//! Generation-tagged slot arena.
//!
//! This module provides [`Arena<T>`], a slot-based container addressed by
//! opaque [`Handle`]s instead of references or raw indices. Each slot carries
//! a generation counter; a handle is only valid while its generation matches
//! the slot's current generation. Removing a value (or invalidating the whole
//! arena) bumps generations, so stale handles fail lookup instead of silently
//! aliasing a different value.
//!
//! # Motivation
//!
//! In frame-based systems, references handed out during one frame must not be
//! usable to reach a resource that was destroyed or replaced in a later frame.
//! Generational handles turn that use-after-free class into a recoverable
//! lookup failure.
//!
//! # Example
//!
//! ```
//! use vermilion_core::arena::Arena;
//!
//! let mut arena = Arena::new();
//! let handle = arena.insert("gbuffer");
//! assert_eq!(arena.get(handle), Some(&"gbuffer"));
//!
//! arena.remove(handle);
//! assert_eq!(arena.get(handle), None); // stale handle, not a different value
//! ```

use static_assertions::assert_eq_size;

/// Opaque, generation-tagged reference to a slot in an [`Arena`].
///
/// `Handle` is `Copy` and cheap to pass around. It is only valid for the
/// arena that issued it, and only until the slot's generation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

// Handles are passed by value everywhere; keep them register-sized.
assert_eq_size!(Handle, u64);

impl Handle {
    /// Sentinel handle that never resolves to a value.
    pub const INVALID: Handle = Handle {
        index: u32::MAX,
        generation: 0,
    };

    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Check whether this handle is the invalid sentinel.
    ///
    /// A valid-looking handle may still be stale; only the issuing arena
    /// can tell.
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// Slot index within the issuing arena.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation the handle was issued with.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::INVALID
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A slot arena with generation-checked handles.
///
/// Freed slots are recycled (LIFO) with a bumped generation, so handles to
/// the old occupant keep failing lookup after the slot is reused.
#[derive(Debug, Default)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    /// Create a new empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check whether the arena holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value and return its handle.
    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none(), "free list pointed at occupied slot");
            slot.value = Some(value);
            Handle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            Handle::new(index, 0)
        }
    }

    /// Look up a value by handle.
    ///
    /// Returns `None` if the handle is invalid, stale, or points at an
    /// empty slot.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Look up a value mutably by handle.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Check whether a handle currently resolves.
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Remove a value, bumping the slot's generation.
    ///
    /// Returns `None` if the handle does not resolve (already removed or
    /// stale); removal is never observed twice for the same handle.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    /// Bump the generation of every slot, invalidating all outstanding
    /// handles while keeping the stored values.
    ///
    /// Fresh handles for the surviving values can be re-issued with
    /// [`handle_at`](Self::handle_at).
    pub fn invalidate_handles(&mut self) {
        for slot in &mut self.slots {
            slot.generation = slot.generation.wrapping_add(1);
        }
    }

    /// Current handle for the value stored at `index`, if the slot is
    /// occupied.
    pub fn handle_at(&self, index: u32) -> Option<Handle> {
        let slot = self.slots.get(index as usize)?;
        slot.value.as_ref()?;
        Some(Handle::new(index, slot.generation))
    }

    /// Iterate over all live values with their current handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }

    /// Iterate mutably over all live values with their current handles.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(move |value| (Handle::new(index as u32, generation), value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_handle() {
        let arena: Arena<u32> = Arena::new();
        assert!(!Handle::INVALID.is_valid());
        assert_eq!(arena.get(Handle::INVALID), None);
        assert_eq!(Handle::default(), Handle::INVALID);
    }

    #[test]
    fn test_insert_and_get() {
        let mut arena = Arena::new();
        let a = arena.insert(10);
        let b = arena.insert(20);

        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), Some(&10));
        assert_eq!(arena.get(b), Some(&20));
        assert!(a.is_valid());
        assert_ne!(a, b);
    }

    #[test]
    fn test_get_mut() {
        let mut arena = Arena::new();
        let handle = arena.insert(1);
        *arena.get_mut(handle).unwrap() = 2;
        assert_eq!(arena.get(handle), Some(&2));
    }

    #[test]
    fn test_remove_invalidates_handle() {
        let mut arena = Arena::new();
        let handle = arena.insert("value");

        assert_eq!(arena.remove(handle), Some("value"));
        assert_eq!(arena.len(), 0);
        assert_eq!(arena.get(handle), None);
        assert_eq!(arena.remove(handle), None); // second remove is a no-op
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let mut arena = Arena::new();
        let old = arena.insert(1);
        arena.remove(old);

        // Freed slot is recycled, but the old handle must not see the
        // new occupant.
        let new = arena.insert(2);
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert_eq!(arena.get(old), None);
        assert_eq!(arena.get(new), Some(&2));
    }

    #[test]
    fn test_invalidate_handles_keeps_values() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");

        arena.invalidate_handles();

        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), None);

        let a2 = arena.handle_at(a.index()).unwrap();
        let b2 = arena.handle_at(b.index()).unwrap();
        assert_eq!(arena.get(a2), Some(&"a"));
        assert_eq!(arena.get(b2), Some(&"b"));
    }

    #[test]
    fn test_handle_at_empty_slot() {
        let mut arena = Arena::new();
        let handle = arena.insert(1);
        arena.remove(handle);

        assert_eq!(arena.handle_at(handle.index()), None);
        assert_eq!(arena.handle_at(99), None);
    }

    #[test]
    fn test_iter() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let c = arena.insert(3);
        arena.remove(b);

        let items: Vec<_> = arena.iter().collect();
        assert_eq!(items, vec![(a, &1), (c, &3)]);
    }

    #[test]
    fn test_iter_mut() {
        let mut arena = Arena::new();
        arena.insert(1);
        arena.insert(2);

        for (_, value) in arena.iter_mut() {
            *value *= 10;
        }

        let values: Vec<_> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![10, 20]);
    }
}
