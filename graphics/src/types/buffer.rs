//! Buffer usage flags and descriptors.

use bitflags::bitflags;

bitflags! {
    /// How a buffer may be used over its lifetime.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Bound as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Bound as an index buffer.
        const INDEX = 1 << 1;
        /// Bound as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Read or written from a shader as storage.
        const STORAGE = 1 << 3;
        /// Source of a transfer operation.
        const TRANSFER_SRC = 1 << 4;
        /// Destination of a transfer operation.
        const TRANSFER_DST = 1 << 5;
    }
}

/// Full description of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    /// Size in bytes.
    pub size: u64,
    /// Element stride in bytes, 0 for unstructured buffers.
    pub stride: u32,
    /// Allowed usages.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Check internal consistency.
    pub fn is_valid(&self) -> bool {
        if self.size == 0 || self.usage.is_empty() {
            return false;
        }
        if self.stride != 0 && self.size % self.stride as u64 != 0 {
            return false;
        }
        true
    }
}
