//! Shared geometric and clear-value types.

/// Size of a texture in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3d {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth in texels (1 for 2D textures).
    pub depth: u32,
}

impl Extent3d {
    /// Create a 2D extent (depth = 1).
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// Check that no dimension is zero.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.depth > 0
    }
}

impl Default for Extent3d {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
        }
    }
}

/// Clear value for a render target attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// RGBA color clear.
    Color([f32; 4]),
    /// Depth/stencil clear.
    DepthStencil {
        /// Depth clear value, usually 1.0 (far plane).
        depth: f32,
        /// Stencil clear value.
        stencil: u32,
    },
}

impl ClearValue {
    /// Opaque black color clear.
    pub const BLACK: ClearValue = ClearValue::Color([0.0, 0.0, 0.0, 1.0]);

    /// Standard depth clear (far plane, zero stencil).
    pub const DEPTH_ONE: ClearValue = ClearValue::DepthStencil {
        depth: 1.0,
        stencil: 0,
    };
}

/// Viewport rectangle with depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels. Must be positive.
    pub width: f32,
    /// Height in pixels. Must be positive.
    pub height: f32,
    /// Minimum depth (usually 0.0).
    pub min_depth: f32,
    /// Maximum depth (usually 1.0).
    pub max_depth: f32,
}

impl Viewport {
    /// Create a viewport covering a full render target of the given size.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Check internal consistency (positive size, ordered depth range).
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.min_depth <= self.max_depth
    }
}

/// Scissor rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScissorRect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ScissorRect {
    /// Create a scissor rect covering a full render target of the given size.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}
