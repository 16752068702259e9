//! Texture formats, usage flags, and descriptors.

use bitflags::bitflags;

use super::Extent3d;

/// Texel format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit RGBA, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA, unsigned normalized, sRGB encoded.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, unsigned normalized. Common swapchain format.
    Bgra8Unorm,
    /// 16-bit float RGBA. HDR render targets.
    Rgba16Float,
    /// 32-bit float RGBA.
    Rgba32Float,
    /// 16-bit float RG.
    Rg16Float,
    /// Single-channel 8-bit, unsigned normalized.
    R8Unorm,
    /// Single-channel 32-bit float.
    R32Float,
    /// 32-bit float depth.
    Depth32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
}

impl TextureFormat {
    /// Check whether this is a depth or depth/stencil format.
    pub fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    /// Check whether this format carries a stencil aspect.
    pub fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::Depth24PlusStencil8)
    }

    /// Bytes per texel. Depth24PlusStencil8 is counted as packed 32-bit.
    pub fn texel_size(self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::R32Float
            | TextureFormat::Rg16Float
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::R8Unorm => 1,
        }
    }
}

bitflags! {
    /// How a texture may be used over its lifetime.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Sampled in a shader.
        const SAMPLED = 1 << 0;
        /// Bound as a color attachment.
        const COLOR_ATTACHMENT = 1 << 1;
        /// Bound as a depth/stencil attachment.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 2;
        /// Written from a shader as storage.
        const STORAGE = 1 << 3;
        /// Source of a transfer operation.
        const TRANSFER_SRC = 1 << 4;
        /// Destination of a transfer operation.
        const TRANSFER_DST = 1 << 5;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        TextureUsage::SAMPLED
    }
}

/// Full description of a texture.
///
/// Two registry entries with equal descriptors are interchangeable; the
/// registry compares descriptors to decide whether a named texture can be
/// reused across builds or must be recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Size of the base mip level.
    pub size: Extent3d,
    /// Number of mip levels. At least 1.
    pub mip_level_count: u32,
    /// MSAA sample count. 1 for non-multisampled.
    pub sample_count: u32,
    /// Texel format.
    pub format: TextureFormat,
    /// Allowed usages.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Descriptor for a single-mip 2D texture.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            size: Extent3d::new_2d(width, height),
            mip_level_count: 1,
            sample_count: 1,
            format,
            usage,
        }
    }

    /// Check internal consistency.
    pub fn is_valid(&self) -> bool {
        if !self.size.is_valid() {
            return false;
        }
        if self.mip_level_count == 0 || self.sample_count == 0 {
            return false;
        }
        if self.usage.is_empty() {
            return false;
        }
        // Attachment usage must match the format's aspect.
        if self.usage.contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT)
            && !self.format.is_depth_stencil()
        {
            return false;
        }
        if self.usage.contains(TextureUsage::COLOR_ATTACHMENT) && self.format.is_depth_stencil() {
            return false;
        }
        true
    }

    /// Check whether an existing texture with this descriptor satisfies a
    /// request for `other`.
    pub fn is_compatible_with(&self, other: &TextureDescriptor) -> bool {
        self == other
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            size: Extent3d::default(),
            mip_level_count: 1,
            sample_count: 1,
            format: TextureFormat::default(),
            usage: TextureUsage::default(),
        }
    }
}
