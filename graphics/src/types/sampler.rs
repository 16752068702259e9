//! Sampler descriptors.

/// Texel filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest-neighbor.
    Nearest,
    /// Linear interpolation.
    #[default]
    Linear,
}

/// Behavior for coordinates outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp to the edge texel.
    #[default]
    ClampToEdge,
    /// Repeat the texture.
    Repeat,
    /// Repeat, mirroring every other tile.
    MirrorRepeat,
}

/// Full description of a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerDescriptor {
    /// Filtering when the texture is minified.
    pub min_filter: FilterMode,
    /// Filtering when the texture is magnified.
    pub mag_filter: FilterMode,
    /// Addressing outside the unit square.
    pub address_mode: AddressMode,
}

impl SamplerDescriptor {
    /// Linear filtering, clamped addressing.
    pub fn linear_clamp() -> Self {
        Self::default()
    }

    /// Nearest filtering, clamped addressing.
    pub fn nearest_clamp() -> Self {
        Self {
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            address_mode: AddressMode::ClampToEdge,
        }
    }
}
