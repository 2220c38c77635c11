//! Pixel format registry.
//!
//! Depths are ordered from low to high. The adjacency queries on
//! [`DepthSet`] walk that order, so new variants must keep it.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{Result, VideoError};

/// Pixel storage format of a surface.
///
/// Byte layouts in memory:
/// - `Indexed8`: one palette index per pixel.
/// - `Rgb565`: little-endian `u16`, red in the top five bits.
/// - `Rgb24`: `R, G, B`.
/// - `Rgba32`: `R, G, B, A`.
/// - `GpuManaged`: no CPU visible layout, the surface is metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Depth {
    #[default]
    None,
    Indexed8,
    Rgb565,
    Rgb24,
    Rgba32,
    GpuManaged,
}

bitflags! {
    /// Set of depths, typically the formats a renderer or backend accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DepthSet: u32 {
        const INDEXED8 = 1;
        const RGB565 = 2;
        const RGB24 = 4;
        const RGBA32 = 8;
        const GPU_MANAGED = 16;
        const ALL_RASTER = Self::INDEXED8.bits()
            | Self::RGB565.bits()
            | Self::RGB24.bits()
            | Self::RGBA32.bits();
        const ALL = Self::ALL_RASTER.bits() | Self::GPU_MANAGED.bits();
    }
}

/// Every depth with a flag, lowest first.
const ORDERED: [Depth; 5] = [
    Depth::Indexed8,
    Depth::Rgb565,
    Depth::Rgb24,
    Depth::Rgba32,
    Depth::GpuManaged,
];

impl Depth {
    /// Legacy numeric value of the depth flag (`None` is 0).
    pub const fn raw(self) -> i32 {
        match self {
            Depth::None => 0,
            Depth::Indexed8 => 1,
            Depth::Rgb565 => 2,
            Depth::Rgb24 => 4,
            Depth::Rgba32 => 8,
            Depth::GpuManaged => 16,
        }
    }

    pub fn from_raw(raw: i32) -> Option<Depth> {
        match raw {
            0 => Some(Depth::None),
            1 => Some(Depth::Indexed8),
            2 => Some(Depth::Rgb565),
            4 => Some(Depth::Rgb24),
            8 => Some(Depth::Rgba32),
            16 => Some(Depth::GpuManaged),
            _ => None,
        }
    }

    /// True only for the six defined flag values.
    pub fn is_sane(raw: i32) -> bool {
        Self::from_raw(raw).is_some()
    }

    /// Flag of this depth; empty for `None`.
    pub fn flag(self) -> DepthSet {
        DepthSet::from_bits_truncate(self.raw() as u32)
    }

    /// Depths with a CPU visible pixel layout.
    pub fn is_raster(self) -> bool {
        DepthSet::ALL_RASTER.supports(self)
    }

    pub fn has_alpha(self) -> bool {
        self == Depth::Rgba32
    }

    pub fn bits_per_pixel(self) -> Result<usize> {
        match self {
            Depth::Indexed8 => Ok(8),
            Depth::Rgb565 => Ok(16),
            Depth::Rgb24 => Ok(24),
            Depth::Rgba32 => Ok(32),
            Depth::None | Depth::GpuManaged => Err(VideoError::InvalidDepth),
        }
    }

    pub fn bytes_per_pixel(self) -> Result<usize> {
        self.bits_per_pixel().map(|bits| bits / 8)
    }

    pub fn from_bits_per_pixel(bits: usize) -> Result<Depth> {
        match bits {
            8 => Ok(Depth::Indexed8),
            16 => Ok(Depth::Rgb565),
            24 => Ok(Depth::Rgb24),
            32 => Ok(Depth::Rgba32),
            _ => Err(VideoError::InvalidDepth),
        }
    }
}

impl DepthSet {
    pub fn supports(self, depth: Depth) -> bool {
        depth != Depth::None && self.contains(depth.flag())
    }

    /// Next supported depth above `depth`. Starting from `Depth::None`
    /// considers the lowest depth itself.
    pub fn next(self, depth: Depth) -> Option<Depth> {
        ORDERED
            .iter()
            .copied()
            .filter(|candidate| *candidate > depth)
            .find(|candidate| self.supports(*candidate))
    }

    /// Previous supported depth below `depth`.
    pub fn prev(self, depth: Depth) -> Option<Depth> {
        ORDERED
            .iter()
            .rev()
            .copied()
            .filter(|candidate| *candidate < depth)
            .find(|candidate| self.supports(*candidate))
    }

    pub fn lowest(self) -> Option<Depth> {
        self.next(Depth::None)
    }

    pub fn highest(self) -> Option<Depth> {
        if self.supports(Depth::GpuManaged) {
            Some(Depth::GpuManaged)
        } else {
            self.prev(Depth::GpuManaged)
        }
    }

    pub fn highest_excluding_gpu(self) -> Option<Depth> {
        self.prev(Depth::GpuManaged)
    }

    /// Supported depths, lowest first.
    pub fn depths(self) -> impl Iterator<Item = Depth> {
        ORDERED
            .into_iter()
            .filter(move |depth| self.supports(*depth))
    }
}
