//! Lossless geometric transforms: quarter turn rotation and mirroring.

use crate::{Depth, Result, Surface, VideoError};

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Accepts any multiple of 90, negative angles turning anticlockwise.
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(VideoError::msg(format!(
                "rotation of {degrees} degrees is not a quarter turn"
            )));
        }

        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::None,
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            _ => Rotation::Deg270,
        })
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// The rotation that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Rotation::Deg90 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg90,
            other => other,
        }
    }

    fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorAxis {
    #[default]
    None,
    /// Reverses the pixels of every row.
    X,
    /// Reverses the order of the rows.
    Y,
}

/// Rotates `src` into `dest`.
///
/// `dest` must have `src`'s depth, and `src`'s dimension with width and
/// height swapped for quarter turns.
pub fn rotate(dest: &mut Surface, src: &Surface, rotation: Rotation) -> Result<()> {
    src.ensure_raster()?;
    dest.ensure_raster()?;
    if dest.depth() != src.depth() {
        return Err(VideoError::InvalidDepth);
    }

    let expected = if rotation.swaps_axes() {
        (src.height(), src.width())
    } else {
        (src.width(), src.height())
    };
    if (dest.width(), dest.height()) != expected {
        return Err(VideoError::AttributeMismatch(
            "rotation target has the wrong dimension",
        ));
    }

    let (width, height) = (src.width(), src.height());
    match rotation {
        Rotation::None => remap(dest, src, |x, y| (x, y)),
        Rotation::Deg90 => remap(dest, src, |x, y| (y, height - 1 - x)),
        Rotation::Deg180 => remap(dest, src, |x, y| (width - 1 - x, height - 1 - y)),
        Rotation::Deg270 => remap(dest, src, |x, y| (width - 1 - y, x)),
    }
}

/// Mirrors `src` into `dest`, which must match `src` exactly.
pub fn mirror(dest: &mut Surface, src: &Surface, axis: MirrorAxis) -> Result<()> {
    src.ensure_raster()?;
    dest.ensure_raster()?;
    if !dest.compare_attributes(src, false) {
        return Err(VideoError::AttributeMismatch("mirror requires identical surfaces"));
    }

    let (width, height) = (src.width(), src.height());
    match axis {
        MirrorAxis::None => remap(dest, src, |x, y| (x, y)),
        MirrorAxis::X => remap(dest, src, |x, y| (width - 1 - x, y)),
        MirrorAxis::Y => remap(dest, src, |x, y| (x, height - 1 - y)),
    }
}

/// Fills every destination pixel from the source pixel `source_of` names.
fn remap(
    dest: &mut Surface,
    src: &Surface,
    source_of: impl Fn(usize, usize) -> (usize, usize),
) -> Result<()> {
    if dest.width() == 0 || dest.height() == 0 {
        return Ok(());
    }

    let snapshot;
    let src = if src.shares_memory(dest) {
        snapshot = src.duplicate()?;
        &snapshot
    } else {
        src
    };

    if dest.depth() == Depth::Indexed8 && dest.palette().is_none() {
        if let Some(palette) = src.palette() {
            dest.set_palette(palette.clone());
        }
    }

    let bpp = src.bytes_per_pixel();
    let (src_pitch, dest_pitch) = (src.pitch(), dest.pitch());
    let (width, height) = (dest.width(), dest.height());

    let src_pixels = src.pixels()?;
    let mut dest_pixels = dest.pixels_mut()?;
    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = source_of(x, y);
            let from = sy * src_pitch + sx * bpp;
            let to = y * dest_pitch + x * bpp;
            dest_pixels[to..to + bpp].copy_from_slice(&src_pixels[from..from + bpp]);
        }
    }

    Ok(())
}
