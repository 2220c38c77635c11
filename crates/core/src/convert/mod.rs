//! Depth to depth pixel transcoding.
//!
//! Channel widths are expanded by shifting and narrowed by truncation, so a
//! conversion is a deterministic function of the source bytes.

use crate::{Color, Depth, Palette, Result, Surface, VideoError};

/// Decodes one pixel. Indexed pixels resolve through `palette`; without one
/// the index is read as a gray level.
pub(crate) fn read_color(depth: Depth, bytes: &[u8], palette: Option<&Palette>) -> Color {
    match depth {
        Depth::Indexed8 => match palette {
            Some(palette) => palette.resolve(bytes[0]),
            None => Color::rgb(bytes[0], bytes[0], bytes[0]),
        },
        Depth::Rgb565 => {
            let value = u16::from_le_bytes([bytes[0], bytes[1]]);
            Color::rgb(
                ((value >> 11) as u8 & 0x1f) << 3,
                ((value >> 5) as u8 & 0x3f) << 2,
                (value as u8 & 0x1f) << 3,
            )
        }
        Depth::Rgb24 => Color::rgb(bytes[0], bytes[1], bytes[2]),
        Depth::Rgba32 => Color::rgba(bytes[0], bytes[1], bytes[2], bytes[3]),
        Depth::None | Depth::GpuManaged => Color::BLACK,
    }
}

/// Encodes one pixel. Indexed targets pick the nearest palette entry, or the
/// channel average when there is no palette.
pub(crate) fn write_color(depth: Depth, color: Color, bytes: &mut [u8], palette: Option<&Palette>) {
    match depth {
        Depth::Indexed8 => {
            bytes[0] = match palette {
                Some(palette) => palette.find_color(color).unwrap_or(0),
                None => ((color.r as u16 + color.g as u16 + color.b as u16) / 3) as u8,
            };
        }
        Depth::Rgb565 => {
            let value = ((color.r as u16 >> 3) << 11)
                | ((color.g as u16 >> 2) << 5)
                | (color.b as u16 >> 3);
            bytes[..2].copy_from_slice(&value.to_le_bytes());
        }
        Depth::Rgb24 => bytes[..3].copy_from_slice(&[color.r, color.g, color.b]),
        Depth::Rgba32 => bytes[..4].copy_from_slice(&[color.r, color.g, color.b, color.a]),
        Depth::None | Depth::GpuManaged => {}
    }
}

/// Transcodes `src` into `dest`'s depth.
///
/// Both surfaces must share a dimension; `dest` may use any pitch. Indexed
/// sources resolve through their palette. Indexed destinations map to the
/// nearest entry of their palette, or receive a grayscale palette when they
/// have none. Opaque targets drop alpha; `Rgba32` targets from alpha-less
/// sources are fully opaque.
pub fn convert_depth(dest: &mut Surface, src: &Surface) -> Result<()> {
    src.ensure_raster()?;
    dest.ensure_raster()?;
    if dest.width() != src.width() || dest.height() != src.height() {
        return Err(VideoError::AttributeMismatch("dimensions differ"));
    }
    if src.depth() == Depth::Indexed8 && src.palette().is_none() {
        return Err(VideoError::PaletteMissing);
    }

    let snapshot;
    let src = if src.shares_memory(dest) {
        snapshot = src.duplicate()?;
        &snapshot
    } else {
        src
    };

    if dest.depth() == src.depth() {
        if dest.depth() == Depth::Indexed8 && dest.palette().is_none() {
            if let Some(palette) = src.palette() {
                dest.set_palette(palette.clone());
            }
        }
        return copy_rows(dest, src);
    }

    if dest.depth() == Depth::Indexed8 && dest.palette().is_none() {
        dest.set_palette(Palette::grayscale());
    }

    tracing::trace!(from = ?src.depth(), to = ?dest.depth(), "converting surface depth");

    let src_depth = src.depth();
    let dest_depth = dest.depth();
    let src_bpp = src.bytes_per_pixel();
    let dest_bpp = dest.bytes_per_pixel();
    let (src_pitch, dest_pitch) = (src.pitch(), dest.pitch());
    let (width, height) = (src.width(), src.height());
    let src_palette = src.palette();
    let dest_palette = dest.palette().cloned();

    let src_pixels = src.pixels()?;
    let mut dest_pixels = dest.pixels_mut()?;
    for y in 0..height {
        let src_row = &src_pixels[y * src_pitch..];
        let dest_row = &mut dest_pixels[y * dest_pitch..];
        for x in 0..width {
            let color = read_color(src_depth, &src_row[x * src_bpp..], src_palette);
            write_color(
                dest_depth,
                color,
                &mut dest_row[x * dest_bpp..],
                dest_palette.as_ref(),
            );
        }
    }

    Ok(())
}

/// Reverses the byte order of every pixel, e.g. RGB to BGR. `dest` must
/// match `src` in depth, dimension and pitch.
pub fn flip_pixel_bytes(dest: &mut Surface, src: &Surface) -> Result<()> {
    src.ensure_raster()?;
    dest.ensure_raster()?;
    if !dest.compare_attributes(src, false) {
        return Err(VideoError::AttributeMismatch("flip requires identical surfaces"));
    }
    if src.depth() == Depth::Indexed8 {
        return Err(VideoError::InvalidDepth);
    }

    let snapshot;
    let src = if src.shares_memory(dest) {
        snapshot = src.duplicate()?;
        &snapshot
    } else {
        src
    };

    let bpp = src.bytes_per_pixel();
    let (src_pitch, dest_pitch) = (src.pitch(), dest.pitch());
    let row_len = src.row_len();
    let height = src.height();

    let src_pixels = src.pixels()?;
    let mut dest_pixels = dest.pixels_mut()?;
    for y in 0..height {
        let src_row = &src_pixels[y * src_pitch..y * src_pitch + row_len];
        let dest_row = &mut dest_pixels[y * dest_pitch..y * dest_pitch + row_len];
        for (from, to) in src_row.chunks_exact(bpp).zip(dest_row.chunks_exact_mut(bpp)) {
            for (index, byte) in from.iter().rev().enumerate() {
                to[index] = *byte;
            }
        }
    }

    Ok(())
}

/// Row-wise copy between surfaces of equal depth and dimension.
pub(crate) fn copy_rows(dest: &mut Surface, src: &Surface) -> Result<()> {
    let row_len = src.row_len();
    let (src_pitch, dest_pitch) = (src.pitch(), dest.pitch());
    let height = src.height();

    let src_pixels = src.pixels()?;
    let mut dest_pixels = dest.pixels_mut()?;
    for y in 0..height {
        dest_pixels[y * dest_pitch..y * dest_pitch + row_len]
            .copy_from_slice(&src_pixels[y * src_pitch..y * src_pitch + row_len]);
    }

    Ok(())
}
