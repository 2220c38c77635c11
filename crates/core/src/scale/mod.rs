//! Resampling of surfaces.
//!
//! Source coordinates are derived in 16.16 fixed point as
//! `dest_coord * src_len / dest_len`, so scaling to the same size maps every
//! pixel onto itself.

use serde::{Deserialize, Serialize};

use crate::{
    blit, compose,
    convert::{convert_depth, read_color, write_color},
    Color, Depth, Rectangle, Result, Surface, VideoError,
};

/// Resampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMethod {
    #[default]
    Nearest,
    Bilinear,
}

/// Resamples `src` to the dimension of `dest`. Both must share a depth.
///
/// Indexed surfaces always use nearest sampling since interpolating
/// palette indices has no meaning.
pub fn scale(dest: &mut Surface, src: &Surface, method: ScaleMethod) -> Result<()> {
    dest.ensure_raster()?;
    src.ensure_raster()?;
    if dest.depth() != src.depth() {
        return Err(VideoError::InvalidDepth);
    }
    if src.width() == 0 || src.height() == 0 || dest.width() == 0 || dest.height() == 0 {
        return Ok(());
    }

    let snapshot;
    let src = if src.shares_memory(dest) {
        snapshot = src.duplicate()?;
        &snapshot
    } else {
        src
    };

    match method {
        ScaleMethod::Bilinear if src.depth() != Depth::Indexed8 => scale_bilinear(dest, src),
        ScaleMethod::Bilinear => {
            tracing::debug!("bilinear scaling of an indexed surface falls back to nearest");
            scale_nearest(dest, src)
        }
        ScaleMethod::Nearest => scale_nearest(dest, src),
    }
}

/// Like [`scale`], but first converts `src` to `dest`'s depth when they
/// differ.
pub fn scale_with_depth_conversion(
    dest: &mut Surface,
    src: &Surface,
    method: ScaleMethod,
) -> Result<()> {
    if dest.depth() == src.depth() {
        return scale(dest, src, method);
    }

    dest.ensure_raster()?;
    let mut converted = Surface::allocate(src.width(), src.height(), dest.depth())?;
    if let Some(palette) = dest.palette() {
        converted.set_palette(palette.clone());
    }
    convert_depth(&mut converted, src)?;
    scale(dest, &converted, method)?;

    if dest.palette().is_none() {
        if let Some(palette) = converted.palette() {
            dest.set_palette(palette.clone());
        }
    }
    Ok(())
}

/// Returns a new owned surface holding `src` resampled to the given size
/// and depth.
pub fn scaled(
    src: &Surface,
    width: usize,
    height: usize,
    depth: Depth,
    method: ScaleMethod,
) -> Result<Surface> {
    let mut dest = Surface::allocate(width, height, depth)?;
    if depth == src.depth() {
        if let Some(palette) = src.palette() {
            dest.set_palette(palette.clone());
        }
    }
    scale_with_depth_conversion(&mut dest, src, method)?;
    Ok(dest)
}

/// Scales `src_area` of `src` to the size of `dest_area` and blits it there.
pub fn blit_scale_area(
    dest: &mut Surface,
    dest_area: &Rectangle,
    src: &Surface,
    src_area: &Rectangle,
    alpha: bool,
    method: ScaleMethod,
) -> Result<()> {
    match scaled_area(dest, dest_area, src, src_area, method)? {
        Some(scaled) => blit(dest, &scaled, dest_area.x, dest_area.y, alpha),
        None => Ok(()),
    }
}

/// Scales `src_area` of `src` to the size of `dest_area` and composes it
/// there with `compose`.
pub fn compose_scale_area(
    dest: &mut Surface,
    dest_area: &Rectangle,
    src: &Surface,
    src_area: &Rectangle,
    method: ScaleMethod,
    compose_fn: &dyn Fn(&mut Surface, &Surface) -> Result<()>,
) -> Result<()> {
    match scaled_area(dest, dest_area, src, src_area, method)? {
        Some(scaled) => compose(dest, &scaled, dest_area.x, dest_area.y, compose_fn),
        None => Ok(()),
    }
}

fn scaled_area(
    dest: &Surface,
    dest_area: &Rectangle,
    src: &Surface,
    src_area: &Rectangle,
    method: ScaleMethod,
) -> Result<Option<Surface>> {
    dest.ensure_raster()?;
    src.ensure_raster()?;

    let src_clip = src_area.clip(&src.extents());
    if src_clip.is_empty() || dest_area.is_empty() || !dest_area.intersects(&dest.extents()) {
        return Ok(None);
    }

    let region = src.region_view(&src_clip)?;
    let mut scaled = Surface::allocate(
        dest_area.width as usize,
        dest_area.height as usize,
        src.depth(),
    )?;
    if let Some(palette) = src.palette() {
        scaled.set_palette(palette.clone());
    }
    scaled.set_compose_strategy(src.compose_strategy().clone());
    scale(&mut scaled, &region, method)?;

    Ok(Some(scaled))
}

/// 16.16 fixed point step from destination to source coordinates.
fn step(src_len: usize, dest_len: usize) -> u64 {
    ((src_len as u64) << 16) / dest_len as u64
}

fn scale_nearest(dest: &mut Surface, src: &Surface) -> Result<()> {
    let bpp = src.bytes_per_pixel();
    let x_step = step(src.width(), dest.width());
    let y_step = step(src.height(), dest.height());
    let (src_pitch, dest_pitch) = (src.pitch(), dest.pitch());
    let (width, height) = (dest.width(), dest.height());

    let src_pixels = src.pixels()?;
    let mut dest_pixels = dest.pixels_mut()?;
    for y in 0..height {
        let sy = ((y as u64 * y_step) >> 16) as usize;
        let src_row = &src_pixels[sy * src_pitch..];
        let dest_row = &mut dest_pixels[y * dest_pitch..];

        for x in 0..width {
            let sx = ((x as u64 * x_step) >> 16) as usize;
            dest_row[x * bpp..(x + 1) * bpp].copy_from_slice(&src_row[sx * bpp..(sx + 1) * bpp]);
        }
    }

    Ok(())
}

fn scale_bilinear(dest: &mut Surface, src: &Surface) -> Result<()> {
    let depth = src.depth();
    let bpp = src.bytes_per_pixel();
    let x_step = step(src.width(), dest.width());
    let y_step = step(src.height(), dest.height());
    let (src_pitch, dest_pitch) = (src.pitch(), dest.pitch());
    let (src_width, src_height) = (src.width(), src.height());
    let (width, height) = (dest.width(), dest.height());

    let src_pixels = src.pixels()?;
    let sample = |x: usize, y: usize| {
        let offset = y * src_pitch + x * bpp;
        read_color(depth, &src_pixels[offset..offset + bpp], None)
    };

    let mut dest_pixels = dest.pixels_mut()?;
    for y in 0..height {
        let fy = y as u64 * y_step;
        let y0 = (fy >> 16) as usize;
        let y1 = (y0 + 1).min(src_height - 1);
        let wy = ((fy & 0xffff) >> 8) as u32;

        for x in 0..width {
            let fx = x as u64 * x_step;
            let x0 = (fx >> 16) as usize;
            let x1 = (x0 + 1).min(src_width - 1);
            let wx = ((fx & 0xffff) >> 8) as u32;

            let color = interpolate(
                [sample(x0, y0), sample(x1, y0), sample(x0, y1), sample(x1, y1)],
                wx,
                wy,
            );
            let offset = y * dest_pitch + x * bpp;
            write_color(depth, color, &mut dest_pixels[offset..offset + bpp], None);
        }
    }

    Ok(())
}

/// Weights are in 1/256 steps; the result is truncated.
fn interpolate([c00, c10, c01, c11]: [Color; 4], wx: u32, wy: u32) -> Color {
    let channel = |a: u8, b: u8, c: u8, d: u8| {
        let top = a as u32 * (256 - wx) + b as u32 * wx;
        let bottom = c as u32 * (256 - wx) + d as u32 * wx;
        ((top * (256 - wy) + bottom * wy) >> 16) as u8
    };

    Color::rgba(
        channel(c00.r, c10.r, c01.r, c11.r),
        channel(c00.g, c10.g, c01.g, c11.g),
        channel(c00.b, c10.b, c01.b, c11.b),
        channel(c00.a, c10.a, c01.a, c11.a),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fill_color, CompositeStrategy, Palette, PixelBuffer};

    fn gradient(width: usize, height: usize, depth: Depth) -> Surface {
        let mut surface = Surface::allocate(width, height, depth).unwrap();
        surface
            .pixels_mut()
            .unwrap()
            .iter_mut()
            .enumerate()
            .for_each(|(index, byte)| *byte = (index * 7 + 3) as u8);
        surface
    }

    #[test]
    fn same_size_is_pixel_identical() {
        for depth in [Depth::Indexed8, Depth::Rgb565, Depth::Rgb24, Depth::Rgba32] {
            let src = gradient(5, 3, depth);
            for method in [ScaleMethod::Nearest, ScaleMethod::Bilinear] {
                let mut dest = Surface::allocate(5, 3, depth).unwrap();
                scale(&mut dest, &src, method).unwrap();
                assert_eq!(
                    &*dest.pixels().unwrap(),
                    &*src.pixels().unwrap(),
                    "{depth:?} {method:?}"
                );
            }
        }
    }

    #[test]
    fn nearest_duplicates_and_drops_pixels() {
        let src = Surface::wrap(
            PixelBuffer::from_vec(vec![1, 2, 3, 4]),
            2,
            2,
            Depth::Indexed8,
            true,
        )
        .unwrap();

        let mut up = Surface::allocate(4, 2, Depth::Indexed8).unwrap();
        scale(&mut up, &src, ScaleMethod::Nearest).unwrap();
        assert_eq!(&*up.pixels().unwrap(), &[1, 1, 2, 2, 3, 3, 4, 4]);

        let mut down = Surface::allocate(1, 1, Depth::Indexed8).unwrap();
        scale(&mut down, &src, ScaleMethod::Bilinear).unwrap();
        assert_eq!(&*down.pixels().unwrap(), &[1]);
    }

    #[test]
    fn bilinear_blends_and_clamps_edges() {
        let src = Surface::wrap(
            PixelBuffer::from_vec(vec![0, 0, 0, 255, 255, 255]),
            2,
            1,
            Depth::Rgb24,
            true,
        )
        .unwrap();
        let mut dest = Surface::allocate(4, 1, Depth::Rgb24).unwrap();
        scale(&mut dest, &src, ScaleMethod::Bilinear).unwrap();

        let reds: Vec<u8> = dest.pixels().unwrap().chunks_exact(3).map(|p| p[0]).collect();
        assert_eq!(reds, vec![0, 127, 255, 255]);
    }

    #[test]
    fn requires_matching_depths() {
        let src = gradient(2, 2, Depth::Rgb24);
        let mut dest = Surface::allocate(4, 4, Depth::Rgba32).unwrap();
        assert!(matches!(
            scale(&mut dest, &src, ScaleMethod::Nearest),
            Err(VideoError::InvalidDepth)
        ));

        scale_with_depth_conversion(&mut dest, &src, ScaleMethod::Nearest).unwrap();
        let first = dest.pixel(1, 1).unwrap();
        assert_eq!(first, Color::rgb(3, 10, 17));
    }

    #[test]
    fn scaled_copy_expands_indexed_sources() {
        let mut src = Surface::allocate(2, 1, Depth::Indexed8).unwrap();
        src.set_palette(Palette::from_colors(vec![Color::BLACK, Color::WHITE]).unwrap());
        src.pixels_mut().unwrap()[1] = 1;

        let copy = scaled(&src, 4, 2, Depth::Rgba32, ScaleMethod::Nearest).unwrap();
        assert_eq!(copy.pixel(1, 1).unwrap(), Color::BLACK);
        assert_eq!(copy.pixel(2, 0).unwrap(), Color::WHITE);

        let same = scaled(&src, 2, 2, Depth::Indexed8, ScaleMethod::Nearest).unwrap();
        assert_eq!(same.pixel(1, 1).unwrap(), Color::WHITE);
    }

    #[test]
    fn blit_scale_area_places_scaled_region() {
        let mut src = Surface::allocate(2, 2, Depth::Rgb24).unwrap();
        fill_color(&mut src, Color::WHITE).unwrap();
        src.set_compose_strategy(CompositeStrategy::SurfaceAlpha(128));
        let mut dest = Surface::allocate(6, 6, Depth::Rgb24).unwrap();

        blit_scale_area(
            &mut dest,
            &Rectangle::new(1, 1, 4, 4),
            &src,
            &Rectangle::with_size(2, 2),
            true,
            ScaleMethod::Bilinear,
        )
        .unwrap();

        assert_eq!(dest.pixel(0, 0).unwrap(), Color::BLACK);
        assert_eq!(dest.pixel(1, 1).unwrap(), Color::rgb(127, 127, 127));
        assert_eq!(dest.pixel(4, 4).unwrap(), Color::rgb(127, 127, 127));
        assert_eq!(dest.pixel(5, 5).unwrap(), Color::BLACK);
    }

    #[test]
    fn compose_scale_area_hands_over_the_scaled_surface() {
        let src = gradient(2, 2, Depth::Rgb565);
        let mut dest = Surface::allocate(8, 8, Depth::Rgba32).unwrap();

        compose_scale_area(
            &mut dest,
            &Rectangle::new(4, 4, 6, 6),
            &src,
            &Rectangle::with_size(2, 2),
            ScaleMethod::Nearest,
            &|dest_view: &mut Surface, src_view: &Surface| {
                assert_eq!(src_view.depth(), Depth::Rgb565);
                assert_eq!((dest_view.width(), dest_view.height()), (4, 4));
                fill_color(dest_view, Color::WHITE)
            },
        )
        .unwrap();

        assert_eq!(dest.pixel(7, 7).unwrap(), Color::WHITE);
        assert_eq!(dest.pixel(3, 3).unwrap(), Color::rgba(0, 0, 0, 0));
    }
}
