//! Blitting and composition of one surface onto another.
//!
//! The source surface's [`CompositeStrategy`] decides how its pixels combine
//! with the destination. Rectangles are clipped against both surfaces
//! before any pixel is touched; a region that clips away entirely is a
//! successful no-op.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    convert::{read_color, write_color},
    Color, Depth, Rectangle, Result, Surface, VideoError,
};

/// Caller supplied composition. It receives views of the clipped
/// destination and source areas and owns the per-pixel rule.
pub type ComposeFn = Arc<dyn Fn(&mut Surface, &Surface) -> Result<()> + Send + Sync>;

/// Custom compose functions keyed by `(destination, source)` depth.
#[derive(Default, Clone)]
pub struct ComposeRegistry {
    functions: HashMap<(Depth, Depth), ComposeFn>,
}

impl ComposeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `compose` for blits of `src` depth into `dest` depth,
    /// replacing any earlier registration for the pair.
    pub fn register<F>(&mut self, dest: Depth, src: Depth, compose: F)
    where
        F: Fn(&mut Surface, &Surface) -> Result<()> + Send + Sync + 'static,
    {
        self.functions.insert((dest, src), Arc::new(compose));
    }

    pub fn lookup(&self, dest: Depth, src: Depth) -> Option<&ComposeFn> {
        self.functions.get(&(dest, src))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for ComposeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

/// Alpha combination rule of a surface acting as a blit source.
#[derive(Debug, Clone, Default)]
pub enum CompositeStrategy {
    /// Plain copy.
    #[default]
    None,
    /// Blend with the source pixel's own alpha channel (`Rgba32`), plain
    /// copy for depths without alpha.
    SourceAlpha,
    /// Source pixels equal to the key are skipped.
    ColorKey(Color),
    /// Uniform density applied to every written pixel.
    SurfaceAlpha(u8),
    /// Colorkey skip, then surface alpha for the remaining pixels.
    SurfaceAndColorKey { key: Color, density: u8 },
    /// Function looked up by the destination and source depth.
    Custom(Arc<ComposeRegistry>),
}

/// The rule a blit resolved to.
#[derive(Clone)]
pub enum ComposeRule {
    Copy,
    SourceAlpha,
    ColorKey(Color),
    SurfaceAlpha(u8),
    SurfaceAndColorKey { key: Color, density: u8 },
    Custom(ComposeFn),
}

impl fmt::Debug for ComposeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeRule::Copy => f.write_str("Copy"),
            ComposeRule::SourceAlpha => f.write_str("SourceAlpha"),
            ComposeRule::ColorKey(key) => f.debug_tuple("ColorKey").field(key).finish(),
            ComposeRule::SurfaceAlpha(density) => {
                f.debug_tuple("SurfaceAlpha").field(density).finish()
            }
            ComposeRule::SurfaceAndColorKey { key, density } => f
                .debug_struct("SurfaceAndColorKey")
                .field("key", key)
                .field("density", density)
                .finish(),
            ComposeRule::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Resolves the rule a blit of `src` onto `dest` would use, validating the
/// depth pairing up front.
pub fn resolve_compose(dest: &Surface, src: &Surface, alpha: bool) -> Result<ComposeRule> {
    let rule = if alpha {
        match src.compose_strategy() {
            CompositeStrategy::None => ComposeRule::Copy,
            CompositeStrategy::SourceAlpha => ComposeRule::SourceAlpha,
            CompositeStrategy::ColorKey(key) => ComposeRule::ColorKey(*key),
            CompositeStrategy::SurfaceAlpha(density) => ComposeRule::SurfaceAlpha(*density),
            CompositeStrategy::SurfaceAndColorKey { key, density } => {
                ComposeRule::SurfaceAndColorKey {
                    key: *key,
                    density: *density,
                }
            }
            CompositeStrategy::Custom(registry) => {
                let compose = registry.lookup(dest.depth(), src.depth()).ok_or(
                    VideoError::NoComposeFunction {
                        dest: dest.depth(),
                        src: src.depth(),
                    },
                )?;
                return Ok(ComposeRule::Custom(compose.clone()));
            }
        }
    } else {
        ComposeRule::Copy
    };

    if dest.depth() != src.depth() {
        return Err(VideoError::InvalidDepth);
    }

    match rule {
        ComposeRule::SurfaceAlpha(_) | ComposeRule::SurfaceAndColorKey { .. }
            if dest.depth() == Depth::Indexed8 =>
        {
            Err(VideoError::InvalidDepth)
        }
        ComposeRule::ColorKey(_) | ComposeRule::SurfaceAndColorKey { .. }
            if src.depth() == Depth::Indexed8 && src.palette().is_none() =>
        {
            Err(VideoError::PaletteMissing)
        }
        rule => Ok(rule),
    }
}

/// Blits the whole of `src` with its top-left corner at `(x, y)`.
pub fn blit(dest: &mut Surface, src: &Surface, x: i32, y: i32, alpha: bool) -> Result<()> {
    let area = src.extents();
    blit_area(dest, &area.translate(x, y), src, &area, alpha)
}

/// Composes the whole of `src` at `(x, y)` with an explicit function.
pub fn compose(
    dest: &mut Surface,
    src: &Surface,
    x: i32,
    y: i32,
    compose: &dyn Fn(&mut Surface, &Surface) -> Result<()>,
) -> Result<()> {
    let area = src.extents();
    compose_area(dest, &area.translate(x, y), src, &area, compose)
}

/// Blits `src_area` of `src` into `dest_area` of `dest`.
///
/// With `alpha` unset, or a source strategy of `None`, pixels are copied
/// verbatim; otherwise the source strategy selects the rule. Built-in rules
/// require equal depths.
pub fn blit_area(
    dest: &mut Surface,
    dest_area: &Rectangle,
    src: &Surface,
    src_area: &Rectangle,
    alpha: bool,
) -> Result<()> {
    dest.ensure_raster()?;
    src.ensure_raster()?;

    let rule = resolve_compose(dest, src, alpha)?;
    if let ComposeRule::Custom(compose) = &rule {
        return compose_area(dest, dest_area, src, src_area, &**compose);
    }

    let Some((dest_clip, src_clip)) = clip_regions(dest, dest_area, src, src_area) else {
        tracing::trace!(?dest_area, ?src_area, "blit clipped away");
        return Ok(());
    };

    let key = match &rule {
        ComposeRule::ColorKey(key) | ComposeRule::SurfaceAndColorKey { key, .. } => {
            Some(encode_key(src, *key))
        }
        _ => None,
    };

    let snapshot;
    let src = if src.shares_memory(dest) {
        snapshot = src.duplicate()?;
        &snapshot
    } else {
        src
    };

    let mut dest_view = dest.region_view(&dest_clip)?;
    let src_view = src.region_view(&src_clip)?;
    apply_rule(&rule, &mut dest_view, &src_view, key.as_deref())
}

/// Composes `src_area` of `src` into `dest_area` of `dest` with `compose`.
/// Depths may differ; the function is handed views of the clipped areas.
pub fn compose_area(
    dest: &mut Surface,
    dest_area: &Rectangle,
    src: &Surface,
    src_area: &Rectangle,
    compose: &dyn Fn(&mut Surface, &Surface) -> Result<()>,
) -> Result<()> {
    dest.ensure_raster()?;
    src.ensure_raster()?;

    let Some((dest_clip, src_clip)) = clip_regions(dest, dest_area, src, src_area) else {
        tracing::trace!(?dest_area, ?src_area, "compose clipped away");
        return Ok(());
    };

    let snapshot;
    let src = if src.shares_memory(dest) {
        snapshot = src.duplicate()?;
        &snapshot
    } else {
        src
    };

    let mut dest_view = dest.region_view(&dest_clip)?;
    let src_view = src.region_view(&src_clip)?;

    tracing::trace!(dest = ?dest.depth(), src = ?src.depth(), "dispatching custom compose");
    compose(&mut dest_view, &src_view)
}

/// Clips both rectangles to their surfaces and to each other, returning
/// equally sized destination and source areas.
pub(crate) fn clip_regions(
    dest: &Surface,
    dest_area: &Rectangle,
    src: &Surface,
    src_area: &Rectangle,
) -> Option<(Rectangle, Rectangle)> {
    let src_clip = src_area.clip(&src.extents());
    if src_clip.is_empty() {
        return None;
    }

    // Rectangles far outside either surface must clip away, not overflow.
    let shift_x = src_clip.x.saturating_sub(src_area.x);
    let shift_y = src_clip.y.saturating_sub(src_area.y);
    let aligned = Rectangle::new(
        dest_area.x.saturating_add(shift_x),
        dest_area.y.saturating_add(shift_y),
        dest_area.width.saturating_sub(shift_x).min(src_clip.width),
        dest_area.height.saturating_sub(shift_y).min(src_clip.height),
    );

    let dest_clip = aligned.clip(&dest.extents());
    if dest_clip.is_empty() {
        return None;
    }

    let src_clip = Rectangle::new(
        src_clip.x.saturating_add(dest_clip.x.saturating_sub(aligned.x)),
        src_clip.y.saturating_add(dest_clip.y.saturating_sub(aligned.y)),
        dest_clip.width,
        dest_clip.height,
    );
    Some((dest_clip, src_clip))
}

/// Key color in the source's byte layout. `Rgba32` keys ignore alpha.
fn encode_key(src: &Surface, key: Color) -> Vec<u8> {
    let mut bytes = vec![0; src.bytes_per_pixel()];
    write_color(src.depth(), key, &mut bytes, src.palette());
    if src.depth() == Depth::Rgba32 {
        bytes.truncate(3);
    }
    bytes
}

/// `dest + (src - dest) * alpha / 256`, floored.
pub(crate) fn blend_channel(dest: u8, src: u8, alpha: u8) -> u8 {
    let dest = dest as i32;
    (dest + (((src as i32 - dest) * alpha as i32) >> 8)) as u8
}

/// Blends the color channels of one pixel, keeping destination alpha.
fn blend_pixel(depth: Depth, dest: &mut [u8], src: &[u8], alpha: u8) {
    match depth {
        Depth::Rgb24 | Depth::Rgba32 => {
            for channel in 0..3 {
                dest[channel] = blend_channel(dest[channel], src[channel], alpha);
            }
        }
        Depth::Rgb565 => {
            let under = read_color(depth, dest, None);
            let over = read_color(depth, src, None);
            let mixed = Color::rgb(
                blend_channel(under.r, over.r, alpha),
                blend_channel(under.g, over.g, alpha),
                blend_channel(under.b, over.b, alpha),
            );
            write_color(depth, mixed, dest, None);
        }
        Depth::Indexed8 | Depth::None | Depth::GpuManaged => dest.copy_from_slice(src),
    }
}

fn apply_rule(rule: &ComposeRule, dest: &mut Surface, src: &Surface, key: Option<&[u8]>) -> Result<()> {
    let depth = src.depth();
    let bpp = src.bytes_per_pixel();
    let row_len = src.row_len();
    let (src_pitch, dest_pitch) = (src.pitch(), dest.pitch());
    let height = src.height();

    let keyed = |pixel: &[u8]| key.map(|key| &pixel[..key.len()] == key).unwrap_or(false);

    let src_pixels = src.pixels()?;
    let mut dest_pixels = dest.pixels_mut()?;
    for y in 0..height {
        let src_row = &src_pixels[y * src_pitch..y * src_pitch + row_len];
        let dest_row = &mut dest_pixels[y * dest_pitch..y * dest_pitch + row_len];

        match rule {
            ComposeRule::Copy | ComposeRule::Custom(_) => dest_row.copy_from_slice(src_row),
            ComposeRule::SourceAlpha if depth == Depth::Rgba32 => {
                for (from, to) in src_row.chunks_exact(bpp).zip(dest_row.chunks_exact_mut(bpp)) {
                    blend_pixel(depth, to, from, from[3]);
                }
            }
            ComposeRule::SourceAlpha => dest_row.copy_from_slice(src_row),
            ComposeRule::ColorKey(_) => {
                for (from, to) in src_row.chunks_exact(bpp).zip(dest_row.chunks_exact_mut(bpp)) {
                    if !keyed(from) {
                        to.copy_from_slice(from);
                    }
                }
            }
            ComposeRule::SurfaceAlpha(density) => {
                for (from, to) in src_row.chunks_exact(bpp).zip(dest_row.chunks_exact_mut(bpp)) {
                    blend_pixel(depth, to, from, *density);
                }
            }
            ComposeRule::SurfaceAndColorKey { density, .. } => {
                for (from, to) in src_row.chunks_exact(bpp).zip(dest_row.chunks_exact_mut(bpp)) {
                    if !keyed(from) {
                        blend_pixel(depth, to, from, *density);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Fills the whole surface with one color.
pub fn fill_color(surface: &mut Surface, color: Color) -> Result<()> {
    let area = surface.extents();
    fill_color_area(surface, color, &area)
}

/// Fills `area`, clipped to the surface, row by row so padding and pixels
/// outside a view are left untouched. Indexed surfaces store the nearest
/// palette entry.
pub fn fill_color_area(surface: &mut Surface, color: Color, area: &Rectangle) -> Result<()> {
    surface.ensure_raster()?;
    if surface.depth() == Depth::Indexed8 && surface.palette().is_none() {
        return Err(VideoError::PaletteMissing);
    }

    let area = area.clip(&surface.extents());
    if area.is_empty() {
        return Ok(());
    }

    let bpp = surface.bytes_per_pixel();
    let mut encoded = vec![0; bpp];
    write_color(surface.depth(), color, &mut encoded, surface.palette());

    for_each_pixel(surface, &area, |pixel| pixel.copy_from_slice(&encoded))
}

/// Sets the alpha channel of every pixel to `density`.
pub fn fill_alpha(surface: &mut Surface, density: u8) -> Result<()> {
    let area = surface.extents();
    fill_alpha_area(surface, density, &area)
}

pub fn fill_alpha_area(surface: &mut Surface, density: u8, area: &Rectangle) -> Result<()> {
    ensure_alpha(surface)?;
    let area = area.clip(&surface.extents());
    if area.is_empty() {
        return Ok(());
    }

    for_each_pixel(surface, &area, |pixel| pixel[3] = density)
}

/// Makes pixels matching `color` (alpha ignored) fully transparent and sets
/// every other pixel's alpha to `density`.
pub fn fill_alpha_color(surface: &mut Surface, color: Color, density: u8) -> Result<()> {
    ensure_alpha(surface)?;
    let area = surface.extents();
    let key = [color.r, color.g, color.b];

    for_each_pixel(surface, &area, |pixel| {
        pixel[3] = if pixel[..3] == key { 0 } else { density };
    })
}

fn ensure_alpha(surface: &Surface) -> Result<()> {
    surface.ensure_raster()?;
    if !surface.depth().has_alpha() {
        return Err(VideoError::InvalidDepth);
    }
    Ok(())
}

fn for_each_pixel<F>(surface: &mut Surface, area: &Rectangle, mut apply: F) -> Result<()>
where
    F: FnMut(&mut [u8]),
{
    let bpp = surface.bytes_per_pixel();
    let pitch = surface.pitch();
    let start = area.x as usize * bpp;
    let end = start + area.width as usize * bpp;

    let mut pixels = surface.pixels_mut()?;
    for y in area.y as usize..area.bottom() as usize {
        let row = &mut pixels[y * pitch + start..y * pitch + end];
        row.chunks_exact_mut(bpp).for_each(&mut apply);
    }

    Ok(())
}
