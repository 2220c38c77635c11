//! The pixel surface container.
//!
//! A [`Surface`] pairs pixel memory with the metadata needed to address it:
//! dimension, row pitch, depth, an optional palette and the compose strategy
//! used when the surface acts as a blit source. Memory is either allocated by
//! the surface, wrapped from a caller provided [`PixelBuffer`], or borrowed
//! from a parent surface through a sub-region view.

mod buffer;

use std::{ops::Range, sync::Arc};

pub use buffer::{PixelBuffer, PixelsMut, PixelsRef};

use crate::{
    convert::read_color, Color, CompositeStrategy, Depth, Palette, Rectangle, Result, VideoError,
};

/// How a surface holds its pixel memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Allocated by the surface, or handed over by the caller.
    Owned,
    /// Caller memory whose lifetime the caller manages.
    Borrowed,
    /// Window into a parent surface's memory.
    View,
}

#[derive(Debug, Clone)]
enum Backing {
    Owned(PixelBuffer),
    Borrowed(PixelBuffer),
    View { parent: PixelBuffer, offset: usize },
}

impl Backing {
    fn buffer(&self) -> &PixelBuffer {
        match self {
            Backing::Owned(buffer) | Backing::Borrowed(buffer) => buffer,
            Backing::View { parent, .. } => parent,
        }
    }

    fn offset(&self) -> usize {
        match self {
            Backing::View { offset, .. } => *offset,
            _ => 0,
        }
    }
}

/// Pixel buffer plus its geometry and format metadata.
#[derive(Debug, Default)]
pub struct Surface {
    width: usize,
    height: usize,
    pitch: usize,
    depth: Depth,
    backing: Option<Backing>,
    palette: Option<Arc<Palette>>,
    strategy: CompositeStrategy,
}

impl Surface {
    /// Creates an empty surface without pixel memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a surface with a zeroed, tightly packed buffer.
    pub fn allocate(width: usize, height: usize, depth: Depth) -> Result<Self> {
        let mut surface = Self::new();
        surface.set_attributes(width, height, 0, depth)?;
        surface.allocate_buffer()?;
        Ok(surface)
    }

    /// Wraps caller memory with a tightly packed pitch.
    ///
    /// With `take_ownership` unset the surface only borrows the memory and
    /// the caller remains responsible for its lifetime.
    pub fn wrap(
        buffer: PixelBuffer,
        width: usize,
        height: usize,
        depth: Depth,
        take_ownership: bool,
    ) -> Result<Self> {
        Self::wrap_with_pitch(buffer, width, height, 0, depth, take_ownership)
    }

    /// Wraps caller memory whose rows may carry padding.
    pub fn wrap_with_pitch(
        buffer: PixelBuffer,
        width: usize,
        height: usize,
        pitch: usize,
        depth: Depth,
        take_ownership: bool,
    ) -> Result<Self> {
        let mut surface = Self::new();
        surface.set_attributes(width, height, pitch, depth)?;
        surface.set_buffer(buffer, take_ownership)?;
        Ok(surface)
    }

    /// Allocates a zeroed buffer matching the current attributes, replacing
    /// any memory previously attached.
    pub fn allocate_buffer(&mut self) -> Result<()> {
        if !self.depth.is_raster() {
            return Err(VideoError::InvalidDepth);
        }

        let size = self
            .pitch
            .checked_mul(self.height)
            .ok_or(VideoError::AllocationFailure(usize::MAX))?;
        let buffer = PixelBuffer::zeroed(size)?;

        tracing::debug!(
            width = self.width,
            height = self.height,
            pitch = self.pitch,
            depth = ?self.depth,
            "allocated surface buffer"
        );

        self.backing = Some(Backing::Owned(buffer));
        Ok(())
    }

    /// Attaches caller memory. Raster surfaces require at least
    /// `pitch * height` bytes; `GpuManaged` surfaces accept any buffer.
    pub fn set_buffer(&mut self, buffer: PixelBuffer, take_ownership: bool) -> Result<()> {
        if self.depth.is_raster() {
            let required = self
                .pitch
                .checked_mul(self.height)
                .ok_or(VideoError::OutOfBounds)?;
            if buffer.len() < required {
                return Err(VideoError::OutOfBounds);
            }
        }

        tracing::trace!(len = buffer.len(), take_ownership, "wrapped pixel buffer");

        self.backing = Some(if take_ownership {
            Backing::Owned(buffer)
        } else {
            Backing::Borrowed(buffer)
        });
        Ok(())
    }

    /// Detaches the pixel memory. Owned memory is released once no view
    /// refers to it any more; borrowed memory is left to its caller.
    pub fn free_buffer(&mut self) {
        self.backing = None;
    }

    pub fn has_buffer(&self) -> bool {
        self.backing.is_some()
    }

    /// True when the surface owns its memory.
    pub fn has_allocated_buffer(&self) -> bool {
        matches!(self.backing, Some(Backing::Owned(_)))
    }

    pub fn ownership(&self) -> Option<Ownership> {
        self.backing.as_ref().map(|backing| match backing {
            Backing::Owned(_) => Ownership::Owned,
            Backing::Borrowed(_) => Ownership::Borrowed,
            Backing::View { .. } => Ownership::View,
        })
    }

    /// The underlying memory handle. For views this is the parent's memory.
    pub fn buffer(&self) -> Option<&PixelBuffer> {
        self.backing.as_ref().map(Backing::buffer)
    }

    /// Sets dimension, pitch and depth at once. A pitch of 0 is recomputed as
    /// `width * bytes_per_pixel`.
    pub fn set_attributes(
        &mut self,
        width: usize,
        height: usize,
        pitch: usize,
        depth: Depth,
    ) -> Result<()> {
        let pitch = checked_pitch(width, pitch, depth)?;
        self.width = width;
        self.height = height;
        self.pitch = pitch;
        self.depth = depth;
        Ok(())
    }

    /// Sets the dimension and resets the pitch to a tight packing.
    pub fn set_dimension(&mut self, width: usize, height: usize) -> Result<()> {
        self.set_attributes(width, height, 0, self.depth)
    }

    /// Sets the depth and resets the pitch to a tight packing.
    pub fn set_depth(&mut self, depth: Depth) -> Result<()> {
        self.set_attributes(self.width, self.height, 0, depth)
    }

    pub fn set_pitch(&mut self, pitch: usize) -> Result<()> {
        self.set_attributes(self.width, self.height, pitch, self.depth)
    }

    /// Copies depth, dimension and pitch from `other`. Palette, memory and
    /// compose strategy are left alone.
    pub fn copy_attributes(&mut self, other: &Surface) {
        self.width = other.width;
        self.height = other.height;
        self.pitch = other.pitch;
        self.depth = other.depth;
    }

    /// Equal depth and dimension, and equal pitch unless `ignore_pitch`.
    pub fn compare_attributes(&self, other: &Surface, ignore_pitch: bool) -> bool {
        self.depth == other.depth
            && self.width == other.width
            && self.height == other.height
            && (ignore_pitch || self.pitch == other.pitch)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    /// Bytes per pixel, 0 for depths without a CPU layout.
    pub fn bytes_per_pixel(&self) -> usize {
        self.depth.bytes_per_pixel().unwrap_or(0)
    }

    /// `pitch * height`, the byte size the surface describes.
    pub fn size(&self) -> usize {
        self.pitch * self.height
    }

    /// Bytes covered by the pixels of one row, excluding padding.
    pub fn row_len(&self) -> usize {
        self.width * self.bytes_per_pixel()
    }

    /// The surface bounds positioned at the origin.
    pub fn extents(&self) -> Rectangle {
        Rectangle::with_size(self.width as i32, self.height as i32)
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_deref()
    }

    /// Links a palette. Passing an `Arc` lets several surfaces share one.
    pub fn set_palette(&mut self, palette: impl Into<Arc<Palette>>) {
        self.palette = Some(palette.into());
    }

    pub fn clear_palette(&mut self) {
        self.palette = None;
    }

    pub fn compose_strategy(&self) -> &CompositeStrategy {
        &self.strategy
    }

    pub fn set_compose_strategy(&mut self, strategy: CompositeStrategy) {
        self.strategy = strategy;
    }

    /// Read access to the surface's bytes, starting at its first pixel.
    /// Row `y` starts at `y * pitch`.
    ///
    /// The guard locks the whole underlying [`PixelBuffer`], which views and
    /// wrapping surfaces share. Drop it before writing through any surface
    /// that shares the memory; holding both on one thread deadlocks or
    /// panics.
    pub fn pixels(&self) -> Result<PixelsRef<'_>> {
        let (buffer, range) = self.window()?;
        Ok(PixelsRef::new(buffer, range))
    }

    /// Write access to the surface's bytes. The same locking rule as
    /// [`Surface::pixels`] applies: no other guard on the shared memory may
    /// be alive on this thread.
    pub fn pixels_mut(&mut self) -> Result<PixelsMut<'_>> {
        let (buffer, range) = self.window()?;
        Ok(PixelsMut::new(buffer, range))
    }

    /// Offset of pixel `(x, y)` within [`Surface::pixels`].
    pub fn pixel_offset(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height && self.depth.is_raster() {
            Some(y * self.pitch + x * self.bytes_per_pixel())
        } else {
            None
        }
    }

    /// Decoded color of pixel `(x, y)`. Indexed surfaces resolve through
    /// their palette.
    pub fn pixel(&self, x: usize, y: usize) -> Result<Color> {
        let offset = self.pixel_offset(x, y).ok_or(VideoError::OutOfBounds)?;
        if self.depth == Depth::Indexed8 && self.palette.is_none() {
            return Err(VideoError::PaletteMissing);
        }

        let pixels = self.pixels()?;
        let bpp = self.bytes_per_pixel();
        Ok(read_color(
            self.depth,
            &pixels[offset..offset + bpp],
            self.palette(),
        ))
    }

    /// Creates a view sharing memory with `self`. The rectangle must be
    /// non-empty and lie entirely within the surface.
    pub fn region_view(&self, area: &Rectangle) -> Result<Surface> {
        let backing = self
            .backing
            .as_ref()
            .ok_or(VideoError::NullArgument("surface has no pixel buffer"))?;
        if !self.depth.is_raster() {
            return Err(VideoError::InvalidDepth);
        }
        if !self.extents().contains_rect(area) {
            return Err(VideoError::OutOfBounds);
        }

        let offset = backing.offset()
            + area.y as usize * self.pitch
            + area.x as usize * self.bytes_per_pixel();

        tracing::trace!(?area, offset, "created region view");

        Ok(Surface {
            width: area.width as usize,
            height: area.height as usize,
            pitch: self.pitch,
            depth: self.depth,
            backing: Some(Backing::View {
                parent: backing.buffer().clone(),
                offset,
            }),
            palette: self.palette.clone(),
            strategy: CompositeStrategy::None,
        })
    }

    /// Like [`Surface::region_view`], but `area` is first clipped to
    /// `boundary` and the surface extents. Fails with `OutOfBounds` when
    /// nothing remains.
    pub fn region_view_with_boundary(
        &self,
        area: &Rectangle,
        boundary: &Rectangle,
    ) -> Result<Surface> {
        let clipped = area.clip(&boundary.clip(&self.extents()));
        self.region_view(&clipped)
    }

    /// View covering the whole surface.
    pub fn region_view_all(&self) -> Result<Surface> {
        self.region_view(&self.extents())
    }

    /// Deep copy into a tightly packed, owned buffer. Palette and compose
    /// strategy are carried over.
    pub fn duplicate(&self) -> Result<Surface> {
        let mut copy = Surface::allocate(self.width, self.height, self.depth)?;
        copy.palette = self.palette.clone();
        copy.strategy = self.strategy.clone();

        let row_len = self.row_len();
        let src = self.pixels()?;
        let mut dst = copy.pixels_mut()?;
        for y in 0..self.height {
            let from = y * self.pitch;
            let to = y * row_len;
            dst[to..to + row_len].copy_from_slice(&src[from..from + row_len]);
        }
        drop(dst);

        Ok(copy)
    }

    /// True when both surfaces address the same memory.
    pub(crate) fn shares_memory(&self, other: &Surface) -> bool {
        match (self.buffer(), other.buffer()) {
            (Some(a), Some(b)) => a.same_memory(b),
            _ => false,
        }
    }

    /// Fails unless the surface has a raster depth and memory.
    pub(crate) fn ensure_raster(&self) -> Result<()> {
        if !self.depth.is_raster() {
            return Err(VideoError::InvalidDepth);
        }
        if self.backing.is_none() {
            return Err(VideoError::NullArgument("surface has no pixel buffer"));
        }
        Ok(())
    }

    fn window(&self) -> Result<(&PixelBuffer, Range<usize>)> {
        let backing = self
            .backing
            .as_ref()
            .ok_or(VideoError::NullArgument("surface has no pixel buffer"))?;
        let buffer = backing.buffer();
        let start = backing.offset();
        let len = buffer.len();

        let required = if self.height == 0 || !self.depth.is_raster() {
            0
        } else {
            (self.height - 1) * self.pitch + self.row_len()
        };
        if start + required > len {
            return Err(VideoError::OutOfBounds);
        }

        let end = (start + self.size()).min(len).max(start + required);
        Ok((buffer, start..end))
    }
}

fn checked_pitch(width: usize, pitch: usize, depth: Depth) -> Result<usize> {
    if !depth.is_raster() {
        return Ok(pitch);
    }

    let row = width
        .checked_mul(depth.bytes_per_pixel()?)
        .ok_or(VideoError::AllocationFailure(usize::MAX))?;
    if pitch == 0 {
        Ok(row)
    } else if pitch < row {
        Err(VideoError::msg(format!(
            "pitch {pitch} is smaller than the {row} byte row"
        )))
    } else {
        Ok(pitch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_tightly_packed_zeroed_buffer() {
        let surface = Surface::allocate(5, 3, Depth::Rgb24).unwrap();

        assert_eq!(surface.pitch(), 15);
        assert_eq!(surface.size(), 45);
        assert_eq!(surface.ownership(), Some(Ownership::Owned));
        assert!(surface.pixels().unwrap().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn rejects_allocation_for_non_raster_depths() {
        assert!(matches!(
            Surface::allocate(4, 4, Depth::GpuManaged),
            Err(VideoError::InvalidDepth)
        ));
        assert!(matches!(
            Surface::allocate(4, 4, Depth::None),
            Err(VideoError::InvalidDepth)
        ));
    }

    #[test]
    fn wrapped_memory_stays_with_the_caller() {
        let frame = PixelBuffer::from_vec(vec![0; 8 * 4 * 2]);
        let mut surface = Surface::wrap(frame.clone(), 8, 2, Depth::Rgba32, false).unwrap();
        assert_eq!(surface.ownership(), Some(Ownership::Borrowed));
        assert!(!surface.has_allocated_buffer());

        surface.pixels_mut().unwrap()[0] = 42;
        surface.free_buffer();

        assert!(!surface.has_buffer());
        assert_eq!(frame.to_vec()[0], 42);
    }

    #[test]
    fn rejects_short_buffers_and_narrow_pitch() {
        let short = PixelBuffer::from_vec(vec![0; 10]);
        assert!(matches!(
            Surface::wrap(short, 4, 4, Depth::Indexed8, true),
            Err(VideoError::OutOfBounds)
        ));

        let mut surface = Surface::new();
        assert!(surface.set_attributes(4, 4, 3, Depth::Rgb565).is_err());
        surface.set_attributes(4, 4, 12, Depth::Rgb565).unwrap();
        assert_eq!(surface.pitch(), 12);
    }

    #[test]
    fn oversized_allocations_fail_cleanly() {
        assert!(matches!(
            Surface::allocate(usize::MAX, 2, Depth::Rgba32),
            Err(VideoError::AllocationFailure(_))
        ));
        assert!(matches!(
            Surface::allocate(usize::MAX / 8, 16, Depth::Rgba32),
            Err(VideoError::AllocationFailure(_))
        ));
        assert!(matches!(
            Surface::allocate(usize::MAX / 8, 1, Depth::Rgba32),
            Err(VideoError::AllocationFailure(_))
        ));
    }

    #[test]
    fn gpu_surfaces_are_metadata_only() {
        let mut surface = Surface::new();
        surface.set_attributes(640, 480, 0, Depth::GpuManaged).unwrap();
        surface.set_buffer(PixelBuffer::default(), false).unwrap();

        assert_eq!(surface.pitch(), 0);
        assert!(matches!(
            surface.region_view_all(),
            Err(VideoError::InvalidDepth)
        ));
    }

    #[test]
    fn copies_and_compares_attributes() {
        let source = Surface::allocate(6, 2, Depth::Rgb565).unwrap();
        let mut target = Surface::new();
        target.set_palette(Palette::grayscale());
        target.copy_attributes(&source);

        assert!(target.compare_attributes(&source, false));
        assert!(!target.has_buffer());
        assert!(target.palette().is_some());

        target.set_pitch(16).unwrap();
        assert!(!target.compare_attributes(&source, false));
        assert!(target.compare_attributes(&source, true));
    }

    #[test]
    fn full_extent_view_matches_parent() {
        let parent = Surface::allocate(7, 5, Depth::Rgba32).unwrap();
        let view = parent.region_view_all().unwrap();

        assert_eq!(view.width(), parent.width());
        assert_eq!(view.height(), parent.height());
        assert_eq!(view.pitch(), parent.pitch());
        assert_eq!(view.ownership(), Some(Ownership::View));
        assert!(view.shares_memory(&parent));

        let view_start = view.pixels().unwrap().as_ptr();
        let parent_start = parent.pixels().unwrap().as_ptr();
        assert_eq!(view_start, parent_start);
    }

    #[test]
    fn views_write_through_to_parent() {
        let parent = Surface::allocate(4, 4, Depth::Indexed8).unwrap();
        let mut view = parent.region_view(&Rectangle::new(1, 2, 2, 2)).unwrap();

        assert_eq!(view.pitch(), 4);
        view.pixels_mut().unwrap()[0] = 3;
        view.pixels_mut().unwrap()[5] = 4;

        let bytes = parent.pixels().unwrap();
        assert_eq!(bytes[2 * 4 + 1], 3);
        assert_eq!(bytes[3 * 4 + 2], 4);
    }

    #[test]
    fn nested_views_accumulate_offsets() {
        let parent = Surface::allocate(8, 8, Depth::Rgb565).unwrap();
        let outer = parent.region_view(&Rectangle::new(2, 2, 6, 6)).unwrap();
        let mut inner = outer.region_view(&Rectangle::new(1, 1, 2, 2)).unwrap();
        inner.pixels_mut().unwrap()[0] = 0xab;

        assert_eq!(parent.pixels().unwrap()[3 * 16 + 3 * 2], 0xab);
    }

    #[test]
    fn views_outside_the_parent_fail() {
        let parent = Surface::allocate(4, 4, Depth::Rgb24).unwrap();

        for area in [
            Rectangle::new(2, 0, 3, 4),
            Rectangle::new(0, 1, 4, 4),
            Rectangle::new(-1, 0, 2, 2),
            Rectangle::new(0, 0, 0, 2),
        ] {
            assert!(matches!(
                parent.region_view(&area),
                Err(VideoError::OutOfBounds)
            ));
        }
        assert!(matches!(
            Surface::new().region_view(&Rectangle::with_size(1, 1)),
            Err(VideoError::NullArgument(_))
        ));
    }

    #[test]
    fn boundary_views_clip_instead_of_failing() {
        let mut parent = Surface::allocate(6, 6, Depth::Indexed8).unwrap();
        parent.pixels_mut().unwrap()[2 * 6 + 4] = 9;

        let view = parent
            .region_view_with_boundary(
                &Rectangle::new(2, 2, 10, 10),
                &Rectangle::new(0, 0, 5, 4),
            )
            .unwrap();
        assert_eq!((view.width(), view.height()), (3, 2));
        assert_eq!(view.pixels().unwrap()[2], 9);

        let view = parent
            .region_view_with_boundary(
                &Rectangle::new(-3, -3, 20, 20),
                &Rectangle::with_size(99, 99),
            )
            .unwrap();
        assert_eq!((view.width(), view.height()), (6, 6));

        assert!(matches!(
            parent.region_view_with_boundary(
                &Rectangle::new(5, 5, 1, 1),
                &Rectangle::with_size(4, 4)
            ),
            Err(VideoError::OutOfBounds)
        ));
    }

    #[test]
    fn view_keeps_parent_memory_alive() {
        let mut parent = Surface::allocate(2, 2, Depth::Indexed8).unwrap();
        parent.pixels_mut().unwrap()[3] = 7;
        let view = parent.region_view(&Rectangle::new(1, 1, 1, 1)).unwrap();
        drop(parent);

        assert_eq!(view.pixels().unwrap()[0], 7);
    }

    #[test]
    fn duplicate_packs_rows() {
        let frame = PixelBuffer::from_vec((0..24).collect());
        let padded = Surface::wrap_with_pitch(frame, 2, 3, 8, Depth::Indexed8, false).unwrap();
        let copy = padded.duplicate().unwrap();

        assert_eq!(copy.pitch(), 2);
        assert_eq!(&*copy.pixels().unwrap(), &[0, 1, 8, 9, 16, 17]);
        assert!(!copy.shares_memory(&padded));
    }

    #[test]
    fn reads_decoded_pixels() {
        let mut surface = Surface::allocate(2, 1, Depth::Indexed8).unwrap();
        assert!(matches!(surface.pixel(0, 0), Err(VideoError::PaletteMissing)));

        surface.set_palette(Palette::from_colors(vec![Color::BLACK, Color::WHITE]).unwrap());
        surface.pixels_mut().unwrap()[1] = 1;

        assert_eq!(surface.pixel(1, 0).unwrap(), Color::WHITE);
        assert!(matches!(surface.pixel(2, 0), Err(VideoError::OutOfBounds)));
    }
}
