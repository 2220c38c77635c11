use std::{
    fmt,
    ops::{Deref, DerefMut, Range},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{Result, VideoError};

/// Shared handle to a block of pixel memory.
///
/// Cloning the handle shares the memory. A display backend keeps one clone
/// of its frame buffer and hands another to [`Surface::wrap`](crate::Surface::wrap);
/// sub-region views hold a clone of their parent's handle so the memory
/// lives at least as long as the view.
#[derive(Clone, Default)]
pub struct PixelBuffer {
    bytes: Arc<RwLock<Vec<u8>>>,
}

impl PixelBuffer {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(RwLock::new(bytes)),
        }
    }

    /// Allocates `len` zeroed bytes, reporting allocation failure instead
    /// of aborting.
    pub fn zeroed(len: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| VideoError::AllocationFailure(len))?;
        bytes.resize(len, 0);
        Ok(Self::from_vec(bytes))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when both handles refer to the same memory.
    pub fn same_memory(&self, other: &PixelBuffer) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }

    /// Copies the current contents out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.read().clone()
    }

    // Pixel bytes carry no invariant a panicking writer could break, so a
    // poisoned lock is still usable.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.bytes.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.bytes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Vec<u8>> for PixelBuffer {
    fn from(value: Vec<u8>) -> Self {
        Self::from_vec(value)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("len", &self.len())
            .finish()
    }
}

/// Read access to the byte window of a surface.
pub struct PixelsRef<'a> {
    guard: RwLockReadGuard<'a, Vec<u8>>,
    range: Range<usize>,
}

impl<'a> PixelsRef<'a> {
    pub(crate) fn new(buffer: &'a PixelBuffer, range: Range<usize>) -> Self {
        Self {
            guard: buffer.read(),
            range,
        }
    }
}

impl Deref for PixelsRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard[self.range.clone()]
    }
}

/// Write access to the byte window of a surface.
pub struct PixelsMut<'a> {
    guard: RwLockWriteGuard<'a, Vec<u8>>,
    range: Range<usize>,
}

impl<'a> PixelsMut<'a> {
    pub(crate) fn new(buffer: &'a PixelBuffer, range: Range<usize>) -> Self {
        Self {
            guard: buffer.write(),
            range,
        }
    }
}

impl Deref for PixelsMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard[self.range.clone()]
    }
}

impl DerefMut for PixelsMut<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.guard[self.range.clone()]
    }
}
