//! Owning dynamic (runtime-typed) image.
//!
//! The untyped analogue of [`crate::owned_typed::TypedImage`]: geometry and
//! pixel semantics are carried as data ([`UntypedLayout`],
//! [`UntypedImageSemantics`]) rather than as type parameters.

use crate::alloc_support::{Allocator, Block, DefaultAllocator};
use crate::dyn_view::{DynImageView, DynImageViewMut};
use crate::error::AllocError;
use crate::layout::{UntypedImageSemantics, UntypedLayout};
use crate::primitives::PixelLength;

/// An owning image whose channel count, element width, and pixel format are
/// runtime values rather than type parameters.
pub struct DynImage<A: Allocator = DefaultAllocator> {
    block: Option<Block>,
    layout: UntypedLayout,
    semantics: UntypedImageSemantics,
    alloc: A,
}

impl<A: Allocator> core::fmt::Debug for DynImage<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DynImage").field("layout", &self.layout).field("semantics", &self.semantics).finish()
    }
}

// SAFETY: the buffer is exclusively owned and never aliased outside of
// borrows with the image's own lifetime.
unsafe impl<A: Allocator + Send> Send for DynImage<A> {}

impl DynImage<DefaultAllocator> {
    pub fn new() -> Self {
        Self::new_in(DefaultAllocator)
    }

    pub fn allocate(layout: UntypedLayout, semantics: UntypedImageSemantics) -> Result<Self, AllocError> {
        Self::allocate_in(layout, semantics, DefaultAllocator)
    }
}

impl<A: Allocator> DynImage<A> {
    pub fn new_in(alloc: A) -> Self {
        DynImage {
            block: None,
            layout: UntypedLayout::new(PixelLength(0), PixelLength(0), 0, 0),
            semantics: UntypedImageSemantics::default(),
            alloc,
        }
    }

    pub fn allocate_in(mut layout: UntypedLayout, semantics: UntypedImageSemantics, alloc: A) -> Result<Self, AllocError> {
        layout.stride_bytes = layout.resolved_stride();
        let total = layout.total_bytes().0;
        let align = layout.bytes_per_channel.max(1) as usize;
        let block = alloc.allocate(total, align)?;
        Ok(DynImage {
            block: Some(block),
            layout,
            semantics,
            alloc,
        })
    }

    fn bytes(&self) -> &[u8] {
        match &self.block {
            Some(b) => unsafe { core::slice::from_raw_parts(b.ptr.as_ptr(), b.len) },
            None => &[],
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.block {
            Some(b) => unsafe { core::slice::from_raw_parts_mut(b.ptr.as_ptr(), b.len) },
            None => &mut [],
        }
    }

    pub fn width(&self) -> u32 {
        self.layout.width.0
    }

    pub fn height(&self) -> u32 {
        self.layout.height.0
    }

    pub fn layout(&self) -> UntypedLayout {
        self.layout
    }

    pub fn semantics(&self) -> UntypedImageSemantics {
        self.semantics
    }

    pub fn is_empty(&self) -> bool {
        self.layout.width.0 == 0 || self.layout.height.0 == 0
    }

    pub fn as_view(&self) -> DynImageView<'_> {
        DynImageView::new(self.bytes(), self.layout, self.semantics)
    }

    pub fn as_view_mut(&mut self) -> DynImageViewMut<'_> {
        let layout = self.layout;
        let semantics = self.semantics;
        DynImageViewMut::new(self.bytes_mut(), layout, semantics)
    }

    /// Replaces this image's contents with a freshly allocated buffer of the
    /// requested layout/semantics unless they already match (width, height,
    /// channels, bytes-per-channel, and stride all equal); any one of those
    /// changing — stride alone included — forces reallocation. See
    /// DESIGN.md for why this corrects the upstream `reallocate()` contract.
    pub fn reallocate(&mut self, mut layout: UntypedLayout, semantics: UntypedImageSemantics) -> Result<(), AllocError> {
        layout.stride_bytes = layout.resolved_stride();
        if layout == self.layout && semantics == self.semantics {
            return Ok(());
        }
        let total = layout.total_bytes().0;
        let align = layout.bytes_per_channel.max(1) as usize;
        let new_block = self.alloc.allocate(total, align)?;
        if let Some(old) = self.block.take() {
            unsafe { self.alloc.deallocate(&old) };
        }
        self.block = Some(new_block);
        self.layout = layout;
        self.semantics = semantics;
        Ok(())
    }

    /// Returns the owned memory block, leaving `self` empty and valid.
    pub fn relinquish_data_ownership(&mut self) -> Option<Block> {
        let block = self.block.take()?;
        self.layout = UntypedLayout::new(PixelLength(0), PixelLength(0), 0, 0);
        self.semantics = UntypedImageSemantics::default();
        Some(block)
    }

    /// Takes ownership of `block`, a memory block already known to have
    /// been produced by `alloc` (for instance, one previously returned by
    /// [`DynImage::relinquish_data_ownership`]).
    ///
    /// # Safety
    /// `block` must have been produced by `alloc` (or an allocator that is
    /// layout-compatible with it), must not be owned by anything else, and
    /// must be at least `layout.total_bytes()` bytes long.
    pub unsafe fn from_raw(block: Block, layout: UntypedLayout, semantics: UntypedImageSemantics, alloc: A) -> Self {
        DynImage {
            block: Some(block),
            layout,
            semantics,
            alloc,
        }
    }
}

impl<A: Allocator> Drop for DynImage<A> {
    fn drop(&mut self) {
        if let Some(block) = &self.block {
            unsafe { self.alloc.deallocate(block) };
        }
    }
}

impl<A: Allocator + Clone> Clone for DynImage<A> {
    fn clone(&self) -> Self {
        let mut img = Self::allocate_in(self.layout, self.semantics, self.alloc.clone()).expect("allocation failed during clone");
        for y in 0..self.height() {
            img.as_view_mut().byte_row_mut(y).copy_from_slice(self.as_view().byte_row(y));
        }
        img
    }
}

impl<A: Allocator> PartialEq for DynImage<A> {
    fn eq(&self, other: &Self) -> bool {
        self.as_view() == other.as_view()
    }
}

impl Default for DynImage<DefaultAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::format::{PixelFormat, SampleFormat};
    use crate::pixel::{Pixel, Y};
    use crate::primitives::StrideBytes;

    fn rgb_semantics() -> UntypedImageSemantics {
        UntypedImageSemantics {
            pixel_format: PixelFormat::RGB,
            sample_format: SampleFormat::UnsignedInteger,
        }
    }

    #[test]
    fn allocate_resolves_stride_to_packed_minimum() {
        let layout = UntypedLayout::new(PixelLength(4), PixelLength(3), 3, 1);
        let img = DynImage::allocate(layout, rgb_semantics()).unwrap();
        assert_eq!(img.layout().stride_bytes, StrideBytes(12));
    }

    #[test]
    fn clone_is_deep_copy() {
        let layout = UntypedLayout::new(PixelLength(2), PixelLength(2), 1, 1);
        let semantics = UntypedImageSemantics {
            pixel_format: PixelFormat::Y,
            sample_format: SampleFormat::UnsignedInteger,
        };
        let mut img = DynImage::allocate(layout, semantics).unwrap();
        img.as_view_mut().set_pixel(0, 0, Pixel::<u8, 1, Y>::new(7));
        let cloned = img.clone();
        assert_eq!(img, cloned);
        img.as_view_mut().set_pixel(0, 0, Pixel::<u8, 1, Y>::new(99));
        assert_ne!(img, cloned);
    }

    #[test]
    fn reallocate_is_noop_for_identical_layout() {
        let layout = UntypedLayout::new(PixelLength(4), PixelLength(4), 1, 1);
        let semantics = UntypedImageSemantics {
            pixel_format: PixelFormat::Y,
            sample_format: SampleFormat::UnsignedInteger,
        };
        let mut img = DynImage::allocate(layout, semantics).unwrap();
        img.as_view_mut().set_pixel(0, 0, Pixel::<u8, 1, Y>::new(7));
        img.reallocate(layout, semantics).unwrap();
        assert_eq!(img.as_view().pixel::<u8, 1, Y>(0, 0).value(), 7);
    }

    #[test]
    fn reallocate_changes_buffer_on_stride_change_alone() {
        let layout = UntypedLayout::new(PixelLength(4), PixelLength(4), 1, 1);
        let semantics = UntypedImageSemantics {
            pixel_format: PixelFormat::Y,
            sample_format: SampleFormat::UnsignedInteger,
        };
        let mut img = DynImage::allocate(layout, semantics).unwrap();
        img.as_view_mut().set_pixel(0, 0, Pixel::<u8, 1, Y>::new(7));
        let mut restrided = UntypedLayout::new(PixelLength(4), PixelLength(4), 1, 1);
        restrided.stride_bytes = StrideBytes(8);
        img.reallocate(restrided, semantics).unwrap();
        assert_eq!(img.layout().stride_bytes, StrideBytes(8));
        assert_eq!(img.as_view().pixel::<u8, 1, Y>(0, 0).value(), 0);
    }

    #[test]
    fn relinquish_leaves_image_empty() {
        let layout = UntypedLayout::new(PixelLength(2), PixelLength(2), 1, 1);
        let mut img = DynImage::allocate(layout, rgb_semantics()).unwrap();
        let _block = img.relinquish_data_ownership().unwrap();
        assert!(img.is_empty());
    }

    #[test]
    fn from_raw_round_trips_relinquished_block() {
        let layout = UntypedLayout::new(PixelLength(2), PixelLength(2), 1, 1);
        let semantics = UntypedImageSemantics {
            pixel_format: PixelFormat::Y,
            sample_format: SampleFormat::UnsignedInteger,
        };
        let mut img = DynImage::allocate(layout, semantics).unwrap();
        img.as_view_mut().set_pixel(0, 0, Pixel::<u8, 1, Y>::new(7));
        let saved_layout = img.layout();
        let block = img.relinquish_data_ownership().unwrap();
        let restored = unsafe { DynImage::from_raw(block, saved_layout, semantics, img.alloc) };
        assert_eq!(restored.as_view().pixel::<u8, 1, Y>(0, 0).value(), 7);
    }
}
