//! Owning typed image.
//!
//! Backed by a pluggable [`Allocator`] and supports explicit row-alignment
//! requests. This type is always genuinely the owner of its buffer — there
//! is no "view posing as owner" state, so `CannotReallocateView` has no
//! reachable trigger through this safe API; see DESIGN.md.

use crate::alloc_support::{Allocator, Block, DefaultAllocator};
use crate::error::AllocError;
use crate::layout::TypedLayout;
use crate::pixel::PixelFormatTag;
use crate::primitives::{PixelLength, StrideBytes};
use crate::view::{TypedImageView, TypedImageViewMut};
use bytemuck::Pod;

fn pixel_size<T, const N: usize>() -> usize {
    N * core::mem::size_of::<T>()
}

/// An owning image of `Pixel<T, N, F>` elements backed by a byte buffer
/// obtained from `A`.
pub struct TypedImage<T, const N: usize, F: PixelFormatTag, A: Allocator = DefaultAllocator> {
    block: Option<Block>,
    layout: TypedLayout,
    alloc: A,
    _fmt: core::marker::PhantomData<(T, F)>,
}

impl<T, const N: usize, F: PixelFormatTag, A: Allocator> core::fmt::Debug for TypedImage<T, N, F, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypedImage").field("layout", &self.layout).finish()
    }
}

// SAFETY: the buffer is exclusively owned and never aliased outside of
// borrows with the image's own lifetime.
unsafe impl<T: Send, const N: usize, F: PixelFormatTag + Send, A: Allocator + Send> Send
    for TypedImage<T, N, F, A>
{
}

impl<T: Pod, const N: usize, F: PixelFormatTag> TypedImage<T, N, F, DefaultAllocator> {
    /// An empty, valid image.
    pub fn new() -> Self {
        Self::new_in(DefaultAllocator)
    }

    pub fn allocate(width: u32, height: u32) -> Result<Self, AllocError> {
        Self::allocate_in(width, height, DefaultAllocator)
    }

    pub fn allocate_with_stride(width: u32, height: u32, stride_bytes: usize) -> Result<Self, AllocError> {
        Self::allocate_with_stride_in(width, height, stride_bytes, DefaultAllocator)
    }

    pub fn allocate_with_alignment(width: u32, height: u32, row_alignment: usize) -> Result<Self, AllocError> {
        Self::allocate_with_alignment_in(width, height, row_alignment, DefaultAllocator)
    }
}

impl<T: Pod, const N: usize, F: PixelFormatTag, A: Allocator> TypedImage<T, N, F, A> {
    pub fn new_in(alloc: A) -> Self {
        TypedImage {
            block: None,
            layout: TypedLayout::new(PixelLength(0), PixelLength(0)),
            alloc,
            _fmt: core::marker::PhantomData,
        }
    }

    pub fn allocate_in(width: u32, height: u32, alloc: A) -> Result<Self, AllocError> {
        Self::allocate_with_stride_in(width, height, 0, alloc)
    }

    pub fn allocate_with_stride_in(
        width: u32,
        height: u32,
        stride_bytes: usize,
        alloc: A,
    ) -> Result<Self, AllocError> {
        let layout = TypedLayout::with_stride(PixelLength(width), PixelLength(height), StrideBytes(stride_bytes));
        let resolved_stride = layout.resolved_stride(pixel_size::<T, N>());
        let total = (resolved_stride * PixelLength(height)).0;
        let block = alloc.allocate(total, core::mem::align_of::<T>())?;
        Ok(TypedImage {
            block: Some(block),
            layout: TypedLayout::with_stride(PixelLength(width), PixelLength(height), resolved_stride),
            alloc,
            _fmt: core::marker::PhantomData,
        })
    }

    pub fn allocate_with_alignment_in(
        width: u32,
        height: u32,
        row_alignment: usize,
        alloc: A,
    ) -> Result<Self, AllocError> {
        let ps = pixel_size::<T, N>();
        let min_row = width as usize * ps;
        let stride = min_row.div_ceil(row_alignment) * row_alignment;
        let total = stride * height as usize;
        let block = alloc.allocate(total, row_alignment.max(core::mem::align_of::<T>()))?;
        Ok(TypedImage {
            block: Some(block),
            layout: TypedLayout::with_stride(PixelLength(width), PixelLength(height), StrideBytes(stride)),
            alloc,
            _fmt: core::marker::PhantomData,
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

    pub fn stride_bytes(&self) -> usize {
        self.layout.stride_bytes.0
    }

    pub fn is_empty(&self) -> bool {
        self.layout.width.0 == 0 || self.layout.height.0 == 0
    }

    pub fn as_view(&self) -> TypedImageView<'_, T, N, F> {
        TypedImageView::new(self.bytes(), self.layout)
    }

    pub fn as_view_mut(&mut self) -> TypedImageViewMut<'_, T, N, F> {
        let layout = self.layout;
        TypedImageViewMut::new(self.bytes_mut(), layout)
    }

    /// Deep copy of the pointed-to region of `view`.
    pub fn copy_from_view(view: &TypedImageView<'_, T, N, F>, alloc: A) -> Result<Self, AllocError>
    where
        A: Clone,
    {
        let mut img = Self::allocate_with_stride_in(view.width().0, view.height().0, 0, alloc)?;
        for y in 0..view.height().0 {
            img.as_view_mut().byte_row_mut(y).copy_from_slice(view.byte_row(y));
        }
        Ok(img)
    }

    /// Replaces this image's contents with a freshly allocated buffer of
    /// the requested layout, unless it (including stride) already matches
    /// the current layout: any layout change, stride included, forces
    /// reallocation — see DESIGN.md.
    pub fn reallocate(&mut self, width: u32, height: u32, stride_bytes: usize) -> Result<(), AllocError>
    where
        A: Clone,
    {
        let requested = TypedLayout::with_stride(PixelLength(width), PixelLength(height), StrideBytes(stride_bytes));
        let resolved_stride = requested.resolved_stride(pixel_size::<T, N>());
        let resolved = TypedLayout::with_stride(PixelLength(width), PixelLength(height), resolved_stride);
        if resolved == self.layout {
            return Ok(());
        }
        let total = (resolved_stride * PixelLength(height)).0;
        let new_block = self.alloc.allocate(total, core::mem::align_of::<T>())?;
        if let Some(old) = self.block.take() {
            unsafe { self.alloc.deallocate(&old) };
        }
        self.block = Some(new_block);
        self.layout = resolved;
        Ok(())
    }

    /// Returns the owned memory block and its size, leaving `self` empty
    /// and valid.
    pub fn relinquish_data_ownership(&mut self) -> Option<(Block, A)>
    where
        A: Clone,
    {
        let block = self.block.take()?;
        self.layout = TypedLayout::new(PixelLength(0), PixelLength(0));
        Some((block, self.alloc.clone()))
    }

    /// Takes ownership of `block`, a memory block already known to have
    /// been produced by `alloc` (for instance, one previously returned by
    /// [`TypedImage::relinquish_data_ownership`]).
    ///
    /// # Safety
    /// `block` must have been produced by `alloc` (or an allocator that is
    /// layout-compatible with it), must not be owned by anything else, and
    /// must be at least `layout.stride_bytes * layout.height` bytes long.
    pub unsafe fn from_raw(block: Block, layout: TypedLayout, alloc: A) -> Self {
        TypedImage {
            block: Some(block),
            layout,
            alloc,
            _fmt: core::marker::PhantomData,
        }
    }
}

impl<T, const N: usize, F: PixelFormatTag, A: Allocator> Drop for TypedImage<T, N, F, A> {
    fn drop(&mut self) {
        if let Some(block) = &self.block {
            unsafe { self.alloc.deallocate(block) };
        }
    }
}

impl<T: Pod, const N: usize, F: PixelFormatTag, A: Allocator + Clone> Clone for TypedImage<T, N, F, A> {
    fn clone(&self) -> Self {
        Self::copy_from_view(&self.as_view(), self.alloc.clone()).expect("allocation failed during clone")
    }
}

impl<T: Pod + PartialEq, const N: usize, F: PixelFormatTag, A: Allocator> PartialEq for TypedImage<T, N, F, A> {
    fn eq(&self, other: &Self) -> bool {
        self.as_view() == other.as_view()
    }
}

impl<T: Pod, const N: usize, F: PixelFormatTag> Default for TypedImage<T, N, F, DefaultAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pixel::{Pixel, Rgb, Y};

    #[test]
    fn allocate_resolves_stride_to_packed_minimum() {
        let img = TypedImage::<u8, 1, Y>::allocate(4, 3).unwrap();
        assert_eq!(img.stride_bytes(), 4);
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 3);
    }

    #[test]
    fn alignment_rounds_stride_up() {
        let img = TypedImage::<u8, 3, Rgb>::allocate_with_alignment(5, 2, 16).unwrap();
        assert_eq!(img.stride_bytes() % 16, 0);
        assert!(img.stride_bytes() >= 15);
    }

    #[test]
    fn clone_is_deep_copy() {
        let mut img = TypedImage::<u8, 1, Y>::allocate(2, 2).unwrap();
        img.as_view_mut().assign_from_fn(2, 2, |x, y| Pixel::<u8, 1, Y>::new((y * 2 + x) as u8)).unwrap();
        let cloned = img.clone();
        assert_eq!(img, cloned);
        img.as_view_mut().set_pixel(0, 0, Pixel::<u8, 1, Y>::new(99));
        assert_ne!(img, cloned);
    }

    #[test]
    fn reallocate_is_noop_for_identical_layout() {
        let mut img = TypedImage::<u8, 1, Y>::allocate(4, 4).unwrap();
        img.as_view_mut().set_pixel(0, 0, Pixel::<u8, 1, Y>::new(7));
        img.reallocate(4, 4, 4).unwrap();
        assert_eq!(img.as_view().pixel(0, 0).value(), 7);
    }

    #[test]
    fn reallocate_changes_buffer_on_stride_change_alone() {
        let mut img = TypedImage::<u8, 1, Y>::allocate(4, 4).unwrap();
        img.as_view_mut().set_pixel(0, 0, Pixel::<u8, 1, Y>::new(7));
        img.reallocate(4, 4, 8).unwrap();
        assert_eq!(img.stride_bytes(), 8);
        // fresh allocation is zeroed
        assert_eq!(img.as_view().pixel(0, 0).value(), 0);
    }

    #[test]
    fn relinquish_leaves_image_empty() {
        let mut img = TypedImage::<u8, 1, Y>::allocate(2, 2).unwrap();
        let (_block, _alloc) = img.relinquish_data_ownership().unwrap();
        assert!(img.is_empty());
        assert_eq!(img.width(), 0);
    }

    #[test]
    fn from_raw_round_trips_relinquished_block() {
        let mut img = TypedImage::<u8, 1, Y>::allocate(2, 2).unwrap();
        img.as_view_mut().set_pixel(0, 0, Pixel::<u8, 1, Y>::new(7));
        let layout = img.layout;
        let (block, alloc) = img.relinquish_data_ownership().unwrap();
        let restored = unsafe { TypedImage::<u8, 1, Y, _>::from_raw(block, layout, alloc) };
        assert_eq!(restored.width(), 2);
        assert_eq!(restored.as_view().pixel(0, 0).value(), 7);
    }
}
