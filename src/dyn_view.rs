//! Non-owning dynamic (runtime-typed) image views.
//!
//! Generalizes `ImageBufferRef`/`ImageBufferMutRef` from a zero-sized
//! compile-time pixel-format parameter to a full geometry-plus-semantics
//! header (channel count, bytes per channel, pixel format, sample format)
//! carried as data. Typed access methods debug-assert the caller's
//! `Pixel<T, N, F>` against that header instead of relying on the type
//! system alone.

use crate::error::ShapeMismatch;
use crate::format::{PixelFormat, SampleFormat};
use crate::layout::{UntypedImageSemantics, UntypedLayout};
use crate::pixel::{HasSampleFormat, Pixel, PixelFormatTag};
use crate::primitives::{Bytes, PixelLength, StrideBytes};
use crate::view::{TypedImageView, TypedImageViewMut};
use bytemuck::Pod;

fn assert_header_matches<T: HasSampleFormat, const N: usize, F: PixelFormatTag>(
    layout: &UntypedLayout,
    semantics: &UntypedImageSemantics,
) {
    debug_assert_eq!(layout.channels as usize, N, "channel count mismatch");
    debug_assert_eq!(layout.bytes_per_channel as usize, core::mem::size_of::<T>(), "element size mismatch");
    debug_assert!(
        semantics.pixel_format.compatible(F::FORMAT),
        "pixel format mismatch: view is {:?}, requested {:?}",
        semantics.pixel_format,
        F::FORMAT
    );
    debug_assert!(
        semantics.sample_format == SampleFormat::Unknown || semantics.sample_format == T::SAMPLE_FORMAT,
        "sample format mismatch: view is {:?}, requested {:?}",
        semantics.sample_format,
        T::SAMPLE_FORMAT
    );
}

/// A non-owning, read-only view whose pixel format is a runtime value
/// rather than a type parameter.
#[derive(Debug, Clone, Copy)]
pub struct DynImageView<'a> {
    buf: &'a [u8],
    layout: UntypedLayout,
    semantics: UntypedImageSemantics,
}

/// The mutable counterpart of [`DynImageView`].
#[derive(Debug)]
pub struct DynImageViewMut<'a> {
    buf: &'a mut [u8],
    layout: UntypedLayout,
    semantics: UntypedImageSemantics,
}

macro_rules! shared_readonly_api {
    ($ty:ident) => {
        impl<'a> $ty<'a> {
            pub fn width(&self) -> PixelLength {
                self.layout.width
            }

            pub fn height(&self) -> PixelLength {
                self.layout.height
            }

            pub fn stride_bytes(&self) -> StrideBytes {
                self.layout.stride_bytes
            }

            pub fn row_bytes(&self) -> Bytes {
                self.layout.row_bytes()
            }

            pub fn total_bytes(&self) -> Bytes {
                self.layout.total_bytes()
            }

            pub fn is_packed(&self) -> bool {
                self.layout.is_packed()
            }

            pub fn is_empty(&self) -> bool {
                self.layout.width.0 == 0 || self.layout.height.0 == 0 || self.buf.is_empty()
            }

            pub fn is_valid(&self) -> bool {
                !self.buf.is_empty() || self.is_empty()
            }

            pub fn layout(&self) -> UntypedLayout {
                self.layout
            }

            pub fn semantics(&self) -> UntypedImageSemantics {
                self.semantics
            }

            pub fn pixel_format(&self) -> PixelFormat {
                self.semantics.pixel_format
            }

            pub fn sample_format(&self) -> SampleFormat {
                self.semantics.sample_format
            }

            pub fn byte_row(&self, y: u32) -> &[u8] {
                debug_assert!(y < self.layout.height.0);
                let row_bytes = self.row_bytes().0;
                let start = y as usize * self.layout.stride_bytes.0;
                &self.buf[start..start + row_bytes]
            }

            pub fn byte_ptr(&self, x: u32, y: u32) -> &[u8] {
                debug_assert!(x < self.layout.width.0 && y < self.layout.height.0);
                let bpp = self.layout.bytes_per_pixel();
                let row = self.byte_row(y);
                &row[x as usize * bpp..x as usize * bpp + bpp]
            }

            /// Reads pixel `(x, y)` as `Pixel<T, N, F>`, debug-asserting that
            /// `T`/`N`/`F` agree with this view's runtime header.
            pub fn pixel<T: Pod + HasSampleFormat, const N: usize, F: PixelFormatTag>(&self, x: u32, y: u32) -> Pixel<T, N, F> {
                assert_header_matches::<T, N, F>(&self.layout, &self.semantics);
                let bytes = self.byte_ptr(x, y);
                let arr: [T; N] = bytemuck::pod_read_unaligned(bytes);
                Pixel::from_array(arr)
            }

            /// Reinterprets this view as a statically typed view, provided
            /// its runtime header matches `T`/`N`/`F`.
            pub fn as_typed<T: Pod + HasSampleFormat, const N: usize, F: PixelFormatTag>(&self) -> TypedImageView<'_, T, N, F> {
                assert_header_matches::<T, N, F>(&self.layout, &self.semantics);
                let typed_layout = crate::layout::TypedLayout::with_stride(
                    self.layout.width,
                    self.layout.height,
                    self.layout.stride_bytes,
                );
                TypedImageView::new(self.as_bytes(), typed_layout)
            }
        }
    };
}

shared_readonly_api!(DynImageView);
shared_readonly_api!(DynImageViewMut);

impl<'a> DynImageView<'a> {
    pub fn new(buf: &'a [u8], mut layout: UntypedLayout, semantics: UntypedImageSemantics) -> Self {
        layout.stride_bytes = layout.resolved_stride();
        DynImageView { buf, layout, semantics }
    }

    fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Builds a dynamic view over the same bytes as `view`, stamping in
    /// `F`'s static channel/format as the runtime header.
    pub fn from_typed<T: Pod, const N: usize, F: PixelFormatTag>(view: &TypedImageView<'a, T, N, F>) -> Self {
        let layout = UntypedLayout {
            width: view.width(),
            height: view.height(),
            channels: N as u8,
            bytes_per_channel: core::mem::size_of::<T>() as u8,
            stride_bytes: view.stride_bytes(),
        };
        let semantics = UntypedImageSemantics {
            pixel_format: F::FORMAT,
            sample_format: SampleFormat::Unknown,
        };
        DynImageView {
            buf: view.backing_bytes(),
            layout,
            semantics,
        }
    }
}

impl<'a> DynImageViewMut<'a> {
    pub fn new(buf: &'a mut [u8], mut layout: UntypedLayout, semantics: UntypedImageSemantics) -> Self {
        layout.stride_bytes = layout.resolved_stride();
        DynImageViewMut { buf, layout, semantics }
    }

    fn as_bytes(&self) -> &[u8] {
        self.buf
    }

    pub fn byte_row_mut(&mut self, y: u32) -> &mut [u8] {
        debug_assert!(y < self.layout.height.0);
        let row_bytes = self.layout.row_bytes().0;
        let start = y as usize * self.layout.stride_bytes.0;
        &mut self.buf[start..start + row_bytes]
    }

    pub fn byte_ptr_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        debug_assert!(x < self.layout.width.0 && y < self.layout.height.0);
        let bpp = self.layout.bytes_per_pixel();
        let row = self.byte_row_mut(y);
        &mut row[x as usize * bpp..x as usize * bpp + bpp]
    }

    pub fn set_pixel<T: Pod + HasSampleFormat, const N: usize, F: PixelFormatTag>(&mut self, x: u32, y: u32, value: Pixel<T, N, F>) {
        assert_header_matches::<T, N, F>(&self.layout, &self.semantics);
        let bytes = self.byte_ptr_mut(x, y);
        bytes.copy_from_slice(bytemuck::cast_slice(value.as_slice()));
    }

    pub fn as_typed_mut<T: Pod + HasSampleFormat, const N: usize, F: PixelFormatTag>(&mut self) -> TypedImageViewMut<'_, T, N, F> {
        assert_header_matches::<T, N, F>(&self.layout, &self.semantics);
        let typed_layout = crate::layout::TypedLayout::with_stride(
            self.layout.width,
            self.layout.height,
            self.layout.stride_bytes,
        );
        TypedImageViewMut::new(self.buf, typed_layout)
    }

    pub fn as_const(&self) -> DynImageView<'_> {
        DynImageView {
            buf: self.as_bytes(),
            layout: self.layout,
            semantics: self.semantics,
        }
    }
}

impl<'a> PartialEq for DynImageView<'a> {
    fn eq(&self, other: &Self) -> bool {
        let a_empty = self.is_empty();
        let b_empty = other.is_empty();
        if a_empty || b_empty {
            return a_empty && b_empty;
        }
        if self.layout.width != other.layout.width
            || self.layout.height != other.layout.height
            || self.layout.channels != other.layout.channels
            || self.layout.bytes_per_channel != other.layout.bytes_per_channel
        {
            return false;
        }
        for y in 0..self.layout.height.0 {
            if self.byte_row(y) != other.byte_row(y) {
                return false;
            }
        }
        true
    }
}

/// Checks that `view`'s geometry matches `width`/`height`, for use by
/// writers that must not silently resize their destination.
pub fn check_shape(view: &DynImageView<'_>, width: u32, height: u32) -> Result<(), ShapeMismatch> {
    if view.width().0 != width || view.height().0 != height {
        return Err(ShapeMismatch {
            expected_width: width,
            expected_height: height,
            actual_width: view.width().0,
            actual_height: view.height().0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pixel::Y;

    #[test]
    fn dyn_view_reads_back_typed_pixels() {
        let data: [u8; 4] = [1, 2, 3, 4];
        let layout = UntypedLayout::new(PixelLength(2), PixelLength(2), 1, 1);
        let semantics = UntypedImageSemantics {
            pixel_format: PixelFormat::Y,
            sample_format: SampleFormat::UnsignedInteger,
        };
        let view = DynImageView::new(&data, layout, semantics);
        let px: Pixel<u8, 1, Y> = view.pixel(1, 1);
        assert_eq!(px.value(), 4);
    }

    #[test]
    fn empty_dyn_views_compare_equal() {
        let a_data: [u8; 0] = [];
        let b_data: [u8; 0] = [];
        let a = DynImageView::new(&a_data, UntypedLayout::new(PixelLength(0), PixelLength(3), 1, 1), UntypedImageSemantics::default());
        let b = DynImageView::new(&b_data, UntypedLayout::new(PixelLength(0), PixelLength(0), 1, 1), UntypedImageSemantics::default());
        assert_eq!(a, b);
    }

    #[test]
    fn mutable_dyn_view_round_trips() {
        let mut data = [0u8; 4];
        let layout = UntypedLayout::new(PixelLength(2), PixelLength(2), 1, 1);
        let semantics = UntypedImageSemantics {
            pixel_format: PixelFormat::Y,
            sample_format: SampleFormat::UnsignedInteger,
        };
        let mut view = DynImageViewMut::new(&mut data, layout, semantics);
        view.set_pixel(0, 0, Pixel::<u8, 1, Y>::new(42));
        assert_eq!(view.as_const().pixel::<u8, 1, Y>(0, 0).value(), 42);
    }
}
