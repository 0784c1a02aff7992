//! Whole-image algorithms built on top of [`crate::view`] and
//! [`crate::access`]: pixel-wise traversal, cropping, resampling, and 1-D
//! separable convolution.

use crate::access::{BorderPolicy, InterpolationPolicy};
#[cfg(any(feature = "std", feature = "alloc"))]
use crate::access::RelativeAccessor;
use crate::error::ShapeMismatch;
#[cfg(any(feature = "std", feature = "alloc"))]
use crate::kernel::DynKernel;
use crate::pixel::{Pixel, PixelFormatTag, Promote, RoundTo};
use crate::view::{TypedImageView, TypedImageViewMut};
use bytemuck::Pod;

/// Calls `f(x, y, pixel)` for every pixel in row-major order.
pub fn for_each_pixel<T: Pod, const N: usize, F: PixelFormatTag>(view: &TypedImageView<'_, T, N, F>, mut f: impl FnMut(u32, u32, Pixel<T, N, F>)) {
    for row in view.rows() {
        let y = row.index();
        for (x, px) in row.pixels().enumerate() {
            f(x as u32, y, px);
        }
    }
}

/// Writes `dst[x, y] = f(x, y, src[x, y])` for every pixel. Fails if `src`
/// and `dst` differ in shape.
pub fn transform_pixels<T: Pod, const N: usize, F: PixelFormatTag>(
    src: &TypedImageView<'_, T, N, F>,
    dst: &mut TypedImageViewMut<'_, T, N, F>,
    mut f: impl FnMut(u32, u32, Pixel<T, N, F>) -> Pixel<T, N, F>,
) -> Result<(), ShapeMismatch> {
    if src.width() != dst.width() || src.height() != dst.height() {
        return Err(ShapeMismatch {
            expected_width: dst.width().0,
            expected_height: dst.height().0,
            actual_width: src.width().0,
            actual_height: src.height().0,
        });
    }
    let (w, h) = (src.width().0, src.height().0);
    for y in 0..h {
        for x in 0..w {
            let out = f(x, y, src.pixel(x, y));
            dst.set_pixel(x, y, out);
        }
    }
    Ok(())
}

/// Copies every pixel of `src` into `dst`, which must already have matching
/// dimensions (use [`crate::owned_typed::TypedImage::copy_from_view`] to
/// allocate-and-copy instead).
pub fn clone_into<T: Pod, const N: usize, F: PixelFormatTag>(
    src: &TypedImageView<'_, T, N, F>,
    dst: &mut TypedImageViewMut<'_, T, N, F>,
) -> Result<(), ShapeMismatch> {
    transform_pixels(src, dst, |_, _, px| px)
}

/// A read-only sub-region of `src` starting at `(x, y)`.
pub fn clone_region<'a, T: Pod, const N: usize, F: PixelFormatTag>(
    src: &TypedImageView<'a, T, N, F>,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> TypedImageView<'a, T, N, F> {
    src.crop(x, y, width, height)
}

/// Structural equality: same shape and, pixel for pixel, the same values.
/// Two empty images are equal regardless of nominal shape.
pub fn images_equal<T: Pod + PartialEq, const N: usize, F: PixelFormatTag>(a: &TypedImageView<'_, T, N, F>, b: &TypedImageView<'_, T, N, F>) -> bool {
    a == b
}

/// Writes into `dst` the image obtained by resampling `src` with
/// interpolation policy `Interp` and border policy `Border`, mapping `dst`'s
/// `(x, y)` onto source coordinate `(x * src_w / dst_w, y * src_h / dst_h)`.
pub fn resample<Interp: InterpolationPolicy, Border: BorderPolicy, T, const N: usize, F: PixelFormatTag>(
    src: &TypedImageView<'_, T, N, F>,
    dst: &mut TypedImageViewMut<'_, T, N, F>,
) where
    T: Pod + Default + Promote,
    <T as Promote>::Output: Into<f64>,
    f64: RoundTo<T>,
{
    let (sw, sh) = (src.width().0 as f64, src.height().0 as f64);
    let (dw, dh) = (dst.width().0, dst.height().0);
    if dw == 0 || dh == 0 {
        return;
    }
    let scale_x = sw / dw as f64;
    let scale_y = sh / dh as f64;
    for dy in 0..dh {
        for dx in 0..dw {
            let fx = dx as f64 * scale_x;
            let fy = dy as f64 * scale_y;
            let px = Interp::sample::<T, N, F, Border>(src, fx, fy);
            dst.set_pixel(dx, dy, px);
        }
    }
}

/// Horizontal 1-D convolution of `src` against `kernel`, writing the result
/// into `dst`. The accumulator is computed in `i64` and shifted right by
/// `SHIFT` bits before narrowing back to `T`; pair with
/// [`crate::kernel::integer_kernel`]'s `scale = 2^SHIFT` convention.
#[cfg(any(feature = "std", feature = "alloc"))]
pub fn convolution_x<Border: BorderPolicy, const SHIFT: u32, const N: usize, F: PixelFormatTag>(
    src: &TypedImageView<'_, i32, N, F>,
    dst: &mut TypedImageViewMut<'_, i32, N, F>,
    kernel: &DynKernel<i64>,
) -> Result<(), ShapeMismatch> {
    if src.width() != dst.width() || src.height() != dst.height() {
        return Err(ShapeMismatch {
            expected_width: dst.width().0,
            expected_height: dst.height().0,
            actual_width: src.width().0,
            actual_height: src.height().0,
        });
    }
    let half = kernel.half_width();
    let (w, h) = (src.width().0, src.height().0);
    for y in 0..h {
        let accessor = RelativeAccessor::new(src, 0, 0);
        for x in 0..w {
            let mut acc = [0i64; N];
            for (i, tap) in kernel.iter().enumerate() {
                let ox = i as i64 - half;
                let px = accessor.get::<Border>(x as i64 + ox, y as i64);
                for c in 0..N {
                    acc[c] += px.channel(c) as i64 * tap;
                }
            }
            let mut out = [0i32; N];
            for c in 0..N {
                out[c] = (acc[c] >> SHIFT) as i32;
            }
            dst.set_pixel(x, y, Pixel::from_array(out));
        }
    }
    Ok(())
}

/// The vertical counterpart of [`convolution_x`].
#[cfg(any(feature = "std", feature = "alloc"))]
pub fn convolution_y<Border: BorderPolicy, const SHIFT: u32, const N: usize, F: PixelFormatTag>(
    src: &TypedImageView<'_, i32, N, F>,
    dst: &mut TypedImageViewMut<'_, i32, N, F>,
    kernel: &DynKernel<i64>,
) -> Result<(), ShapeMismatch> {
    if src.width() != dst.width() || src.height() != dst.height() {
        return Err(ShapeMismatch {
            expected_width: dst.width().0,
            expected_height: dst.height().0,
            actual_width: src.width().0,
            actual_height: src.height().0,
        });
    }
    let half = kernel.half_width();
    let (w, h) = (src.width().0, src.height().0);
    for y in 0..h {
        for x in 0..w {
            let accessor = RelativeAccessor::new(src, 0, 0);
            let mut acc = [0i64; N];
            for (i, tap) in kernel.iter().enumerate() {
                let oy = i as i64 - half;
                let px = accessor.get::<Border>(x as i64, y as i64 + oy);
                for c in 0..N {
                    acc[c] += px.channel(c) as i64 * tap;
                }
            }
            let mut out = [0i32; N];
            for c in 0..N {
                out[c] = (acc[c] >> SHIFT) as i32;
            }
            dst.set_pixel(x, y, Pixel::from_array(out));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::access::{Bilinear, NearestNeighbor, Replicated, ZeroPadding};
    use crate::kernel::{gaussian_kernel, integer_kernel};
    use crate::layout::TypedLayout;
    use crate::pixel::Y;
    use crate::primitives::PixelLength;

    #[test]
    fn for_each_pixel_visits_in_row_major_order() {
        let data: [u8; 4] = [1, 2, 3, 4];
        let layout = TypedLayout::new(PixelLength(2), PixelLength(2));
        let view = TypedImageView::<u8, 1, Y>::new(&data, layout);
        let mut seen = vec![];
        for_each_pixel(&view, |x, y, px| seen.push((x, y, px.value())));
        assert_eq!(seen, vec![(0, 0, 1), (1, 0, 2), (0, 1, 3), (1, 1, 4)]);
    }

    #[test]
    fn transform_pixels_applies_function_elementwise() {
        let data: [u8; 4] = [1, 2, 3, 4];
        let mut out = [0u8; 4];
        let layout = TypedLayout::new(PixelLength(2), PixelLength(2));
        let src = TypedImageView::<u8, 1, Y>::new(&data, layout);
        let mut dst = TypedImageViewMut::<u8, 1, Y>::new(&mut out, layout);
        transform_pixels(&src, &mut dst, |_, _, px| Pixel::<u8, 1, Y>::new(px.value() * 10)).unwrap();
        assert_eq!(out, [10, 20, 30, 40]);
    }

    #[test]
    fn clone_region_extracts_subrect() {
        let data: [u8; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        let layout = TypedLayout::new(PixelLength(3), PixelLength(3));
        let view = TypedImageView::<u8, 1, Y>::new(&data, layout);
        let region = clone_region(&view, 1, 1, 2, 2);
        assert_eq!(region.pixel(0, 0).value(), 5);
        assert_eq!(region.pixel(1, 1).value(), 9);
    }

    #[test]
    fn images_equal_checks_shape_and_content() {
        let data: [u8; 4] = [1, 2, 3, 4];
        let layout = TypedLayout::new(PixelLength(2), PixelLength(2));
        let a = TypedImageView::<u8, 1, Y>::new(&data, layout);
        let b = TypedImageView::<u8, 1, Y>::new(&data, layout);
        assert!(images_equal(&a, &b));
        let other: [u8; 4] = [1, 2, 3, 5];
        let c = TypedImageView::<u8, 1, Y>::new(&other, layout);
        assert!(!images_equal(&a, &c));
    }

    #[test]
    fn resample_upscales_with_nearest_neighbor() {
        let data: [u8; 4] = [10, 20, 30, 40];
        let src_layout = TypedLayout::new(PixelLength(2), PixelLength(2));
        let src = TypedImageView::<u8, 1, Y>::new(&data, src_layout);
        let mut out = [0u8; 16];
        let dst_layout = TypedLayout::new(PixelLength(4), PixelLength(4));
        let mut dst = TypedImageViewMut::<u8, 1, Y>::new(&mut out, dst_layout);
        resample::<NearestNeighbor, Replicated, _, 1, Y>(&src, &mut dst);
        assert_eq!(dst.as_const().pixel(0, 0).value(), 10);
        assert_eq!(dst.as_const().pixel(3, 3).value(), 40);
    }

    #[test]
    fn resample_bilinear_upscale_matches_unshifted_source_coordinates() {
        let data: [u8; 9] = [10, 20, 30, 10, 20, 30, 10, 20, 30];
        let src_layout = TypedLayout::new(PixelLength(3), PixelLength(3));
        let src = TypedImageView::<u8, 1, Y>::new(&data, src_layout);
        let mut out = [0u8; 36];
        let dst_layout = TypedLayout::new(PixelLength(6), PixelLength(6));
        let mut dst = TypedImageViewMut::<u8, 1, Y>::new(&mut out, dst_layout);
        resample::<Bilinear, Replicated, _, 1, Y>(&src, &mut dst);
        let row0: Vec<u8> = (0..6).map(|x| dst.as_const().pixel(x, 0).value()).collect();
        assert_eq!(row0, vec![10, 15, 20, 25, 30, 30]);
    }

    #[test]
    fn convolution_x_applies_uniform_blur() {
        let data: [i32; 5] = [0, 0, 100, 0, 0];
        let layout = TypedLayout::new(PixelLength(5), PixelLength(1));
        let src = TypedImageView::<i32, 1, Y>::new(bytemuck::cast_slice(&data), layout);
        let mut out = [0i32; 5];
        let mut dst = TypedImageViewMut::<i32, 1, Y>::new(bytemuck::cast_slice_mut(&mut out), layout);
        let k = gaussian_kernel(1.0);
        let ik: DynKernel<i64> = integer_kernel::<i64, 16>(&k);
        convolution_x::<ZeroPadding, 16, 1, Y>(&src, &mut dst, &ik).unwrap();
        // center of mass is preserved: the blurred peak still sits at x=2.
        let peak_idx = out.iter().enumerate().max_by_key(|(_, v)| **v).unwrap().0;
        assert_eq!(peak_idx, 2);
        assert!(out[2] > 0 && out[2] < 100);
    }

    #[test]
    fn convolution_y_matches_convolution_x_transposed() {
        let data: [i32; 3] = [0, 100, 0];
        let layout = TypedLayout::new(PixelLength(1), PixelLength(3));
        let src = TypedImageView::<i32, 1, Y>::new(bytemuck::cast_slice(&data), layout);
        let mut out = [0i32; 3];
        let mut dst = TypedImageViewMut::<i32, 1, Y>::new(bytemuck::cast_slice_mut(&mut out), layout);
        let k = DynKernel::from_vec(vec![1i64 << 14, 1i64 << 15, 1i64 << 14]);
        convolution_y::<ZeroPadding, 16, 1, Y>(&src, &mut dst, &k).unwrap();
        assert_eq!(out[1], 50);
    }
}
