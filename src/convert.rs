//! Pixel- and image-level color-format conversion.
//!
//! Conversions are dispatched on the source/destination format tags'
//! `FORMAT` associated constants. Because those constants are known at
//! monomorphization time, the compiler folds the dispatch away per
//! `(Src, Dst)` instantiation even though the source reads as a single
//! runtime `match`.

use crate::dyn_view::{DynImageView, DynImageViewMut};
use crate::error::ShapeMismatch;
use crate::format::PixelFormat;
use crate::pixel::{Pixel, PixelFormatTag};

/// Computes luma from RGB-like channels in the element's own numeric domain.
///
/// Integer element types use a fixed-point approximation (weights scaled by
/// 2^16, rounded, shifted back down) to avoid floating-point; floating
/// element types compute directly.
pub trait LumaCompute: Copy {
    fn luma(r: Self, g: Self, b: Self) -> Self;
}

macro_rules! impl_luma_integer {
    ($t:ty) => {
        impl LumaCompute for $t {
            fn luma(r: Self, g: Self, b: Self) -> Self {
                const WR: i64 = 19595; // 0.299 * 65536, rounded
                const WG: i64 = 38470; // 0.587 * 65536, rounded
                const WB: i64 = 7471; // 0.114 * 65536, rounded
                let acc = WR * r as i64 + WG * g as i64 + WB * b as i64;
                let rounded = (acc + (1 << 15)) >> 16;
                rounded as $t
            }
        }
    };
}

impl_luma_integer!(u8);
impl_luma_integer!(u16);
impl_luma_integer!(i8);
impl_luma_integer!(i16);
impl_luma_integer!(i32);

macro_rules! impl_luma_float {
    ($t:ty) => {
        impl LumaCompute for $t {
            fn luma(r: Self, g: Self, b: Self) -> Self {
                const WR: $t = 0.299;
                const WG: $t = 0.587;
                const WB: $t = 0.114;
                WR * r + WG * g + WB * b
            }
        }
    };
}

impl_luma_float!(f32);
impl_luma_float!(f64);

/// Source channels decomposed into a canonical (optionally-present alpha,
/// R, G, B) form, regardless of how `Src` ordered or merged them.
struct Decomposed<T> {
    r: T,
    g: T,
    b: T,
    alpha: Option<T>,
}

fn decompose<T: Copy, const N: usize, Src: PixelFormatTag>(px: &Pixel<T, N, Src>) -> Decomposed<T> {
    match Src::FORMAT {
        PixelFormat::Y => Decomposed {
            r: px.channel(0),
            g: px.channel(0),
            b: px.channel(0),
            alpha: None,
        },
        PixelFormat::YA => Decomposed {
            r: px.channel(0),
            g: px.channel(0),
            b: px.channel(0),
            alpha: Some(px.channel(1)),
        },
        PixelFormat::RGB => Decomposed {
            r: px.channel(0),
            g: px.channel(1),
            b: px.channel(2),
            alpha: None,
        },
        PixelFormat::BGR => Decomposed {
            r: px.channel(2),
            g: px.channel(1),
            b: px.channel(0),
            alpha: None,
        },
        PixelFormat::RGBA => Decomposed {
            r: px.channel(0),
            g: px.channel(1),
            b: px.channel(2),
            alpha: Some(px.channel(3)),
        },
        PixelFormat::BGRA => Decomposed {
            r: px.channel(2),
            g: px.channel(1),
            b: px.channel(0),
            alpha: Some(px.channel(3)),
        },
        PixelFormat::ARGB => Decomposed {
            r: px.channel(1),
            g: px.channel(2),
            b: px.channel(3),
            alpha: Some(px.channel(0)),
        },
        PixelFormat::ABGR => Decomposed {
            r: px.channel(3),
            g: px.channel(2),
            b: px.channel(1),
            alpha: Some(px.channel(0)),
        },
        other => unreachable!("convert_pixel does not support source format {other:?}"),
    }
}

fn compose<T: Copy + Default + LumaCompute, const M: usize, Dst: PixelFormatTag>(d: Decomposed<T>, explicit_alpha: Option<T>) -> Pixel<T, M, Dst> {
    let alpha = d.alpha.or(explicit_alpha);
    let need_alpha = || alpha.expect("destination format requires an alpha value; call convert_pixel_with_alpha");
    let mut out = [T::default(); M];
    match Dst::FORMAT {
        PixelFormat::Y => {
            debug_assert_eq!(M, 1);
            out[0] = T::luma(d.r, d.g, d.b);
        }
        PixelFormat::YA => {
            debug_assert_eq!(M, 2);
            out[0] = T::luma(d.r, d.g, d.b);
            out[1] = need_alpha();
        }
        PixelFormat::RGB => {
            debug_assert_eq!(M, 3);
            out[0] = d.r;
            out[1] = d.g;
            out[2] = d.b;
        }
        PixelFormat::BGR => {
            debug_assert_eq!(M, 3);
            out[0] = d.b;
            out[1] = d.g;
            out[2] = d.r;
        }
        PixelFormat::RGBA => {
            debug_assert_eq!(M, 4);
            out[0] = d.r;
            out[1] = d.g;
            out[2] = d.b;
            out[3] = need_alpha();
        }
        PixelFormat::BGRA => {
            debug_assert_eq!(M, 4);
            out[0] = d.b;
            out[1] = d.g;
            out[2] = d.r;
            out[3] = need_alpha();
        }
        PixelFormat::ARGB => {
            debug_assert_eq!(M, 4);
            out[0] = need_alpha();
            out[1] = d.r;
            out[2] = d.g;
            out[3] = d.b;
        }
        PixelFormat::ABGR => {
            debug_assert_eq!(M, 4);
            out[0] = need_alpha();
            out[1] = d.b;
            out[2] = d.g;
            out[3] = d.r;
        }
        other => unreachable!("convert_pixel does not support destination format {other:?}"),
    }
    Pixel::from_array(out)
}

/// Converts `px` to pixel format `Dst`. Panics (debug-checked) if `Dst`
/// requires an alpha channel the source doesn't carry — use
/// [`convert_pixel_with_alpha`] for those conversions.
pub fn convert_pixel<T, const N: usize, const M: usize, Src, Dst>(px: Pixel<T, N, Src>) -> Pixel<T, M, Dst>
where
    T: Copy + Default + LumaCompute,
    Src: PixelFormatTag,
    Dst: PixelFormatTag,
{
    compose(decompose(&px), None)
}

/// Converts `px` to pixel format `Dst`, supplying `alpha` for conversions
/// that add an alpha channel the source did not have.
pub fn convert_pixel_with_alpha<T, const N: usize, const M: usize, Src, Dst>(px: Pixel<T, N, Src>, alpha: T) -> Pixel<T, M, Dst>
where
    T: Copy + Default + LumaCompute,
    Src: PixelFormatTag,
    Dst: PixelFormatTag,
{
    compose(decompose(&px), Some(alpha))
}

/// Image-level conversion writing pixel-wise into a caller-provided
/// destination whose shape must already match.
pub fn convert_image_into<T, const N: usize, const M: usize, Src, Dst>(
    src: &crate::view::TypedImageView<'_, T, N, Src>,
    dst: &mut crate::view::TypedImageViewMut<'_, T, M, Dst>,
) -> Result<(), ShapeMismatch>
where
    T: bytemuck::Pod + Default + LumaCompute,
    Src: PixelFormatTag,
    Dst: PixelFormatTag,
{
    if src.width() != dst.width() || src.height() != dst.height() {
        return Err(ShapeMismatch {
            expected_width: dst.width().0,
            expected_height: dst.height().0,
            actual_width: src.width().0,
            actual_height: src.height().0,
        });
    }
    for y in 0..src.height().0 {
        for x in 0..src.width().0 {
            let px = src.pixel(x, y);
            dst.set_pixel(x, y, convert_pixel::<T, N, M, Src, Dst>(px));
        }
    }
    Ok(())
}

/// Runtime (`DynImageView`) counterpart of [`convert_pixel`], used by the
/// PNG bridge where the target format is only known at decode time.
pub fn convert_dyn_image_into(src: &DynImageView<'_>, dst: &mut DynImageViewMut<'_>) -> Result<(), ShapeMismatch> {
    crate::dyn_view::check_shape(src, dst.width().0, dst.height().0)?;
    debug_assert_eq!(src.layout().bytes_per_channel, dst.layout().bytes_per_channel);
    let bpc = src.layout().bytes_per_channel as usize;
    let src_channels = src.layout().channels as usize;
    let dst_channels = dst.layout().channels as usize;
    let src_fmt = src.pixel_format();
    let dst_fmt = dst.semantics().pixel_format;
    for y in 0..src.height().0 {
        let in_row = src.byte_row(y).to_vec();
        let out_row = dst.byte_row_mut(y);
        for x in 0..in_row.len() / (src_channels * bpc) {
            let src_px = &in_row[x * src_channels * bpc..(x + 1) * src_channels * bpc];
            let out_px = &mut out_row[x * dst_channels * bpc..(x + 1) * dst_channels * bpc];
            convert_raw_pixel_bytes(src_px, src_fmt, out_px, dst_fmt, bpc);
        }
    }
    Ok(())
}

fn convert_raw_pixel_bytes(src: &[u8], src_fmt: PixelFormat, dst: &mut [u8], dst_fmt: PixelFormat, bpc: usize) {
    // Only the byte-sized element case is supported at this layer; wider
    // element types go through the typed `convert_image_into` path, which
    // knows T statically.
    debug_assert_eq!(bpc, 1, "dynamic byte-level conversion only supports 1-byte elements");
    let d = match src_fmt {
        PixelFormat::Y => Decomposed { r: src[0], g: src[0], b: src[0], alpha: None },
        PixelFormat::YA => Decomposed { r: src[0], g: src[0], b: src[0], alpha: Some(src[1]) },
        PixelFormat::RGB => Decomposed { r: src[0], g: src[1], b: src[2], alpha: None },
        PixelFormat::BGR => Decomposed { r: src[2], g: src[1], b: src[0], alpha: None },
        PixelFormat::RGBA => Decomposed { r: src[0], g: src[1], b: src[2], alpha: Some(src[3]) },
        PixelFormat::BGRA => Decomposed { r: src[2], g: src[1], b: src[0], alpha: Some(src[3]) },
        PixelFormat::ARGB => Decomposed { r: src[1], g: src[2], b: src[3], alpha: Some(src[0]) },
        PixelFormat::ABGR => Decomposed { r: src[3], g: src[2], b: src[1], alpha: Some(src[0]) },
        other => unreachable!("unsupported source format {other:?}"),
    };
    let need_alpha = || d.alpha.unwrap_or(0);
    match dst_fmt {
        PixelFormat::Y => dst[0] = u8::luma(d.r, d.g, d.b),
        PixelFormat::YA => {
            dst[0] = u8::luma(d.r, d.g, d.b);
            dst[1] = need_alpha();
        }
        PixelFormat::RGB => {
            dst[0] = d.r;
            dst[1] = d.g;
            dst[2] = d.b;
        }
        PixelFormat::BGR => {
            dst[0] = d.b;
            dst[1] = d.g;
            dst[2] = d.r;
        }
        PixelFormat::RGBA => {
            dst[0] = d.r;
            dst[1] = d.g;
            dst[2] = d.b;
            dst[3] = need_alpha();
        }
        PixelFormat::BGRA => {
            dst[0] = d.b;
            dst[1] = d.g;
            dst[2] = d.r;
            dst[3] = need_alpha();
        }
        PixelFormat::ARGB => {
            dst[0] = need_alpha();
            dst[1] = d.r;
            dst[2] = d.g;
            dst[3] = d.b;
        }
        PixelFormat::ABGR => {
            dst[0] = need_alpha();
            dst[1] = d.b;
            dst[2] = d.g;
            dst[3] = d.r;
        }
        other => unreachable!("unsupported destination format {other:?}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layout::TypedLayout;
    use crate::pixel::{Argb, Bgr, Rgb, Rgba, Y};
    use crate::primitives::PixelLength;
    use crate::view::{TypedImageView, TypedImageViewMut};

    #[test]
    fn rgb_to_bgr_swaps_channels() {
        let px = Pixel::<u8, 3, Rgb>::new(10, 20, 30);
        let out: Pixel<u8, 3, Bgr> = convert_pixel(px);
        assert_eq!(out.as_slice(), &[30, 20, 10]);
    }

    #[test]
    fn rgb_to_y_matches_fixed_coefficients() {
        let px = Pixel::<u8, 3, Rgb>::new(100, 150, 200);
        let out: Pixel<u8, 1, Y> = convert_pixel(px);
        // 0.299*100 + 0.587*150 + 0.114*200 = 29.9+88.05+22.8 = 140.75 -> 141
        assert_eq!(out.value(), 141);
    }

    #[test]
    fn y_to_rgb_replicates_luma() {
        let px = Pixel::<u8, 1, Y>::new(77);
        let out: Pixel<u8, 3, Rgb> = convert_pixel(px);
        assert_eq!(out.as_slice(), &[77, 77, 77]);
    }

    #[test]
    fn gray_to_rgba_requires_explicit_alpha() {
        let px = Pixel::<u8, 1, Y>::new(9);
        let out: Pixel<u8, 4, Rgba> = convert_pixel_with_alpha(px, 255);
        assert_eq!(out.as_slice(), &[9, 9, 9, 255]);
    }

    #[test]
    fn argb_to_rgba_rotates_without_losing_alpha() {
        let px = Pixel::<u8, 4, Argb>::new(255, 1, 2, 3);
        let out: Pixel<u8, 4, Rgba> = convert_pixel(px);
        assert_eq!(out.as_slice(), &[1, 2, 3, 255]);
    }

    #[test]
    fn gray_luma_round_trip_is_exact() {
        let px = Pixel::<u8, 1, Y>::new(200);
        let out: Pixel<u8, 1, Y> = convert_pixel(px);
        assert_eq!(out.value(), 200);
    }

    #[test]
    fn image_level_conversion_writes_every_pixel() {
        let src_data: [u8; 12] = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120];
        let src_layout = TypedLayout::new(PixelLength(2), PixelLength(2));
        let src_view = TypedImageView::<u8, 3, Rgb>::new(&src_data, src_layout);
        let mut dst_data = [0u8; 4];
        let dst_layout = TypedLayout::new(PixelLength(2), PixelLength(2));
        let mut dst_view = TypedImageViewMut::<u8, 1, Y>::new(&mut dst_data, dst_layout);
        convert_image_into(&src_view, &mut dst_view).unwrap();
        assert_eq!(dst_view.as_const().pixel(0, 0).as_slice()[0], u8::luma(10, 20, 30));
    }
}
