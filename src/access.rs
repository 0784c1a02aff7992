//! Border access and interpolation policies.
//!
//! Policies are zero-sized marker types implementing [`BorderPolicy`] /
//! [`InterpolationPolicy`] so the algorithm layer (convolution, resample)
//! can be generic over them with no runtime dispatch cost.

use crate::pixel::{Pixel, PixelFormatTag, Promote, RoundTo};
use crate::primitives::PixelIndex;
use crate::view::TypedImageView;
use bytemuck::Pod;

/// Reads a pixel at a possibly out-of-range coordinate, per some
/// out-of-bounds convention.
pub trait BorderPolicy {
    fn get<T: Pod + Default, const N: usize, F: PixelFormatTag>(
        view: &TypedImageView<'_, T, N, F>,
        x: PixelIndex,
        y: PixelIndex,
    ) -> Pixel<T, N, F>;
}

/// Out-of-bounds access is undefined (debug-asserted, not checked in
/// release) — for hot loops that have already established the access is
/// in-bounds.
pub struct Unchecked;

impl BorderPolicy for Unchecked {
    fn get<T: Pod + Default, const N: usize, F: PixelFormatTag>(
        view: &TypedImageView<'_, T, N, F>,
        x: PixelIndex,
        y: PixelIndex,
    ) -> Pixel<T, N, F> {
        debug_assert!(x.0 >= 0 && y.0 >= 0);
        view.pixel(x.0 as u32, y.0 as u32)
    }
}

/// Out-of-bounds reads return an all-zero pixel.
pub struct ZeroPadding;

impl BorderPolicy for ZeroPadding {
    fn get<T: Pod + Default, const N: usize, F: PixelFormatTag>(
        view: &TypedImageView<'_, T, N, F>,
        x: PixelIndex,
        y: PixelIndex,
    ) -> Pixel<T, N, F> {
        if x.0 < 0 || y.0 < 0 || x.0 >= view.width().0 as i64 || y.0 >= view.height().0 as i64 {
            return Pixel::default();
        }
        view.pixel(x.0 as u32, y.0 as u32)
    }
}

/// Out-of-bounds coordinates are clamped to the nearest edge pixel.
pub struct Replicated;

impl BorderPolicy for Replicated {
    fn get<T: Pod + Default, const N: usize, F: PixelFormatTag>(
        view: &TypedImageView<'_, T, N, F>,
        x: PixelIndex,
        y: PixelIndex,
    ) -> Pixel<T, N, F> {
        let cx = x.clamp_to(view.width());
        let cy = y.clamp_to(view.height());
        view.pixel(cx.0, cy.0)
    }
}

/// Samples a view at a fractional coordinate, deferring out-of-range reads
/// to a [`BorderPolicy`].
pub trait InterpolationPolicy {
    fn sample<T, const N: usize, F: PixelFormatTag, B: BorderPolicy>(
        view: &TypedImageView<'_, T, N, F>,
        fx: f64,
        fy: f64,
    ) -> Pixel<T, N, F>
    where
        T: Pod + Default + Promote,
        <T as Promote>::Output: Into<f64>,
        f64: RoundTo<T>;
}

/// Rounds `(fx, fy)` down to the containing pixel.
pub struct NearestNeighbor;

impl InterpolationPolicy for NearestNeighbor {
    fn sample<T, const N: usize, F: PixelFormatTag, B: BorderPolicy>(
        view: &TypedImageView<'_, T, N, F>,
        fx: f64,
        fy: f64,
    ) -> Pixel<T, N, F>
    where
        T: Pod + Default + Promote,
        <T as Promote>::Output: Into<f64>,
        f64: RoundTo<T>,
    {
        B::get(view, PixelIndex(fx.floor() as i64), PixelIndex(fy.floor() as i64))
    }
}

/// Bilinear interpolation over the four neighbors of `(fx, fy)`, with the
/// weighted sum computed in the promoted element type and rounded back
/// half-away-from-zero.
pub struct Bilinear;

impl InterpolationPolicy for Bilinear {
    fn sample<T, const N: usize, F: PixelFormatTag, B: BorderPolicy>(
        view: &TypedImageView<'_, T, N, F>,
        fx: f64,
        fy: f64,
    ) -> Pixel<T, N, F>
    where
        T: Pod + Default + Promote,
        <T as Promote>::Output: Into<f64>,
        f64: RoundTo<T>,
    {
        let x0 = fx.floor();
        let y0 = fy.floor();
        let dx = fx - x0;
        let dy = fy - y0;
        let x0i = x0 as i64;
        let y0i = y0 as i64;
        let p00 = B::get(view, PixelIndex(x0i), PixelIndex(y0i));
        let p10 = B::get(view, PixelIndex(x0i + 1), PixelIndex(y0i));
        let p01 = B::get(view, PixelIndex(x0i), PixelIndex(y0i + 1));
        let p11 = B::get(view, PixelIndex(x0i + 1), PixelIndex(y0i + 1));

        let mut out = [T::default(); N];
        for c in 0..N {
            let v00: f64 = promote_to_f64(p00.channel(c));
            let v10: f64 = promote_to_f64(p10.channel(c));
            let v01: f64 = promote_to_f64(p01.channel(c));
            let v11: f64 = promote_to_f64(p11.channel(c));
            let top = (1.0 - dx) * v00 + dx * v10;
            let bot = (1.0 - dx) * v01 + dx * v11;
            let v = (1.0 - dy) * top + dy * bot;
            out[c] = v.round_to();
        }
        Pixel::from_array(out)
    }
}

fn promote_to_f64<T: Promote>(v: T) -> f64
where
    <T as Promote>::Output: Into<f64>,
{
    v.promote().into()
}

/// Wraps a view so `get(r, x, y) == get(view, x + ox, y + oy)`.
pub struct RelativeAccessor<'a, 'b, T, const N: usize, F: PixelFormatTag> {
    view: &'b TypedImageView<'a, T, N, F>,
    ox: i64,
    oy: i64,
}

impl<'a, 'b, T: Pod, const N: usize, F: PixelFormatTag> RelativeAccessor<'a, 'b, T, N, F> {
    pub fn new(view: &'b TypedImageView<'a, T, N, F>, ox: i64, oy: i64) -> Self {
        RelativeAccessor { view, ox, oy }
    }

    pub fn get<B: BorderPolicy>(&self, x: i64, y: i64) -> Pixel<T, N, F>
    where
        T: Default,
    {
        B::get(self.view, PixelIndex(x + self.ox), PixelIndex(y + self.oy))
    }
}
