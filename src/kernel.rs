//! 1-D convolution kernels: fixed-length (`Kernel<T, K>`) and dynamic
//! (`DynKernel<T>`), with Gaussian/uniform generators and normalization.
//!
//! `DynKernel` and its generators require the `std` or `alloc` feature.

#[cfg(any(feature = "std", feature = "alloc"))]
use crate::pixel::RoundTo;

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec;
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

/// A fixed-length, odd-centered 1-D kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel<T, const K: usize> {
    values: [T; K],
}

impl<T: Copy, const K: usize> Kernel<T, K> {
    pub const fn from_array(values: [T; K]) -> Self {
        Kernel { values }
    }

    pub const fn len(&self) -> usize {
        K
    }

    pub const fn is_empty(&self) -> bool {
        K == 0
    }

    /// Offset of the first tap from the center, i.e. `-(K-1)/2`.
    pub fn half_width(&self) -> i64 {
        debug_assert!(K % 2 == 1, "centered kernels must have odd length");
        (K as i64 - 1) / 2
    }

    pub fn get(&self, i: usize) -> T {
        self.values[i]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.values.iter()
    }
}

impl<const K: usize> Kernel<f64, K> {
    /// Divides every tap by `divisor`.
    pub fn normalize_by(&mut self, divisor: f64) {
        for v in self.values.iter_mut() {
            *v /= divisor;
        }
    }

    /// Divides every tap by the sum of absolute values (the default
    /// normalization when no explicit divisor is supplied).
    pub fn normalize(&mut self) {
        let sum: f64 = self.values.iter().map(|v| v.abs()).sum();
        if sum != 0.0 {
            self.normalize_by(sum);
        }
    }
}

/// Builds a fixed-length `K`-tap Gaussian kernel sampled from `N(0, σ²)` at
/// integer offsets from the center, normalized to sum to 1.
pub fn gaussian_kernel_fixed<const K: usize>(sigma: f64) -> Kernel<f64, K> {
    debug_assert!(K % 2 == 1, "gaussian_kernel::<K> requires odd K");
    let half = (K as i64 - 1) / 2;
    let mut values = [0.0f64; K];
    for (i, v) in values.iter_mut().enumerate() {
        let x = i as i64 - half;
        *v = gaussian_pdf(x as f64, sigma);
    }
    let mut kernel = Kernel::from_array(values);
    kernel.normalize();
    kernel
}

fn gaussian_pdf(x: f64, sigma: f64) -> f64 {
    let s2 = sigma * sigma;
    (-(x * x) / (2.0 * s2)).exp() / (sigma * (2.0 * core::f64::consts::PI).sqrt())
}

/// A dynamically sized 1-D kernel, for generators whose length depends on a
/// runtime parameter (e.g. `gaussian_kernel(sigma)`'s size formula).
#[cfg(any(feature = "std", feature = "alloc"))]
#[derive(Debug, Clone, PartialEq)]
pub struct DynKernel<T> {
    values: Vec<T>,
}

#[cfg(any(feature = "std", feature = "alloc"))]
impl<T: Copy> DynKernel<T> {
    pub fn from_vec(values: Vec<T>) -> Self {
        DynKernel { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn half_width(&self) -> i64 {
        debug_assert!(self.values.len() % 2 == 1, "centered kernels must have odd length");
        (self.values.len() as i64 - 1) / 2
    }

    pub fn get(&self, i: usize) -> T {
        self.values[i]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.values.iter()
    }
}

#[cfg(any(feature = "std", feature = "alloc"))]
impl DynKernel<f64> {
    pub fn normalize_by(&mut self, divisor: f64) {
        for v in self.values.iter_mut() {
            *v /= divisor;
        }
    }

    pub fn normalize(&mut self) {
        let sum: f64 = self.values.iter().map(|v| v.abs()).sum();
        if sum != 0.0 {
            self.normalize_by(sum);
        }
    }
}

/// `2·max(1, ⌈σ·range⌉) + 1`-tap dynamic Gaussian kernel.
#[cfg(any(feature = "std", feature = "alloc"))]
pub fn gaussian_kernel(sigma: f64) -> DynKernel<f64> {
    gaussian_kernel_ranged(sigma, 3.0)
}

/// Same as [`gaussian_kernel`] but with an explicit multiple-of-sigma cutoff
/// for how far the kernel extends (3 is the common "3-sigma" default).
#[cfg(any(feature = "std", feature = "alloc"))]
pub fn gaussian_kernel_ranged(sigma: f64, range: f64) -> DynKernel<f64> {
    let half = 1i64.max((sigma * range).ceil() as i64);
    let len = (2 * half + 1) as usize;
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        let x = i as i64 - half;
        values.push(gaussian_pdf(x as f64, sigma));
    }
    let mut kernel = DynKernel::from_vec(values);
    kernel.normalize();
    kernel
}

/// A `K`-tap kernel where every element equals `1/K`.
#[cfg(any(feature = "std", feature = "alloc"))]
pub fn uniform_kernel(k: usize) -> DynKernel<f64> {
    debug_assert!(k > 0);
    DynKernel::from_vec(vec![1.0 / k as f64; k])
}

/// Quantizes a floating-point kernel into fixed-point integers: element `i`
/// becomes `round(k[i] * scale)`, where callers typically choose
/// `scale = 2^shift` to pair with a `Shift`-parameterized convolution.
#[cfg(any(feature = "std", feature = "alloc"))]
pub fn integer_kernel<Out, const SHIFT: u32>(k: &DynKernel<f64>) -> DynKernel<Out>
where
    f64: RoundTo<Out>,
    Out: Copy,
{
    let scale = (1u64 << SHIFT) as f64;
    let values = k.as_slice().iter().map(|v| (v * scale).round_to()).collect();
    DynKernel::from_vec(values)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_kernel_sums_to_one() {
        let k = uniform_kernel(5);
        let sum: f64 = k.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
        assert_eq!(k.get(0), 0.2);
    }

    #[test]
    fn gaussian_kernel_is_symmetric_and_normalized() {
        let k = gaussian_kernel(1.0);
        let sum: f64 = k.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
        let half = k.half_width() as usize;
        for i in 0..=half {
            assert_relative_eq!(k.get(half - i), k.get(half + i), epsilon = 1e-12);
        }
    }

    #[test]
    fn gaussian_kernel_sizing_matches_sigma_range_formula() {
        let k = gaussian_kernel_ranged(2.0, 3.0);
        // 2*max(1, ceil(2*3))+1 = 13
        assert_eq!(k.len(), 13);
    }

    #[test]
    fn fixed_kernel_half_width_is_centered() {
        let k = Kernel::from_array([1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(k.half_width(), 2);
    }

    #[test]
    fn integer_kernel_scales_and_rounds() {
        let gauss = gaussian_kernel(1.0);
        let int_kernel: DynKernel<i32> = integer_kernel::<i32, 8>(&gauss);
        let sum: i32 = int_kernel.iter().sum();
        // sum should be close to 2^8 = 256 after quantization.
        assert!((sum - 256).abs() <= 2);
    }

    #[test]
    fn normalize_by_divides_every_tap() {
        let mut k = Kernel::from_array([2.0, 4.0, 6.0]);
        k.normalize_by(2.0);
        assert_eq!(k.as_slice(), &[1.0, 2.0, 3.0]);
    }
}
