//! Strongly-typed index/length/stride/byte-count newtypes.
//!
//! These exist so that a raw `i64`/`usize` cannot silently be passed where a
//! dimensionally different quantity (a pixel count vs. a byte count, say) is
//! expected.

use core::ops::{Add, Mul, Sub};

/// A signed pixel coordinate. Can be negative, e.g. for relative-accessor
/// offsets or out-of-bounds border-policy probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PixelIndex(pub i64);

/// A non-negative pixel count (width, height, or a distance in pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PixelLength(pub u32);

/// A non-negative byte distance between the start of consecutive rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrideBytes(pub usize);

/// A non-negative byte distance (not necessarily a row stride).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bytes(pub usize);

impl PixelIndex {
    pub const fn from_length(len: PixelLength) -> Self {
        PixelIndex(len.0 as i64)
    }

    /// `true` iff `0 <= self < bound`.
    pub const fn in_bounds(self, bound: PixelLength) -> bool {
        self.0 >= 0 && (self.0 as u64) < bound.0 as u64
    }

    /// Clamp to `[0, bound-1]`, per the `Replicated` border policy. `bound`
    /// must be nonzero.
    pub fn clamp_to(self, bound: PixelLength) -> PixelLength {
        debug_assert!(bound.0 > 0);
        if self.0 < 0 {
            PixelLength(0)
        } else if (self.0 as u64) >= bound.0 as u64 {
            PixelLength(bound.0 - 1)
        } else {
            PixelLength(self.0 as u32)
        }
    }
}

impl From<PixelLength> for PixelIndex {
    fn from(len: PixelLength) -> Self {
        PixelIndex::from_length(len)
    }
}

impl From<u32> for PixelLength {
    fn from(v: u32) -> Self {
        PixelLength(v)
    }
}

impl Add for PixelLength {
    type Output = PixelLength;
    fn add(self, rhs: PixelLength) -> PixelLength {
        PixelLength(self.0 + rhs.0)
    }
}

impl Sub for PixelLength {
    type Output = PixelLength;
    fn sub(self, rhs: PixelLength) -> PixelLength {
        PixelLength(self.0 - rhs.0)
    }
}

/// `PixelLength * bytes-per-pixel -> Bytes`.
impl Mul<usize> for PixelLength {
    type Output = Bytes;
    fn mul(self, bytes_per_pixel: usize) -> Bytes {
        Bytes(self.0 as usize * bytes_per_pixel)
    }
}

/// `StrideBytes * height (in rows) -> total Bytes`.
impl Mul<PixelLength> for StrideBytes {
    type Output = Bytes;
    fn mul(self, height: PixelLength) -> Bytes {
        Bytes(self.0 * height.0 as usize)
    }
}

impl Add for Bytes {
    type Output = Bytes;
    fn add(self, rhs: Bytes) -> Bytes {
        Bytes(self.0 + rhs.0)
    }
}

impl PartialEq<Bytes> for StrideBytes {
    fn eq(&self, other: &Bytes) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd<Bytes> for StrideBytes {
    fn partial_cmp(&self, other: &Bytes) -> Option<core::cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}
