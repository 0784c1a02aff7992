//! Typed and untyped image layouts.

use crate::primitives::{Bytes, PixelLength, StrideBytes};

/// Layout of a typed image: width/height in pixels plus a row stride in
/// bytes. A `stride_bytes` of `0` means "derive from width * pixel size";
/// any producer must resolve that before use via [`TypedLayout::resolved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedLayout {
    pub width: PixelLength,
    pub height: PixelLength,
    pub stride_bytes: StrideBytes,
}

impl TypedLayout {
    pub fn new(width: PixelLength, height: PixelLength) -> Self {
        TypedLayout {
            width,
            height,
            stride_bytes: StrideBytes(0),
        }
    }

    pub fn with_stride(width: PixelLength, height: PixelLength, stride_bytes: StrideBytes) -> Self {
        TypedLayout {
            width,
            height,
            stride_bytes,
        }
    }

    pub fn row_bytes(&self, pixel_size: usize) -> Bytes {
        self.width * pixel_size
    }

    /// Stride resolved to the packed minimum if it was left as `0`.
    pub fn resolved_stride(&self, pixel_size: usize) -> StrideBytes {
        let row = self.row_bytes(pixel_size);
        if self.stride_bytes.0 == 0 {
            StrideBytes(row.0)
        } else {
            StrideBytes(self.stride_bytes.0.max(row.0))
        }
    }

    pub fn total_bytes(&self, pixel_size: usize) -> Bytes {
        self.resolved_stride(pixel_size) * self.height
    }

    pub fn is_packed(&self, pixel_size: usize) -> bool {
        self.resolved_stride(pixel_size) == self.row_bytes(pixel_size)
    }
}

/// Layout of a dynamic image: width/height plus channel geometry
/// (`channels`, `bytes_per_channel`) carried as data rather than as a type
/// parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UntypedLayout {
    pub width: PixelLength,
    pub height: PixelLength,
    pub channels: u8,
    pub bytes_per_channel: u8,
    pub stride_bytes: StrideBytes,
}

impl UntypedLayout {
    pub fn new(width: PixelLength, height: PixelLength, channels: u8, bytes_per_channel: u8) -> Self {
        UntypedLayout {
            width,
            height,
            channels,
            bytes_per_channel,
            stride_bytes: StrideBytes(0),
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.channels as usize * self.bytes_per_channel as usize
    }

    pub fn row_bytes(&self) -> Bytes {
        self.width * self.bytes_per_pixel()
    }

    pub fn resolved_stride(&self) -> StrideBytes {
        let row = self.row_bytes();
        if self.stride_bytes.0 == 0 {
            StrideBytes(row.0)
        } else {
            StrideBytes(self.stride_bytes.0.max(row.0))
        }
    }

    pub fn total_bytes(&self) -> Bytes {
        self.resolved_stride() * self.height
    }

    pub fn is_packed(&self) -> bool {
        self.resolved_stride() == self.row_bytes()
    }
}

/// Pixel-format / sample-format pair attached to a dynamic image's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UntypedImageSemantics {
    pub pixel_format: crate::format::PixelFormat,
    pub sample_format: crate::format::SampleFormat,
}

impl Default for UntypedImageSemantics {
    fn default() -> Self {
        UntypedImageSemantics {
            pixel_format: crate::format::PixelFormat::Unknown,
            sample_format: crate::format::SampleFormat::Unknown,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_stride_resolves_to_packed() {
        let layout = TypedLayout::new(PixelLength(4), PixelLength(3));
        assert_eq!(layout.resolved_stride(3), StrideBytes(12));
        assert!(layout.is_packed(3));
        assert_eq!(layout.total_bytes(3), Bytes(36));
    }

    #[test]
    fn explicit_stride_is_clamped_up_to_packed_minimum() {
        let layout = TypedLayout::with_stride(PixelLength(4), PixelLength(3), StrideBytes(1));
        assert_eq!(layout.resolved_stride(3), StrideBytes(12));
        let layout2 = TypedLayout::with_stride(PixelLength(4), PixelLength(3), StrideBytes(20));
        assert_eq!(layout2.resolved_stride(3), StrideBytes(20));
        assert!(!layout2.is_packed(3));
    }

    #[test]
    fn untyped_layout_matches_typed_semantics() {
        let layout = UntypedLayout::new(PixelLength(4), PixelLength(2), 3, 1);
        assert_eq!(layout.bytes_per_pixel(), 3);
        assert_eq!(layout.row_bytes(), Bytes(12));
        assert_eq!(layout.total_bytes(), Bytes(24));
        assert!(layout.is_packed());
    }
}
