//! Closed-set pixel format and sample format tags.

/// Runtime tag for the semantic layout of a pixel's channels.
///
/// `Unknown` is a genuine wildcard value: comparisons against it always
/// succeed, and in conversions it is treated as taking on the role of
/// whichever operand carries a concrete format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    Unknown,
    Y,
    YA,
    RGB,
    BGR,
    RGBA,
    BGRA,
    ARGB,
    ABGR,
    YCbCr,
    CIELab,
    ICCLab,
    CMYK,
    YCCK,
}

impl PixelFormat {
    /// The number of channels this format implies, or `None` for `Unknown`
    /// (which carries no fixed arity).
    pub const fn channels(self) -> Option<u8> {
        use PixelFormat::*;
        match self {
            Unknown => None,
            Y => Some(1),
            YA => Some(2),
            RGB | BGR => Some(3),
            RGBA | BGRA | ARGB | ABGR => Some(4),
            YCbCr => Some(3),
            CIELab | ICCLab => Some(3),
            CMYK | YCCK => Some(4),
        }
    }

    pub const fn as_str(self) -> &'static str {
        use PixelFormat::*;
        match self {
            Unknown => "Unknown",
            Y => "Y",
            YA => "YA",
            RGB => "RGB",
            BGR => "BGR",
            RGBA => "RGBA",
            BGRA => "BGRA",
            ARGB => "ARGB",
            ABGR => "ABGR",
            YCbCr => "YCbCr",
            CIELab => "CIELab",
            ICCLab => "ICCLab",
            CMYK => "CMYK",
            YCCK => "YCCK",
        }
    }

    /// Equality that treats `Unknown` as matching anything.
    pub fn compatible(self, other: PixelFormat) -> bool {
        matches!(self, PixelFormat::Unknown)
            || matches!(other, PixelFormat::Unknown)
            || self == other
    }
}

impl core::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime tag for the element type's arithmetic interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SampleFormat {
    Unknown,
    UnsignedInteger,
    SignedInteger,
    FloatingPoint,
}

impl SampleFormat {
    pub fn compatible(self, other: SampleFormat) -> bool {
        matches!(self, SampleFormat::Unknown)
            || matches!(other, SampleFormat::Unknown)
            || self == other
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_is_wildcard() {
        assert!(PixelFormat::Unknown.compatible(PixelFormat::RGB));
        assert!(PixelFormat::RGB.compatible(PixelFormat::Unknown));
        assert!(!PixelFormat::RGB.compatible(PixelFormat::BGR));
        assert!(PixelFormat::RGB.compatible(PixelFormat::RGB));
    }

    #[test]
    fn channel_counts() {
        assert_eq!(PixelFormat::Y.channels(), Some(1));
        assert_eq!(PixelFormat::YA.channels(), Some(2));
        assert_eq!(PixelFormat::RGB.channels(), Some(3));
        assert_eq!(PixelFormat::RGBA.channels(), Some(4));
        assert_eq!(PixelFormat::Unknown.channels(), None);
    }
}
