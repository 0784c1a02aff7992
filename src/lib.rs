//! Typed and dynamic image storage, pixel algebra, and a PNG codec bridge.
//!
//! - [`pixel`] / [`format`] carry the closed pixel-format set as zero-sized
//!   marker types plus the runtime [`format::PixelFormat`] counterpart.
//! - [`view`] / [`dyn_view`] are non-owning typed/dynamic views; [`owned_typed`]
//!   / [`owned_dyn`] are their owning counterparts, backed by a pluggable
//!   [`alloc_support::Allocator`].
//! - [`convert`] implements the pixel/image format conversion matrix.
//! - [`access`] provides border and interpolation policies; [`algorithms`]
//!   builds image-level operations (resample, convolution, cropping) on top
//!   of them.
//! - [`kernel`] builds 1-D convolution kernels (Gaussian, uniform, fixed-point).
//! - [`png_codec`] is the streaming PNG decode/encode bridge (requires the
//!   `png-codec` feature).
//!
//! Can be compiled without standard library support (`no_std` + `alloc`); the
//! PNG codec bridge requires `std`.
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate core as std;

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod access;
pub mod algorithms;
#[cfg(any(feature = "std", feature = "alloc"))]
pub mod alloc_support;
pub mod convert;
pub mod dyn_view;
pub mod error;
pub mod format;
pub mod kernel;
pub mod layout;
pub mod mutability;
#[cfg(any(feature = "std", feature = "alloc"))]
pub mod owned_dyn;
#[cfg(any(feature = "std", feature = "alloc"))]
pub mod owned_typed;
pub mod pixel;
pub mod primitives;
pub mod view;

#[cfg(feature = "png-codec")]
pub mod png_codec;

pub use access::{BorderPolicy, InterpolationPolicy};
#[cfg(any(feature = "std", feature = "alloc"))]
pub use alloc_support::{Allocator, Block, DefaultAllocator};
pub use dyn_view::{DynImageView, DynImageViewMut};
pub use error::{AllocError, CannotReallocateView, ShapeMismatch};
pub use format::{PixelFormat, SampleFormat};
#[cfg(any(feature = "std", feature = "alloc"))]
pub use kernel::DynKernel;
pub use kernel::Kernel;
pub use layout::{TypedLayout, UntypedImageSemantics, UntypedLayout};
#[cfg(any(feature = "std", feature = "alloc"))]
pub use owned_dyn::DynImage;
#[cfg(any(feature = "std", feature = "alloc"))]
pub use owned_typed::TypedImage;
pub use pixel::{Abgr, Argb, Bgr, Bgra, Pixel, PixelFormatTag, Rgb, Rgba, Unknown, Y, Ya};
pub use view::{TypedImageView, TypedImageViewMut};

#[cfg(feature = "png-codec")]
pub use error::{DecodeError, EncodeError};
#[cfg(feature = "png-codec")]
pub use png_codec::{CompressionOptions, DecompressionOptions, OutputImageInfo, PngReader, PngWriter};
