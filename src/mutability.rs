//! Compile-time modifiability tag.
//!
//! Rust has no implicit user-defined conversions, so "a mutable view is
//! usable wherever a read-only view is expected" is modeled with an explicit
//! `.as_const()` method rather than a `From`/`Into` coercion that would fire
//! unexpectedly.

mod sealed {
    pub trait Sealed {}
}

/// Compile-time tag distinguishing read-only from read-write views.
pub trait Mutability: sealed::Sealed + Copy + Clone + core::fmt::Debug + 'static {
    const IS_MUTABLE: bool;
}

/// Read-write access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mut;

/// Read-only access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Const;

impl sealed::Sealed for Mut {}
impl sealed::Sealed for Const {}

impl Mutability for Mut {
    const IS_MUTABLE: bool = true;
}

impl Mutability for Const {
    const IS_MUTABLE: bool = false;
}
