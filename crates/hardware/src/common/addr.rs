//! Core identifiers and address helpers.
//!
//! This module defines the small value types shared by every front-end
//! component. It provides:
//! 1. **Core Identity:** A strong type for the core a call is made on behalf of.
//! 2. **Address Arithmetic:** Line rounding and cacheline tag extraction used by
//!    fetch-target construction and the unfused-committed histories.

use std::fmt;

/// Identifier of a simulated core.
///
/// Every front-end operation takes the active core explicitly; nothing is
/// bound to an implicit "current core".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CoreId(pub usize);

impl CoreId {
    /// Creates a new core identifier.
    #[inline(always)]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw index of this core.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "core{}", self.0)
    }
}

/// Rounds `addr` down to the start of its `line_bytes`-sized line.
///
/// `line_bytes` must be a power of two.
#[inline(always)]
pub const fn line_base(addr: u64, line_bytes: u64) -> u64 {
    addr & !(line_bytes - 1)
}

/// Returns the cacheline tag of `addr`: the address with the line offset
/// bits shifted out.
///
/// `line_bytes` must be a power of two.
#[inline(always)]
pub const fn cacheline_tag(addr: u64, line_bytes: u64) -> u64 {
    addr >> line_bytes.trailing_zeros()
}

/// Returns `true` if an instruction of `size` bytes at `addr` ends at or
/// beyond the end of its `line_bytes`-sized line.
///
/// A fetch target is closed once its last instruction touches the line end.
#[inline(always)]
pub const fn reaches_line_end(addr: u64, size: u64, line_bytes: u64) -> bool {
    addr.wrapping_add(size).wrapping_sub(line_base(addr, line_bytes)) >= line_bytes
}
