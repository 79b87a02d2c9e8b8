//! FTQ iterators.
//!
//! An iterator is a logical read cursor into the flattened op stream of the
//! closed fetch targets in the FTQ. Several iterators may observe the same
//! queue independently of the drain consumer (e.g. an instruction prefetcher
//! running ahead of fetch).

use std::fmt;

/// Identifier of an iterator registered on one core's FTQ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IterId(pub usize);

impl fmt::Display for IterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iter{}", self.0)
    }
}

/// Position of an iterator.
///
/// `ft_pos` and `flattened_op_pos` are relative to the current FTQ head:
/// advancing increments them, the drain consumer dequeuing the head FT
/// decrements them, and a recovery resets them to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FtqIter {
    /// Fetch target index from the FTQ head.
    pub ft_pos: usize,
    /// Op index within that fetch target.
    pub op_pos: usize,
    /// Op index in the flattened stream from the FTQ head.
    pub flattened_op_pos: usize,
}

impl FtqIter {
    /// Returns `true` if the iterator sits at the very start of the queue.
    #[inline]
    pub const fn is_at_origin(&self) -> bool {
        self.ft_pos == 0 && self.op_pos == 0 && self.flattened_op_pos == 0
    }

    /// Moves the iterator back to the start of the queue.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
