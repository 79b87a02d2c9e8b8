//! Replacement policies for the fusion predictor tables.
//!
//! Each predictor table tracks way usage per set with one bit per way. A
//! victim is the first way whose bit is clear; once every way of a set has
//! been used, the set's bits are cleared and way 0 is evicted.
//!
//! # Performance
//!
//! - **Time Complexity:** `update()` O(1), `get_victim()` O(W)
//! - **Space Complexity:** one `u64` per set (at most 64 ways)

/// Trait for set-associative replacement policies.
///
/// Defines the interface for updating usage state and selecting victim ways.
pub trait ReplacementPolicy: Send + Sync {
    /// Marks `way` of `set` as used.
    fn update(&mut self, set: usize, way: usize);

    /// Selects the way of `set` to evict.
    fn get_victim(&mut self, set: usize) -> usize;
}

/// One-bit pseudo-LRU policy state.
#[derive(Clone, Debug)]
pub struct OneBitPlru {
    /// Usage bits, one per way, for each set.
    usage: Vec<u64>,
    /// Mask covering every way of a set.
    all_ways: u64,
}

impl OneBitPlru {
    /// Creates a policy for `sets` sets of `ways` ways.
    ///
    /// `ways` must be in `1..=64`; the configuration is validated upstream.
    pub fn new(sets: usize, ways: usize) -> Self {
        debug_assert!((1..=64).contains(&ways));
        Self {
            usage: vec![0; sets],
            all_ways: u64::MAX >> (64 - ways),
        }
    }

    /// Returns `true` if `way` of `set` is marked used.
    pub fn is_used(&self, set: usize, way: usize) -> bool {
        (self.usage[set] >> way) & 1 == 1
    }
}

impl ReplacementPolicy for OneBitPlru {
    fn update(&mut self, set: usize, way: usize) {
        self.usage[set] |= 1 << way;
    }

    fn get_victim(&mut self, set: usize) -> usize {
        let free = !self.usage[set] & self.all_ways;
        if free == 0 {
            self.usage[set] = 0;
            0
        } else {
            free.trailing_zeros() as usize
        }
    }
}
