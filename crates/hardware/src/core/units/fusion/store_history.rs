//! Unfused-Committed History for stores.
//!
//! Single-entry counterpart of the load history: only the most recent
//! unfused store is remembered.

/// Store unfused-committed history.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreHistory {
    valid: bool,
    tag: u64,
}

impl StoreHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a committed store's cacheline tag.
    ///
    /// Returns `true` and invalidates the entry on a hit; otherwise replaces
    /// the entry with `tag`.
    pub fn commit(&mut self, tag: u64) -> bool {
        if self.contains(tag) {
            self.valid = false;
            true
        } else {
            self.valid = true;
            self.tag = tag;
            false
        }
    }

    /// Returns `true` if the entry is valid and holds `tag`.
    pub fn contains(&self, tag: u64) -> bool {
        self.valid && self.tag == tag
    }
}
