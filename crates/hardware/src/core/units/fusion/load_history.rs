//! Unfused-Committed History for loads.
//!
//! A small fully-associative table of cacheline tags of recently committed
//! loads that have not fused yet. Every committed load is looked up:
//! a hit means the load can fuse with the older partner, which is then
//! invalidated so it fuses at most once; a miss records the load.
//!
//! Each lookup consumes a 7-bit wraparound commit number. Age is measured as
//! the wrapped distance from the current commit number, so eviction keeps
//! working across the wrap.

use crate::common::constants::COMMIT_NUM_MASK;

#[derive(Clone, Copy, Debug, Default)]
struct UchEntry {
    valid: bool,
    tag: u64,
    commit_num: u8,
}

/// Load unfused-committed history.
#[derive(Clone, Debug)]
pub struct LoadHistory {
    entries: Vec<UchEntry>,
    next_commit_num: u8,
}

impl LoadHistory {
    /// Creates an empty history of `entries` slots.
    pub fn new(entries: usize) -> Self {
        Self {
            entries: vec![UchEntry::default(); entries],
            next_commit_num: 0,
        }
    }

    /// Looks up a committed load's cacheline tag.
    ///
    /// On a hit, invalidates the partner and returns the commit distance
    /// between the two loads. On a miss, records the tag (evicting the oldest
    /// entry if full) and returns `None`.
    pub fn commit(&mut self, tag: u64) -> Option<u8> {
        let curr = self.next_commit_num;
        self.next_commit_num = curr.wrapping_add(1) & COMMIT_NUM_MASK;

        if let Some(entry) = self.entries.iter_mut().find(|e| e.valid && e.tag == tag) {
            entry.valid = false;
            return Some(Self::age(curr, entry.commit_num));
        }

        let victim = self
            .entries
            .iter()
            .position(|e| !e.valid)
            .or_else(|| {
                self.entries
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, e)| Self::age(curr, e.commit_num))
                    .map(|(i, _)| i)
            });
        if let Some(i) = victim {
            self.entries[i] = UchEntry {
                valid: true,
                tag,
                commit_num: curr,
            };
        }
        None
    }

    /// Returns `true` if `tag` is held by a valid entry.
    pub fn contains(&self, tag: u64) -> bool {
        self.entries.iter().any(|e| e.valid && e.tag == tag)
    }

    /// Number of valid entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.valid).count()
    }

    /// Returns `true` if no entry is valid.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn age(curr: u8, commit_num: u8) -> u8 {
        curr.wrapping_sub(commit_num) & COMMIT_NUM_MASK
    }
}
