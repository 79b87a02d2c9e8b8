//! Tournament Fusion Predictor.
//!
//! Predicts whether a memory op will fuse with an older partner and at what
//! distance. Two set-associative tables hold {tag, distance, confidence}
//! entries: a local table indexed by `pc mod sets` and a global table indexed
//! by `(pc xor history) mod sets`. A table of 2-bit selectors indexed by
//! `pc mod selector_entries` picks the local table below 2, the global one
//! otherwise. Each table replaces entries with a one-bit pseudo-LRU.

use super::plru::{OneBitPlru, ReplacementPolicy};
use crate::common::constants::{
    CONFIDENCE_WEAK, COUNTER_MAX, FUSION_DISTANCE_MASK, FUSION_TAG_MASK, SELECTOR_GLOBAL_THRESHOLD,
};
use crate::config::FusionConfig;

/// One way of a predictor set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FusionEntry {
    /// Entry holds a trained prediction.
    pub valid: bool,
    /// Low byte of the PC.
    pub tag: u8,
    /// Distance in micro-ops to the partner (6 bits).
    pub distance: u8,
    /// 2-bit saturating confidence.
    pub confidence: u8,
}

/// Which table a selector points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    /// Indexed by PC.
    Local,
    /// Indexed by PC xor fusion history.
    Global,
}

#[derive(Clone, Debug)]
struct FusionTable {
    entries: Vec<FusionEntry>,
    lru: OneBitPlru,
    ways: usize,
}

impl FusionTable {
    fn new(sets: usize, ways: usize) -> Self {
        Self {
            entries: vec![FusionEntry::default(); sets * ways],
            lru: OneBitPlru::new(sets, ways),
            ways,
        }
    }

    fn set(&self, set: usize) -> &[FusionEntry] {
        &self.entries[set * self.ways..(set + 1) * self.ways]
    }

    fn find(&self, set: usize, tag: u8) -> Option<usize> {
        self.set(set).iter().position(|e| e.valid && e.tag == tag)
    }
}

/// Tournament fusion predictor.
#[derive(Clone, Debug)]
pub struct FusionPredictor {
    sets: usize,
    local: FusionTable,
    global: FusionTable,
    /// 2-bit selectors; zero-initialised to prefer the local table.
    selector: Vec<u8>,
}

impl FusionPredictor {
    /// Creates an untrained predictor from the fusion configuration.
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            sets: config.sets,
            local: FusionTable::new(config.sets, config.ways),
            global: FusionTable::new(config.sets, config.ways),
            selector: vec![0; config.selector_entries],
        }
    }

    /// Predicts fusion for the op at `pc` under fusion history `history`.
    ///
    /// Returns whether to fuse and, if the PC is known to the selected
    /// table, its recorded distance. Fusion is only predicted at full
    /// confidence.
    pub fn predict(&self, pc: u64, history: u64) -> (bool, Option<u8>) {
        let kind = self.selected(pc);
        let set = self.set_index(kind, pc, history);
        let table = self.table(kind);
        match table.find(set, Self::tag(pc)) {
            Some(way) => {
                let entry = &table.set(set)[way];
                (entry.confidence == COUNTER_MAX, Some(entry.distance))
            }
            None => (false, None),
        }
    }

    /// Trains the predictor with the observed `distance`.
    ///
    /// `correct` reports whether fusion at `distance` was confirmed. The
    /// selector moves first; the entry is then trained in the table the
    /// updated selector points at.
    pub fn update(&mut self, pc: u64, history: u64, distance: u8, correct: bool) {
        let distance = distance & FUSION_DISTANCE_MASK;
        let sel_idx = self.selector_index(pc);
        let sel = &mut self.selector[sel_idx];
        *sel = if correct {
            (*sel + 1).min(COUNTER_MAX)
        } else {
            sel.saturating_sub(1)
        };

        let kind = self.selected(pc);
        let set = self.set_index(kind, pc, history);
        let tag = Self::tag(pc);
        let table = match kind {
            TableKind::Local => &mut self.local,
            TableKind::Global => &mut self.global,
        };

        let way = match table.find(set, tag) {
            Some(way) => {
                let entry = &mut table.entries[set * table.ways + way];
                if entry.distance == distance {
                    entry.confidence = if correct {
                        (entry.confidence + 1).min(COUNTER_MAX)
                    } else {
                        entry.confidence.saturating_sub(1)
                    };
                } else {
                    entry.distance = distance;
                    entry.confidence = CONFIDENCE_WEAK;
                }
                way
            }
            None => {
                let way = table.lru.get_victim(set);
                table.entries[set * table.ways + way] = FusionEntry {
                    valid: true,
                    tag,
                    distance,
                    confidence: if correct { COUNTER_MAX } else { CONFIDENCE_WEAK },
                };
                way
            }
        };
        table.lru.update(set, way);
    }

    /// Table the selector for `pc` currently points at.
    pub fn selected(&self, pc: u64) -> TableKind {
        if self.selector[self.selector_index(pc)] < SELECTOR_GLOBAL_THRESHOLD {
            TableKind::Local
        } else {
            TableKind::Global
        }
    }

    /// Current selector counter for `pc`.
    pub fn selector(&self, pc: u64) -> u8 {
        self.selector[self.selector_index(pc)]
    }

    /// The ways of one set of a table.
    pub fn entries(&self, kind: TableKind, set: usize) -> &[FusionEntry] {
        self.table(kind).set(set)
    }

    /// Set of `kind` that `pc` maps to under `history`.
    pub fn set_index(&self, kind: TableKind, pc: u64, history: u64) -> usize {
        let key = match kind {
            TableKind::Local => pc,
            TableKind::Global => pc ^ history,
        };
        (key % self.sets as u64) as usize
    }

    fn table(&self, kind: TableKind) -> &FusionTable {
        match kind {
            TableKind::Local => &self.local,
            TableKind::Global => &self.global,
        }
    }

    fn selector_index(&self, pc: u64) -> usize {
        (pc % self.selector.len() as u64) as usize
    }

    fn tag(pc: u64) -> u8 {
        (pc & FUSION_TAG_MASK) as u8
    }
}
