//! Memory micro-op fusion unit.
//!
//! Observes memory ops as they commit and decides whether each could have
//! fused with an older unfused op on the same cacheline. It combines:
//! 1. **Unfused-Committed Histories:** Recently committed unfused loads
//!    (multi-entry) and stores (single entry).
//! 2. **Fusion Predictor:** Tournament local/global predictor trained with
//!    the observed fusion distance.
//! 3. **Fusion History:** A global register of recent load fusion outcomes
//!    that indexes the global predictor table.

/// Unfused-committed history for loads.
pub mod load_history;

/// Tournament fusion predictor.
pub mod predictor;

/// One-bit pseudo-LRU replacement policy.
pub mod plru;

/// Unfused-committed history for stores.
pub mod store_history;

use tracing::{trace, warn};

pub use self::load_history::LoadHistory;
pub use self::predictor::{FusionEntry, FusionPredictor, TableKind};
pub use self::store_history::StoreHistory;
use crate::common::{CoreId, cacheline_tag};
use crate::config::FusionConfig;
use crate::core::op::{MemType, Op};
use crate::stats::FusionStats;

/// Fusion decision for one committed memory op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FusionOutcome {
    /// Load or store.
    pub mem_type: MemType,
    /// The op matched an unfused partner on the same cacheline.
    pub fused: bool,
    /// Commit distance to the partner, for fused loads.
    pub distance: Option<u8>,
    /// The predictor's call before training, for loads.
    pub predicted: bool,
}

/// Per-core fusion unit.
#[derive(Clone, Debug)]
pub struct FusionUnit {
    core: CoreId,
    loads: LoadHistory,
    stores: StoreHistory,
    predictor: FusionPredictor,
    history: u64,
    history_mask: u64,
    cacheline_bytes: u64,
    stats: FusionStats,
}

impl FusionUnit {
    /// Creates the fusion unit of `core`.
    pub fn new(core: CoreId, config: &FusionConfig) -> Self {
        Self {
            core,
            loads: LoadHistory::new(config.load_history_entries),
            stores: StoreHistory::new(),
            predictor: FusionPredictor::new(config),
            history: 0,
            history_mask: if config.history_bits >= 64 {
                u64::MAX
            } else {
                (1 << config.history_bits) - 1
            },
            cacheline_bytes: config.cacheline_bytes,
            stats: FusionStats::default(),
        }
    }

    /// Processes a committed op.
    ///
    /// Returns `None` for ops that do not access memory or carry no
    /// address. An op with several memory addresses uses the first.
    pub fn on_commit(&mut self, op: &Op) -> Option<FusionOutcome> {
        if op.mem_type == MemType::None {
            return None;
        }
        let addr = match op.mem_addrs.as_slice() {
            [] => {
                self.stats.operand_anomalies += 1;
                warn!(
                    core = %self.core,
                    pc = format_args!("{:#x}", op.addr),
                    op_num = op.op_num,
                    "memory op without an address, treated as unfusable"
                );
                return None;
            }
            [addr] => *addr,
            [addr, ..] => {
                self.stats.operand_anomalies += 1;
                warn!(
                    core = %self.core,
                    pc = format_args!("{:#x}", op.addr),
                    op_num = op.op_num,
                    count = op.mem_addrs.len(),
                    "unexpected extra memory operands, using the first"
                );
                *addr
            }
        };
        let tag = cacheline_tag(addr, self.cacheline_bytes);

        let outcome = match op.mem_type {
            MemType::Load => self.commit_load(op.addr, tag),
            MemType::Store => {
                self.stats.store_commits += 1;
                let fused = self.stores.commit(tag);
                if fused {
                    self.stats.uch_store_hits += 1;
                }
                FusionOutcome {
                    mem_type: MemType::Store,
                    fused,
                    distance: None,
                    predicted: false,
                }
            }
            MemType::None => return None,
        };
        trace!(
            core = %self.core,
            pc = format_args!("{:#x}", op.addr),
            ?outcome,
            "fusion outcome"
        );
        Some(outcome)
    }

    fn commit_load(&mut self, pc: u64, tag: u64) -> FusionOutcome {
        self.stats.load_commits += 1;
        let (predicted, pred_distance) = self.predictor.predict(pc, self.history);
        let distance = self.loads.commit(tag);

        if predicted {
            self.stats.predicted_fused += 1;
        }
        let correct = match distance {
            Some(d) => predicted && pred_distance == Some(d),
            None => !predicted,
        };
        if correct {
            self.stats.predictions_correct += 1;
        } else {
            self.stats.predictions_incorrect += 1;
        }

        // Train on confirmed fusions and on fusions predicted but not seen.
        match (distance, pred_distance) {
            (Some(d), _) => {
                self.stats.uch_load_hits += 1;
                self.predictor.update(pc, self.history, d, true);
            }
            (None, Some(d)) if predicted => self.predictor.update(pc, self.history, d, false),
            (None, _) => {}
        }

        self.history = ((self.history << 1) | u64::from(distance.is_some())) & self.history_mask;
        FusionOutcome {
            mem_type: MemType::Load,
            fused: distance.is_some(),
            distance,
            predicted,
        }
    }

    /// Current fusion history register.
    pub const fn history(&self) -> u64 {
        self.history
    }

    /// The load history.
    pub const fn loads(&self) -> &LoadHistory {
        &self.loads
    }

    /// The store history.
    pub const fn stores(&self) -> &StoreHistory {
        &self.stores
    }

    /// The fusion predictor.
    pub const fn predictor(&self) -> &FusionPredictor {
        &self.predictor
    }

    /// Counters of this core.
    pub const fn stats(&self) -> &FusionStats {
        &self.stats
    }
}
