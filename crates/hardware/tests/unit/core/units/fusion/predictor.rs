//! # Fusion Predictor Tests
//!
//! Selector movement, confidence training, distance replacement and
//! pseudo-LRU eviction of the tournament fusion predictor.

use fdip_core::config::FusionConfig;
use fdip_core::core::units::fusion::plru::{OneBitPlru, ReplacementPolicy};
use fdip_core::core::units::fusion::{FusionEntry, FusionPredictor, TableKind};
use pretty_assertions::assert_eq;

fn predictor(sets: usize, ways: usize) -> FusionPredictor {
    FusionPredictor::new(&FusionConfig {
        sets,
        ways,
        selector_entries: 16,
        ..FusionConfig::default()
    })
}

const PC: u64 = 0x4A4;
const HIST: u64 = 0x5;

// ══════════════════════════════════════════════════════════
// 1. Prediction and training
// ══════════════════════════════════════════════════════════

#[test]
fn test_untrained_predicts_no_fusion() {
    let p = predictor(4, 2);
    assert_eq!(p.predict(PC, HIST), (false, None));
    assert_eq!(p.selected(PC), TableKind::Local);
    assert_eq!(p.selector(PC), 0);
}

/// A confirmed fusion installs a confident entry in the selected table.
#[test]
fn test_confirmed_fusion_predicts_fused() {
    let mut p = predictor(4, 2);
    p.update(PC, HIST, 3, true);

    assert_eq!(p.selector(PC), 1);
    assert_eq!(p.predict(PC, HIST), (true, Some(3)));

    let set = p.set_index(TableKind::Local, PC, HIST);
    assert_eq!(set, 0);
    assert_eq!(p.entries(TableKind::Local, set)[0], FusionEntry {
        valid: true,
        tag: 0xA4,
        distance: 3,
        confidence: 3,
    });
}

/// The selector moves before training, so the second confirmation lands in
/// the global table.
#[test]
fn test_selector_switches_to_global() {
    let mut p = predictor(4, 2);
    p.update(PC, HIST, 3, true);
    p.update(PC, HIST, 3, true);
    assert_eq!(p.selected(PC), TableKind::Global);

    let set = p.set_index(TableKind::Global, PC, HIST);
    assert_eq!(set, ((PC ^ HIST) % 4) as usize);
    assert!(p.entries(TableKind::Global, set)[0].valid);
    assert_eq!(p.predict(PC, HIST), (true, Some(3)));

    // Same PC under another history misses in the global table.
    let other = HIST ^ 0x2;
    assert_ne!(p.set_index(TableKind::Global, PC, other), set);
    assert_eq!(p.predict(PC, other), (false, None));

    p.update(PC, HIST, 3, true);
    p.update(PC, HIST, 3, true);
    assert_eq!(p.selector(PC), 3);
}

/// An unconfirmed fusion installs a weak entry that does not fuse.
#[test]
fn test_unconfirmed_fusion_is_weak() {
    let mut p = predictor(4, 2);
    p.update(PC, HIST, 3, false);
    assert_eq!(p.selector(PC), 0);
    assert_eq!(p.predict(PC, HIST), (false, Some(3)));
}

#[test]
fn test_confidence_saturates() {
    let mut p = predictor(4, 2);
    for _ in 0..4 {
        p.update(PC, HIST, 3, false);
    }
    let set = p.set_index(TableKind::Local, PC, HIST);
    assert_eq!(p.entries(TableKind::Local, set)[0].confidence, 0);
    assert_eq!(p.selector(PC), 0);
}

/// A new distance replaces the old one at weak confidence.
#[test]
fn test_distance_change_resets_confidence() {
    let mut p = predictor(4, 2);
    p.update(PC, HIST, 3, false);
    p.update(PC, HIST, 3, false);
    p.update(PC, HIST, 5, false);

    let set = p.set_index(TableKind::Local, PC, HIST);
    let entry = p.entries(TableKind::Local, set)[0];
    assert_eq!(entry.distance, 5);
    assert_eq!(entry.confidence, 1);
}

#[test]
fn test_distance_masked_to_six_bits() {
    let mut p = predictor(4, 2);
    p.update(PC, HIST, 0x45, false);
    assert_eq!(p.predict(PC, HIST), (false, Some(0x05)));
}

/// PCs sharing a selector slot share its state.
#[test]
fn test_selector_aliasing() {
    let mut p = predictor(4, 2);
    p.update(PC, HIST, 1, true);
    p.update(PC, HIST, 1, true);
    assert_eq!(p.selected(PC + 16), TableKind::Global);
    assert_eq!(p.selected(PC + 1), TableKind::Local);
}

// ══════════════════════════════════════════════════════════
// 2. Replacement
// ══════════════════════════════════════════════════════════

#[test]
fn test_plru_victim_order() {
    let mut lru = OneBitPlru::new(2, 4);
    assert_eq!(lru.get_victim(0), 0);
    lru.update(0, 0);
    lru.update(0, 2);
    assert_eq!(lru.get_victim(0), 1);
    assert!(lru.is_used(0, 2));
    assert!(!lru.is_used(1, 2));

    lru.update(0, 1);
    lru.update(0, 3);
    // Every way used: the set resets and way 0 is evicted.
    assert_eq!(lru.get_victim(0), 0);
    assert!(!lru.is_used(0, 2));
}

/// With every way taken, the pseudo-LRU victim is replaced.
#[test]
fn test_predictor_eviction() {
    let mut p = predictor(1, 2);
    p.update(0x10, 0, 1, false);
    p.update(0x20, 0, 2, false);
    p.update(0x30, 0, 3, false);

    let ways = p.entries(TableKind::Local, 0);
    assert_eq!(ways[0].tag, 0x30);
    assert_eq!(ways[1].tag, 0x20);
    assert_eq!(p.predict(0x10, 0), (false, None));
    assert_eq!(p.predict(0x20, 0), (false, Some(2)));
}
