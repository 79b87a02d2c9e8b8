//! # Fill Loop Tests
//!
//! Verifies how the per-cycle fill loop admits ops, closes fetch targets and
//! stops on each of its limits.

use fdip_core::FrontendError;
use fdip_core::common::CoreId;
use fdip_core::config::Config;
use fdip_core::core::ftq::FtEndedBy;
use fdip_core::core::pipeline::BreakReason;
use pretty_assertions::assert_eq;

use crate::common::builder::{Inst, straight_line};
use crate::common::harness::FrontendRig;
use crate::common::mocks::ScriptedPredictor;

fn rig(program: Vec<Inst>) -> FrontendRig {
    FrontendRig::new(&Config::default(), program, ScriptedPredictor::perfect())
}

// ══════════════════════════════════════════════════════════
// 1. Fetch-target boundaries
// ══════════════════════════════════════════════════════════

/// A line of straight-line code per cycle, closed at the line end.
#[test]
fn test_straight_line_fills_one_line_per_cycle() {
    let mut rig = rig(straight_line(0x1000, 32));

    assert_eq!(rig.tick().unwrap(), BreakReason::MaxBytes);
    assert_eq!(rig.fe.num_fts(), 1);
    assert_eq!(rig.tick().unwrap(), BreakReason::MaxBytes);
    assert_eq!(rig.tick().unwrap(), BreakReason::FrontendEmpty);

    let ftq = rig.fe.ftq();
    assert_eq!(ftq.num_fts(), 2);
    for (i, start) in [0x1000, 0x1040].into_iter().enumerate() {
        let ft = ftq.get(i).unwrap();
        assert_eq!(ft.start(), start);
        assert_eq!(ft.length(), 64);
        assert_eq!(ft.len(), 16);
        assert_eq!(ft.ended_by(), FtEndedBy::IcacheLineBoundary);
    }
    assert!(rig.fe.to_push().is_empty());

    let stats = rig.fe.stats();
    assert_eq!(stats.cycles.onpath, 3);
    assert_eq!(stats.fetched_ins.onpath, 32);
    assert_eq!(stats.fetched_ins.offpath, 0);
    assert_eq!(stats.fts_pushed, 2);
    assert_eq!(stats.break_max_bytes.onpath, 2);
    assert_eq!(stats.break_frontend_empty.onpath, 1);
}

/// A predicted-taken branch closes the fetch target; fetch continues at
/// the target within the same cycle.
#[test]
fn test_taken_branch_closes_fetch_target() {
    let mut program = vec![Inst::alu(0x1000), Inst::branch(0x1004, 0x2000, true)];
    program.extend(straight_line(0x2000, 32));
    let mut rig = rig(program);

    assert_eq!(rig.tick().unwrap(), BreakReason::MaxBytes);
    let ft = rig.fe.ftq().front().unwrap();
    assert_eq!(ft.start(), 0x1000);
    assert_eq!(ft.length(), 8);
    assert_eq!(ft.ended_by(), FtEndedBy::TakenBranch);

    // 56 bytes left this cycle, not yet at the line end.
    assert_eq!(rig.fe.to_push().len(), 14);
    assert_eq!(rig.fe.to_push().start(), 0x2000);
    assert_eq!(rig.bp.predictions, 1);
}

/// A not-taken branch does not end the fetch target.
#[test]
fn test_not_taken_branch_continues() {
    let mut program = straight_line(0x1000, 4);
    program.push(Inst::branch(0x1010, 0x3000, false));
    program.extend(straight_line(0x1014, 11));
    let mut rig = rig(program);

    assert_eq!(rig.tick().unwrap(), BreakReason::MaxBytes);
    let ft = rig.fe.ftq().front().unwrap();
    assert_eq!(ft.len(), 16);
    assert_eq!(ft.ended_by(), FtEndedBy::IcacheLineBoundary);
}

#[test]
fn test_taken_cf_budget() {
    let program = vec![
        Inst::jump(0x1000, 0x2000),
        Inst::jump(0x2000, 0x3000),
        Inst::jump(0x3000, 0x4000),
        Inst::alu(0x4000),
    ];
    let mut rig = rig(program);

    assert_eq!(rig.tick().unwrap(), BreakReason::MaxTakenCfs);
    assert_eq!(rig.queued_addrs(), vec![0x1000, 0x2000]);
    assert_eq!(rig.fe.stats().break_max_cfs_taken.onpath, 1);

    assert_eq!(rig.tick().unwrap(), BreakReason::FrontendEmpty);
    assert_eq!(rig.queued_addrs(), vec![0x1000, 0x2000, 0x3000]);
    assert_eq!(rig.fe.to_push().ops().len(), 1);

    // The control-flow index restarts every cycle.
    assert_eq!(rig.bp.cf_nums, vec![0, 1, 0]);
}

#[test]
fn test_ftq_full() {
    let mut config = Config::default();
    config.ftq.min_capacity = 1;
    config.ftq.initial_capacity = 2;
    config.ftq.max_capacity = 4;
    config.ftq.bytes_per_cycle = 256;
    let mut rig = FrontendRig::new(&config, straight_line(0x1000, 64), ScriptedPredictor::perfect());

    assert_eq!(rig.tick().unwrap(), BreakReason::FtqFull);
    assert_eq!(rig.fe.num_fts(), 2);
    assert_eq!(rig.fe.num_ops(), 32);
    assert!(rig.fe.to_push().is_empty());

    assert_eq!(rig.tick().unwrap(), BreakReason::FtqFull);
    assert_eq!(rig.fe.stats().break_ftq_full.onpath, 2);
    assert_eq!(rig.fe.stats().fetched_ins.onpath, 32);
}

/// Byte budget is checked with `>=`: odd sizes may overshoot it.
#[test]
fn test_byte_budget_overshoot() {
    let program: Vec<Inst> = (0..8).map(|i| Inst::alu(0x1000 + 6 * i).size(6)).collect();
    let mut config = Config::default();
    config.ftq.bytes_per_cycle = 16;
    let mut rig = FrontendRig::new(&config, program, ScriptedPredictor::perfect());

    assert_eq!(rig.tick().unwrap(), BreakReason::MaxBytes);
    assert_eq!(rig.fe.to_push().len(), 3);
}

/// Multi-uop instructions count their bytes once.
#[test]
fn test_micro_ops_share_bytes() {
    let program = vec![
        Inst::alu(0x1000).uops(3),
        Inst::alu(0x1004),
        Inst::exit(0x1008),
    ];
    let mut rig = rig(program);

    assert_eq!(rig.tick().unwrap(), BreakReason::FrontendEmpty);
    let ft = rig.fe.ftq().front().unwrap();
    assert_eq!(ft.len(), 5);
    assert_eq!(ft.length(), 12);
    assert_eq!(ft.ended_by(), FtEndedBy::AppExit);
    assert_eq!(rig.queued_addrs(), vec![0x1000, 0x1000, 0x1000, 0x1004, 0x1008]);
}

/// Every admitted op gets the next sequence number.
#[test]
fn test_sequence_numbers() {
    let mut rig = rig(straight_line(0x1000, 20));
    rig.tick().unwrap();
    rig.tick().unwrap();
    assert_eq!(rig.fe.op_count(), 21);

    let ft = rig.fe.ftq().front().unwrap();
    let nums: Vec<u64> = ft.ops().iter().map(|&h| rig.pool[h].op_num).collect();
    assert_eq!(nums, (1..=16).collect::<Vec<_>>());
}

// ══════════════════════════════════════════════════════════
// 2. Stops without progress
// ══════════════════════════════════════════════════════════

#[test]
fn test_predictor_bandwidth_and_watchdog() {
    let mut config = Config::default();
    config.general.watchdog_cycles = 3;
    let mut bp = ScriptedPredictor::perfect();
    bp.predictable = false;
    let mut rig = FrontendRig::new(&config, straight_line(0x1000, 8), bp);

    assert_eq!(rig.tick().unwrap(), BreakReason::PredictorBandwidth);
    assert_eq!(rig.tick().unwrap(), BreakReason::PredictorBandwidth);
    assert_eq!(
        rig.tick(),
        Err(FrontendError::NoForwardProgress {
            core: CoreId(0),
            cycles: 3
        })
    );
    assert_eq!(rig.fe.stats().break_pred_bandwidth.onpath, 2);
}

/// Admitting an op resets the watchdog.
#[test]
fn test_watchdog_resets_on_progress() {
    let mut config = Config::default();
    config.general.watchdog_cycles = 3;
    let mut rig = FrontendRig::new(&config, straight_line(0x1000, 64), ScriptedPredictor::perfect());

    for _ in 0..4 {
        assert_eq!(rig.tick().unwrap(), BreakReason::MaxBytes);
    }
    assert_eq!(rig.tick().unwrap(), BreakReason::FrontendEmpty);
    assert_eq!(rig.tick().unwrap(), BreakReason::FrontendEmpty);
    assert!(rig.tick().is_err());
}

// ══════════════════════════════════════════════════════════
// 3. Off-path fetch
// ══════════════════════════════════════════════════════════

/// A mispredicted branch redirects the Frontend and tags younger ops.
#[test]
fn test_misprediction_goes_off_path() {
    let mut program = vec![Inst::branch(0x1000, 0x2000, true)];
    program.extend(straight_line(0x1004, 15));
    program.extend(straight_line(0x2000, 16));
    let bp = ScriptedPredictor::perfect().mispredict(0x1000, 0x1004);
    let mut rig = FrontendRig::new(&Config::default(), program, bp);

    assert_eq!(rig.tick().unwrap(), BreakReason::MaxBytes);
    assert!(rig.fe.is_off_path());
    assert!(rig.fe.is_sched_off_path());
    assert_eq!(rig.frontend.redirects, vec![(CoreId(0), 1, 0x1004)]);

    let ft = rig.fe.ftq().front().unwrap();
    let branch = &rig.pool[ft.ops()[0]];
    assert!(branch.oracle.mispred);
    assert!(branch.oracle.recover_at_exec);
    assert!(!branch.off_path);
    assert!(ft.ops()[1..].iter().all(|&h| rig.pool[h].off_path));

    let stats = rig.fe.stats();
    assert_eq!(stats.fetched_ins.onpath, 1);
    assert_eq!(stats.fetched_ins.offpath, 15);
    assert_eq!(stats.recoveries_scheduled, 1);

    assert_eq!(rig.tick().unwrap(), BreakReason::FrontendEmpty);
    assert_eq!(rig.fe.stats().cycles.offpath, 1);
    assert_eq!(rig.fe.stats().break_frontend_empty.offpath, 1);
}

/// A prediction that disagrees with the oracle is flagged even when the
/// predictor did not flag it.
#[test]
fn test_oracle_disagreement_schedules_exec_recovery() {
    use fdip_core::core::op::Op;
    use fdip_core::core::pipeline::BranchPredictor;

    struct AlwaysFallthrough;
    impl BranchPredictor for AlwaysFallthrough {
        fn predict_op(&mut self, _core: CoreId, op: &mut Op, _cf_num: u32) -> u64 {
            op.end_addr()
        }
        fn is_predictable(&self, _core: CoreId) -> bool {
            true
        }
    }

    let mut program = vec![Inst::jump(0x1000, 0x2000)];
    program.extend(straight_line(0x1004, 3));
    let config = Config::default();
    let mut rig = FrontendRig::new(&config, program, ScriptedPredictor::perfect());
    let mut bp = AlwaysFallthrough;

    let _ = rig
        .fe
        .tick(1, &mut rig.frontend, &mut bp, &mut rig.pool)
        .unwrap();
    let branch = &rig.pool[rig.fe.to_push().ops()[0]];
    assert!(branch.oracle.mispred);
    assert!(branch.oracle.recover_at_exec);
    assert!(rig.fe.is_off_path());
    assert_eq!(rig.fe.to_push().len(), 4);
}

/// Only the oldest misprediction of an episode schedules a recovery.
#[test]
fn test_nested_misprediction_not_scheduled() {
    let program = vec![
        Inst::branch(0x1000, 0x2000, true),
        Inst::branch(0x1004, 0x3000, true),
        Inst::alu(0x1008),
    ];
    let bp = ScriptedPredictor::perfect()
        .mispredict(0x1000, 0x1004)
        .mispredict_at_decode(0x1004, 0x1008);
    let mut rig = FrontendRig::new(&Config::default(), program, bp);

    assert_eq!(rig.tick().unwrap(), BreakReason::FrontendEmpty);
    let ops = rig.fe.to_push().ops().to_vec();
    assert_eq!(ops.len(), 3);
    let inner = &rig.pool[ops[1]];
    assert!(inner.off_path);
    assert!(inner.oracle.mispred);
    assert!(!inner.oracle.recover_at_decode);
    assert!(!inner.oracle.recover_at_exec);
    assert_eq!(rig.fe.stats().recoveries_scheduled, 1);
    assert_eq!(rig.frontend.redirects.len(), 2);
}

/// In trace mode, off-path taken control flow redirects the Frontend too.
#[test]
fn test_trace_mode_redirects_off_path() {
    let program = vec![
        Inst::branch(0x1000, 0x2000, false),
        Inst::jump(0x2000, 0x3000),
        Inst::alu(0x3000),
    ];
    let bp = || ScriptedPredictor::perfect().mispredict(0x1000, 0x2000);

    let mut config = Config::default();
    config.general.trace_mode = true;
    let mut traced = FrontendRig::new(&config, program.clone(), bp());
    assert_eq!(traced.tick().unwrap(), BreakReason::MaxTakenCfs);
    let addrs: Vec<u64> = traced.frontend.redirects.iter().map(|r| r.2).collect();
    assert_eq!(addrs, vec![0x2000, 0x3000]);

    let mut plain = FrontendRig::new(&Config::default(), program, bp());
    assert_eq!(plain.tick().unwrap(), BreakReason::MaxTakenCfs);
    assert_eq!(plain.frontend.redirects.len(), 1);
}
