//! Front-end statistics collection and reporting.
//!
//! This module tracks the observability counters of the decoupled front end
//! and the fusion subsystem. It provides:
//! 1. **Fill loop:** Cycles on/off the correct path, stalls and per-reason
//!    break counts, each split by path.
//! 2. **Fetch:** Instructions fetched on/off path and fetch targets pushed.
//! 3. **Recovery:** Recoveries by detection stage, off-path cycles and FTQ
//!    capacity changes.
//! 4. **Fusion:** History hits and fusion-predictor accuracy.
//!
//! Counters are consumed by an external sink; `to_json` and `print_sections` are
//! provided for standalone runs.

use serde::Serialize;

use crate::core::pipeline::decoupled::BreakReason;

/// A counter split by whether the front end was on the correct path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PathCounter {
    /// Events while on the correct path.
    pub onpath: u64,
    /// Events while off the correct path.
    pub offpath: u64,
}

impl PathCounter {
    /// Counts one event.
    #[inline]
    pub fn inc(&mut self, off_path: bool) {
        if off_path {
            self.offpath += 1;
        } else {
            self.onpath += 1;
        }
    }

    /// Sum of both paths.
    #[inline]
    pub const fn total(&self) -> u64 {
        self.onpath + self.offpath
    }
}

/// Per-core decoupled front-end statistics.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FrontendStats {
    /// Fill-loop invocations, by path.
    pub cycles: PathCounter,
    /// Cycles the fill loop ended because the core was stalled.
    pub cycles_stalled: u64,
    /// Breaks due to a full FTQ.
    pub break_ftq_full: PathCounter,
    /// Breaks due to the taken control-flow budget.
    pub break_max_cfs_taken: PathCounter,
    /// Breaks due to the fetch-byte budget.
    pub break_max_bytes: PathCounter,
    /// Breaks due to branch-predictor bandwidth.
    pub break_pred_bandwidth: PathCounter,
    /// Breaks due to a pending fetch barrier.
    pub break_bar_fetch: PathCounter,
    /// Breaks due to the Frontend having no op ready.
    pub break_frontend_empty: PathCounter,
    /// Instructions fetched, by path.
    pub fetched_ins: PathCounter,
    /// Fetch targets pushed into the FTQ.
    pub fts_pushed: u64,
    /// Stall events raised by fetch barriers and system calls.
    pub stalls: u64,
    /// Recoveries scheduled by the fill loop.
    pub recoveries_scheduled: u64,
    /// Recoveries performed.
    pub recoveries: u64,
    /// Recoveries triggered by a misprediction resolved at decode.
    pub recover_at_decode: u64,
    /// Recoveries triggered by a misprediction resolved at execute.
    pub recover_at_exec: u64,
    /// Cycles spent between a redirect onto the wrong path and its recovery.
    pub offpath_cycles: u64,
    /// Recoveries at which the sizing controller changed the capacity.
    pub capacity_adjustments: u64,
}

impl FrontendStats {
    /// Counts a fill-loop break under its reason.
    pub fn record_break(&mut self, reason: BreakReason, off_path: bool) {
        let counter = match reason {
            BreakReason::FtqFull => &mut self.break_ftq_full,
            BreakReason::MaxTakenCfs => &mut self.break_max_cfs_taken,
            BreakReason::MaxBytes => &mut self.break_max_bytes,
            BreakReason::PredictorBandwidth => &mut self.break_pred_bandwidth,
            BreakReason::Stalled => {
                self.cycles_stalled += 1;
                &mut self.break_bar_fetch
            }
            BreakReason::FrontendEmpty => &mut self.break_frontend_empty,
        };
        counter.inc(off_path);
    }

    /// Serializes the counters as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Propagates the `serde_json` error (not expected for plain counters).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Per-core fusion subsystem statistics.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FusionStats {
    /// Loads observed at commit.
    pub load_commits: u64,
    /// Stores observed at commit.
    pub store_commits: u64,
    /// Loads that matched an unfused committed load on the same cacheline.
    pub uch_load_hits: u64,
    /// Stores that matched the unfused committed store on the same cacheline.
    pub uch_store_hits: u64,
    /// Predictor lookups that predicted fusion.
    pub predicted_fused: u64,
    /// Predictor lookups whose outcome matched the history.
    pub predictions_correct: u64,
    /// Predictor lookups whose outcome did not match the history.
    pub predictions_incorrect: u64,
    /// Ops with malformed memory operands that were substituted.
    pub operand_anomalies: u64,
}

impl FusionStats {
    /// Fraction of correct fusion predictions, in percent.
    pub fn accuracy(&self) -> f64 {
        let total = self.predictions_correct + self.predictions_incorrect;
        if total == 0 {
            0.0
        } else {
            100.0 * self.predictions_correct as f64 / total as f64
        }
    }
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"fill"`, `"recovery"`, `"fusion"`.
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["fill", "recovery", "fusion"];

/// Prints the requested sections of one core's counters to stdout.
///
/// Each element of `sections` should be one of [`STATS_SECTIONS`]; pass an
/// empty slice to print everything.
pub fn print_sections(core: usize, fe: &FrontendStats, fusion: &FusionStats, sections: &[String]) {
    let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
    let cyc = fe.cycles.total().max(1) as f64;

    println!("\n==========================================================");
    println!("DECOUPLED FRONT END STATISTICS (core {core})");
    println!("==========================================================");
    if want("fill") {
        let row = |name: &str, c: &PathCounter| {
            println!(
                "  {:<22} on: {:<10} off: {:<10} ({:.2}%)",
                name,
                c.onpath,
                c.offpath,
                (c.total() as f64 / cyc) * 100.0
            );
        };
        println!("FILL LOOP");
        row("cycles", &fe.cycles);
        row("break.ftq_full", &fe.break_ftq_full);
        row("break.max_cfs_taken", &fe.break_max_cfs_taken);
        row("break.max_bytes", &fe.break_max_bytes);
        row("break.pred_bandwidth", &fe.break_pred_bandwidth);
        row("break.bar_fetch", &fe.break_bar_fetch);
        row("break.frontend_empty", &fe.break_frontend_empty);
        println!("  cycles.stalled         {}", fe.cycles_stalled);
        println!(
            "  fetched.ins            on: {:<10} off: {:<10}",
            fe.fetched_ins.onpath, fe.fetched_ins.offpath
        );
        println!("  fts.pushed             {}", fe.fts_pushed);
        println!("----------------------------------------------------------");
    }
    if want("recovery") {
        println!("RECOVERY");
        println!("  recoveries             {}", fe.recoveries);
        println!("  recover.decode         {}", fe.recover_at_decode);
        println!("  recover.exec           {}", fe.recover_at_exec);
        println!("  offpath.cycles         {}", fe.offpath_cycles);
        println!("  stalls                 {}", fe.stalls);
        println!("  ftq.resizes            {}", fe.capacity_adjustments);
        println!("----------------------------------------------------------");
    }
    if want("fusion") {
        println!("FUSION");
        println!("  commits.load           {}", fusion.load_commits);
        println!("  commits.store          {}", fusion.store_commits);
        println!("  uch.load_hits          {}", fusion.uch_load_hits);
        println!("  uch.store_hits         {}", fusion.uch_store_hits);
        println!("  pred.fused             {}", fusion.predicted_fused);
        println!("  pred.accuracy          {:.2}%", fusion.accuracy());
        println!("  operand.anomalies      {}", fusion.operand_anomalies);
    }
    println!("==========================================================");
}
