//! Decoupled front end: fill loop, drain consumer, recovery and retire.
//!
//! One [`DecoupledFrontend`] exists per core and owns every piece of state the
//! front end keeps for that core. It performs the following:
//! 1. **Fill:** Once per cycle, admits ops from the Frontend, predicts control
//!    flow, builds fetch targets and pushes closed ones into the FTQ until a
//!    per-cycle limit is hit.
//! 2. **Drain:** Hands queued fetch targets and their ops to the instruction
//!    cache stage, with single-step undo.
//! 3. **Recovery:** Flushes everything, rewinds the sequence counter and
//!    iterators, resizes the FTQ and returns the Frontend to the correct path.
//! 4. **Retire:** Releases fetch stalls held by serialising ops.

use tracing::{debug, trace};

use super::traits::{BranchPredictor, Frontend};
use crate::common::constants::FIRST_OP_NUM;
use crate::common::{CoreId, FrontendError, Result, reaches_line_end};
use crate::config::Config;
use crate::core::ftq::{FetchTarget, FtEndedBy, Ftq, IterId, SizingController, SizingFeedback};
use crate::core::op::{Op, OpHandle, OpPool};
use crate::stats::FrontendStats;

/// Reason the fill loop stopped admitting ops this cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakReason {
    /// The FTQ is at capacity.
    FtqFull,
    /// The per-cycle taken control-flow budget is spent.
    MaxTakenCfs,
    /// The per-cycle fetch-byte budget is spent.
    MaxBytes,
    /// The branch predictor has no bandwidth left.
    PredictorBandwidth,
    /// The core is stalled behind a fetch barrier.
    Stalled,
    /// The Frontend has no op ready.
    FrontendEmpty,
}

/// Recovery record delivered by the back end on a misprediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoveryInfo {
    /// Correct-path address fetch resumes at.
    pub fetch_addr: u64,
    /// Sequence number of the mispredicted op.
    pub op_num: u64,
    /// Frontend identifier of the mispredicted op.
    pub inst_uid: u64,
    /// The mispredicted op itself, still owned by the back end.
    pub op: OpHandle,
}

/// Per-cycle admission limits.
#[derive(Clone, Copy, Debug)]
struct FetchLimits {
    taken_cfs_per_cycle: u64,
    bytes_per_cycle: u64,
    icache_line_bytes: u64,
}

/// Per-core decoupled front-end state.
#[derive(Debug)]
pub struct DecoupledFrontend {
    core: CoreId,
    ftq: Ftq,
    /// Fetch target under construction by the fill loop.
    to_push: FetchTarget,
    /// Fetch target being drained by the instruction cache stage.
    in_use: FetchTarget,
    off_path: bool,
    sched_off_path: bool,
    stalled: bool,
    /// Address the first op after a recovery must sit at.
    recovery_addr: Option<u64>,
    /// Cycle of the redirect that started the current off-path episode.
    redirect_cycle: Option<u64>,
    /// Sequence number of the next admitted op.
    op_count: u64,
    /// Consecutive cycles without an admitted op.
    idle_cycles: u64,
    sizing: SizingController,
    feedback: SizingFeedback,
    limits: FetchLimits,
    trace_mode: bool,
    watchdog_cycles: u64,
    stats: FrontendStats,
}

impl DecoupledFrontend {
    /// Creates the front end of `core` with an empty FTQ at the configured
    /// initial capacity.
    pub fn new(core: CoreId, config: &Config) -> Self {
        let ftq = &config.ftq;
        Self {
            core,
            ftq: Ftq::new(core, ftq.initial_capacity),
            to_push: FetchTarget::new(),
            in_use: FetchTarget::new(),
            off_path: false,
            sched_off_path: false,
            stalled: false,
            recovery_addr: None,
            redirect_cycle: None,
            op_count: FIRST_OP_NUM,
            idle_cycles: 0,
            sizing: SizingController::new(ftq),
            feedback: SizingFeedback::default(),
            limits: FetchLimits {
                taken_cfs_per_cycle: ftq.taken_cfs_per_cycle,
                bytes_per_cycle: ftq.bytes_per_cycle,
                icache_line_bytes: ftq.icache_line_bytes,
            },
            trace_mode: config.general.trace_mode,
            watchdog_cycles: config.general.watchdog_cycles,
            stats: FrontendStats::default(),
        }
    }

    /// Runs the fill loop for one cycle.
    ///
    /// Admits ops until a limit is hit and returns the reason the loop
    /// stopped. Every admitted op gets the next sequence number and the
    /// current path tag; control-flow ops are predicted and compared with
    /// the oracle; serialising ops stall fetch until they retire.
    ///
    /// # Errors
    ///
    /// - [`FrontendError::NoForwardProgress`] once the watchdog expires.
    /// - [`FrontendError::RecoveryFetchMismatch`] if the first op after a
    ///   recovery is not at the recovery address.
    /// - Fetch-target construction errors for malformed op streams.
    pub fn tick<F, B>(
        &mut self,
        cycle: u64,
        frontend: &mut F,
        bp: &mut B,
        pool: &mut OpPool,
    ) -> Result<BreakReason>
    where
        F: Frontend + ?Sized,
        B: BranchPredictor + ?Sized,
    {
        self.idle_cycles += 1;
        if self.idle_cycles >= self.watchdog_cycles {
            return Err(FrontendError::NoForwardProgress {
                core: self.core,
                cycles: self.idle_cycles,
            });
        }
        self.stats.cycles.inc(self.off_path);

        let mut cf_num = 0;
        let mut bytes_this_cycle = 0;
        let mut cfs_taken_this_cycle = 0;

        loop {
            debug_assert!(self.ftq.num_fts() <= self.ftq.capacity());
            debug_assert!(cfs_taken_this_cycle <= self.limits.taken_cfs_per_cycle);

            if let Some(reason) =
                self.break_reason(cfs_taken_this_cycle, bytes_this_cycle, frontend, bp)
            {
                self.stats.record_break(reason, self.off_path);
                trace!(core = %self.core, ?reason, off_path = self.off_path, "fill loop break");
                return Ok(reason);
            }

            self.idle_cycles = 0;
            let handle = pool.alloc(self.core);
            let op = &mut pool[handle];
            frontend.fetch_op(self.core, op);
            op.op_num = self.op_count;
            self.op_count += 1;
            op.off_path = self.off_path;

            if op.is_cf() {
                debug_assert!(op.eom, "control flow must end its macro-op");
                let pred_addr = bp.predict_op(self.core, op, cf_num);
                cf_num += 1;
                self.admit_cf(cycle, op, pred_addr, frontend);
            } else {
                debug_assert!(!(op.oracle.recover_at_decode || op.oracle.recover_at_exec));
                if op.bar_fetch {
                    self.stall(op);
                }
            }

            let mut ended_by = FtEndedBy::Init;
            if op.eom {
                let end_of_line =
                    reaches_line_end(op.addr, op.size, self.limits.icache_line_bytes);
                let cf_taken = op.is_taken_cf();
                let bar_fetch = op.serialises_fetch();

                ended_by = if op.exit {
                    FtEndedBy::AppExit
                } else if bar_fetch {
                    FtEndedBy::BarFetch
                } else if cf_taken {
                    FtEndedBy::TakenBranch
                } else if end_of_line {
                    FtEndedBy::IcacheLineBoundary
                } else {
                    FtEndedBy::Init
                };

                bytes_this_cycle += op.size;
                cfs_taken_this_cycle += u64::from(cf_taken || bar_fetch);
            }
            let (addr, op_num, op_off_path) = (op.addr, op.op_num, op.off_path);

            self.to_push.add_op(pool, handle, ended_by)?;
            if ended_by != FtEndedBy::Init {
                let ft = std::mem::take(&mut self.to_push);
                trace!(
                    core = %self.core,
                    start = format_args!("{:#x}", ft.start()),
                    length = ft.length(),
                    ops = ft.len(),
                    ended_by = ?ft.ended_by(),
                    "push fetch target"
                );
                self.ftq.push(ft);
                self.stats.fts_pushed += 1;
            }

            self.stats.fetched_ins.inc(op_off_path);
            trace!(
                core = %self.core,
                addr = format_args!("{addr:#x}"),
                op_num,
                off_path = op_off_path,
                "admit op"
            );

            if let Some(expected) = self.recovery_addr.take() {
                if expected != addr {
                    return Err(FrontendError::RecoveryFetchMismatch {
                        core: self.core,
                        expected,
                        actual: addr,
                    });
                }
            }
        }
    }

    fn break_reason<F, B>(
        &self,
        cfs_taken: u64,
        bytes: u64,
        frontend: &F,
        bp: &B,
    ) -> Option<BreakReason>
    where
        F: Frontend + ?Sized,
        B: BranchPredictor + ?Sized,
    {
        if self.ftq.is_full() {
            Some(BreakReason::FtqFull)
        } else if cfs_taken == self.limits.taken_cfs_per_cycle {
            Some(BreakReason::MaxTakenCfs)
        } else if bytes >= self.limits.bytes_per_cycle {
            // Instruction sizes need not divide the byte budget.
            Some(BreakReason::MaxBytes)
        } else if !bp.is_predictable(self.core) {
            Some(BreakReason::PredictorBandwidth)
        } else if self.stalled {
            Some(BreakReason::Stalled)
        } else if !frontend.can_fetch_op(self.core) {
            Some(BreakReason::FrontendEmpty)
        } else {
            None
        }
    }

    /// Checks a predicted control-flow op against the oracle and schedules
    /// recovery or a stall.
    fn admit_cf<F>(&mut self, cycle: u64, op: &mut Op, pred_addr: u64, frontend: &mut F)
    where
        F: Frontend + ?Sized,
    {
        let oracle = &mut op.oracle;
        if pred_addr != oracle.npc && !oracle.recover_at_decode && !oracle.recover_at_exec {
            oracle.mispred = true;
            oracle.recover_at_exec = true;
        }
        trace!(
            core = %self.core,
            addr = format_args!("{:#x}", op.addr),
            npc = format_args!("{:#x}", op.oracle.npc),
            pred_npc = format_args!("{pred_addr:#x}"),
            taken = op.oracle.pred_taken,
            mispred = op.oracle.mispred,
            misfetch = op.oracle.misfetch,
            btb_miss = op.oracle.btb_miss,
            "predict control flow"
        );

        // Serialising ops stall instead of recovering; the stall costs the
        // same as a recovery from a BTB miss.
        if op.serialises_fetch() {
            op.oracle.recover_at_decode = false;
            op.oracle.recover_at_exec = false;
            self.stall(op);
        }

        if op.oracle.recover_at_decode || op.oracle.recover_at_exec {
            debug_assert!(!(op.oracle.recover_at_decode && op.oracle.recover_at_exec));
            if self.off_path {
                // Only the oldest misprediction of an episode recovers.
                op.oracle.recover_at_decode = false;
                op.oracle.recover_at_exec = false;
            } else {
                self.sched_off_path = true;
                self.stats.recoveries_scheduled += 1;
                self.redirect_cycle = Some(cycle);
                debug!(
                    core = %self.core,
                    addr = format_args!("{:#x}", op.addr),
                    op_num = op.op_num,
                    redirect = format_args!("{pred_addr:#x}"),
                    "schedule recovery, going off path"
                );
            }
            self.off_path = true;
            frontend.redirect(self.core, op.inst_uid, pred_addr);
        } else if self.trace_mode && self.off_path && op.oracle.pred_taken {
            frontend.redirect(self.core, op.inst_uid, pred_addr);
        }
    }

    fn stall(&mut self, op: &Op) {
        self.stalled = true;
        self.stats.stalls += 1;
        debug!(
            core = %self.core,
            addr = format_args!("{:#x}", op.addr),
            op_num = op.op_num,
            off_path = op.off_path,
            "fetch stalled on barrier"
        );
    }

    /// Flushes the front end of this core and resumes at `info.fetch_addr`.
    ///
    /// In order: leaves the wrong path, frees every queued, in-flight and
    /// undrained op, rewinds the sequence counter past the mispredicted op,
    /// resets every iterator, lifts any stall, lets the sizing controller
    /// pick the new capacity and finally recovers the Frontend.
    ///
    /// # Errors
    ///
    /// - [`FrontendError::RecoveryAddrMismatch`] if the Frontend does not
    ///   resume at the recovery address.
    /// - [`FrontendError::StaleOpHandle`] if a queued op was freed elsewhere.
    ///   The core is still fully reset and the Frontend recovered.
    pub fn recover<F>(
        &mut self,
        cycle: u64,
        info: &RecoveryInfo,
        frontend: &mut F,
        pool: &mut OpPool,
    ) -> Result<()>
    where
        F: Frontend + ?Sized,
    {
        self.off_path = false;
        self.sched_off_path = false;
        self.recovery_addr = Some(info.fetch_addr);

        // Every step below runs even if a stale handle turns up while freeing.
        let freed = [
            self.ftq.flush(pool),
            self.to_push.free_ops_and_clear(pool),
            self.in_use.free_ops_and_clear(pool),
        ];
        let stale = freed.into_iter().find_map(std::result::Result::err);

        self.op_count = info.op_num + 1;
        debug!(
            core = %self.core,
            fetch_addr = format_args!("{:#x}", info.fetch_addr),
            op_num = info.op_num,
            "recovery"
        );

        if self.stalled {
            self.stalled = false;
            debug!(core = %self.core, "fetch unstalled by recovery");
        }

        let old = self.ftq.capacity();
        let capacity = self.sizing.resize(old, &mut self.feedback);
        if capacity != old {
            self.ftq.set_capacity(capacity);
            self.stats.capacity_adjustments += 1;
        }

        self.stats.recoveries += 1;
        if let Some(op) = pool.get(info.op) {
            if op.oracle.recover_at_decode {
                self.stats.recover_at_decode += 1;
            } else if op.oracle.recover_at_exec {
                self.stats.recover_at_exec += 1;
            }
        }
        if let Some(redirected) = self.redirect_cycle.take() {
            debug_assert!(cycle > redirected);
            self.stats.offpath_cycles += cycle.saturating_sub(redirected);
        }

        frontend.recover(self.core, info.inst_uid, info.fetch_addr);
        if let Some(err) = stale {
            return Err(err);
        }
        let actual = frontend.next_fetch_addr(self.core);
        if actual != info.fetch_addr {
            return Err(FrontendError::RecoveryAddrMismatch {
                core: self.core,
                expected: info.fetch_addr,
                actual,
            });
        }
        Ok(())
    }

    /// Releases a fetch stall when a serialising op retires, then forwards
    /// the retirement to the Frontend.
    pub fn retire<F>(&mut self, op: &Op, frontend: &mut F)
    where
        F: Frontend + ?Sized,
    {
        if op.serialises_fetch() {
            self.stalled = false;
            debug!(
                core = %self.core,
                addr = format_args!("{:#x}", op.addr),
                op_num = op.op_num,
                "fetch unstalled by retired barrier"
            );
        }
        frontend.retire(self.core, op.inst_uid);
    }

    /// Latches fresh sizing feedback for the next recovery.
    pub fn set_feedback(&mut self, utility_ratio: f64, timeliness_ratio: f64) {
        self.feedback.update(utility_ratio, timeliness_ratio);
    }

    // Drain consumer

    /// Returns `true` if a fetch target is queued.
    #[inline]
    pub fn can_fetch_ft(&self) -> bool {
        !self.ftq.is_empty()
    }

    /// Moves the head fetch target into the in-use slot.
    ///
    /// Returns its start address and byte length, or `None` if the queue is
    /// empty. Iterators are rebased so they keep pointing at the same ops.
    ///
    /// # Errors
    ///
    /// [`FrontendError::StaleOpHandle`] if an undrained op of the previous
    /// in-use fetch target was freed elsewhere.
    pub fn fetch_ft(&mut self, pool: &mut OpPool) -> Result<Option<(u64, u64)>> {
        let Some(ft) = self.ftq.pop_front() else {
            return Ok(None);
        };
        debug_assert!(!self.in_use.can_fetch_op(), "in-use fetch target not drained");
        self.in_use.free_ops_and_clear(pool)?;
        let span = (ft.start(), ft.length());
        trace!(
            core = %self.core,
            start = format_args!("{:#x}", span.0),
            length = span.1,
            "fetch target in use"
        );
        self.in_use = ft;
        Ok(Some(span))
    }

    /// Returns `true` if the drain consumer can fetch an op, pulling the
    /// next fetch target if needed.
    #[inline]
    pub fn can_fetch_op(&self) -> bool {
        self.in_use.can_fetch_op() || self.can_fetch_ft()
    }

    /// Hands the next op to the drain consumer.
    ///
    /// Returns the op and whether it ends its fetch target, or `None` if
    /// nothing is queued.
    ///
    /// # Errors
    ///
    /// Propagates [`DecoupledFrontend::fetch_ft`] errors.
    pub fn fetch_op(&mut self, pool: &mut OpPool) -> Result<Option<(OpHandle, bool)>> {
        if !self.in_use.can_fetch_op() && self.fetch_ft(pool)?.is_none() {
            return Ok(None);
        }
        Ok(self.in_use.fetch_op())
    }

    /// Gives back the op most recently handed out by
    /// [`DecoupledFrontend::fetch_op`].
    ///
    /// # Errors
    ///
    /// [`FrontendError::ReturnOutOfOrder`] for any other op.
    pub fn return_op(&mut self, pool: &OpPool, handle: OpHandle) -> Result<()> {
        self.in_use.return_op(pool, handle)?;
        trace!(core = %self.core, %handle, "op returned to fetch target");
        Ok(())
    }

    /// Address of the next op the drain consumer will see.
    ///
    /// Looks at the in-use fetch target, then the FTQ head, then the fetch
    /// target under construction, and finally asks the Frontend.
    pub fn next_fetch_addr<F>(&self, frontend: &F, pool: &OpPool) -> u64
    where
        F: Frontend + ?Sized,
    {
        self.in_use
            .peek()
            .or_else(|| self.ftq.front().and_then(|ft| ft.ops().first().copied()))
            .or_else(|| self.to_push.ops().first().copied())
            .and_then(|handle| pool.get(handle))
            .map_or_else(|| frontend.next_fetch_addr(self.core), |op| op.addr)
    }

    // Iterators

    /// Registers a new FTQ iterator at the queue head.
    pub fn new_iter(&mut self) -> IterId {
        self.ftq.new_iter()
    }

    /// See [`Ftq::iter_get`].
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownIterator`] for an id not created here.
    pub fn iter_get(&self, id: IterId) -> Result<Option<(OpHandle, bool)>> {
        self.ftq.iter_get(id)
    }

    /// See [`Ftq::iter_get_next`].
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownIterator`] for an id not created here.
    pub fn iter_get_next(&mut self, id: IterId) -> Result<Option<(OpHandle, bool)>> {
        self.ftq.iter_get_next(id)
    }

    /// See [`Ftq::iter_offset`].
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownIterator`] for an id not created here.
    pub fn iter_offset(&self, id: IterId) -> Result<usize> {
        self.ftq.iter_offset(id)
    }

    /// See [`Ftq::iter_ft_offset`].
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownIterator`] for an id not created here.
    pub fn iter_ft_offset(&self, id: IterId) -> Result<usize> {
        self.ftq.iter_ft_offset(id)
    }

    /// Ops across all queued fetch targets.
    pub fn num_ops(&self) -> usize {
        self.ftq.num_ops()
    }

    /// Queued fetch targets.
    pub fn num_fts(&self) -> usize {
        self.ftq.num_fts()
    }

    // Accessors

    /// Core this front end belongs to.
    pub const fn core(&self) -> CoreId {
        self.core
    }

    /// The fetch-target queue.
    pub const fn ftq(&self) -> &Ftq {
        &self.ftq
    }

    /// Fetch target currently being drained.
    pub const fn in_use(&self) -> &FetchTarget {
        &self.in_use
    }

    /// Fetch target under construction.
    pub const fn to_push(&self) -> &FetchTarget {
        &self.to_push
    }

    /// Current FTQ capacity in fetch targets.
    pub const fn capacity(&self) -> usize {
        self.ftq.capacity()
    }

    /// Fetching down a mispredicted path.
    pub const fn is_off_path(&self) -> bool {
        self.off_path
    }

    /// A recovery has been scheduled for the current off-path episode.
    pub const fn is_sched_off_path(&self) -> bool {
        self.sched_off_path
    }

    /// Fetch is stalled behind a serialising op.
    pub const fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Sequence number the next admitted op will receive.
    pub const fn op_count(&self) -> u64 {
        self.op_count
    }

    /// Pending sizing feedback.
    pub const fn feedback(&self) -> &SizingFeedback {
        &self.feedback
    }

    /// Counters of this core.
    pub const fn stats(&self) -> &FrontendStats {
        &self.stats
    }
}
