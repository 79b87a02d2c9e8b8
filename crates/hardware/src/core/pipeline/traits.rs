//! Collaborator interfaces of the decoupled front end.
//!
//! This module defines the traits the front end drives but does not own. It
//! provides:
//! 1. **Frontend Interface:** The trace or execution driver that produces
//!    decoded ops and follows redirects.
//! 2. **Branch Predictor Interface:** The direction/target predictor consulted
//!    for every control-flow op admitted into the FTQ.

use crate::common::CoreId;
use crate::core::op::Op;

/// Source of decoded ops.
///
/// The Frontend walks the program (a trace or an execution-driven model) and
/// fills the static fields of each op. It follows the front end down wrong
/// paths when redirected and back to the correct path on recovery.
pub trait Frontend {
    /// Returns `true` if an op is ready for `core` this cycle.
    fn can_fetch_op(&self, core: CoreId) -> bool;

    /// Fills `op` with the next decoded op of `core`.
    ///
    /// Sets the address, size, macro-op flags, control-flow and barrier
    /// class, memory operands, `inst_uid` and the oracle `npc`. The front end
    /// assigns `op_num` and `off_path` afterwards.
    fn fetch_op(&mut self, core: CoreId, op: &mut Op);

    /// Steers fetch of `core` to `addr` after the op `inst_uid`.
    fn redirect(&mut self, core: CoreId, inst_uid: u64, addr: u64);

    /// Returns `core` to the correct path after the op `inst_uid`, resuming
    /// at `addr`.
    ///
    /// Defaults to a redirect; execution-driven Frontends that checkpoint
    /// state override it.
    fn recover(&mut self, core: CoreId, inst_uid: u64, addr: u64) {
        self.redirect(core, inst_uid, addr);
    }

    /// Address of the next op the Frontend will produce for `core`.
    fn next_fetch_addr(&self, core: CoreId) -> u64;

    /// Notifies the Frontend that the op `inst_uid` has retired.
    fn retire(&mut self, core: CoreId, inst_uid: u64);
}

/// Branch predictor consulted by the fill loop.
pub trait BranchPredictor {
    /// Predicts a control-flow op and returns the predicted next address.
    ///
    /// Fills the prediction fields of `op.oracle` (`pred_taken`, `pred_npc`,
    /// `mispred`, `misfetch`, `btb_miss` and the `recover_at_*` flags).
    /// `cf_num` counts the control-flow ops already predicted this cycle.
    fn predict_op(&mut self, core: CoreId, op: &mut Op, cf_num: u32) -> u64;

    /// Returns `true` while the predictor has bandwidth left this cycle.
    fn is_predictable(&self, core: CoreId) -> bool;
}
