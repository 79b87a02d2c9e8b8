//! Operation records and the handle-based op pool.
//!
//! Ops are decoded micro-ops supplied by the Frontend collaborator. They live
//! in an arena owned by the simulation; fetch targets, the drain consumer and
//! iterators only ever hold [`OpHandle`] indices. An op belongs to exactly one
//! place at a time: the free list, a fetch target, or the consumer that
//! fetched it from the in-use fetch target.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::common::{CoreId, FrontendError, Result};

/// Handle of an op inside an [`OpPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OpHandle(pub u32);

impl fmt::Display for OpHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// Control-flow class of an op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CfType {
    /// Conditional direct branch.
    Branch,
    /// Unconditional direct jump.
    Jump,
    /// Direct call.
    Call,
    /// Indirect jump.
    IndirectJump,
    /// Indirect call.
    IndirectCall,
    /// Function return.
    Return,
    /// System call; serialises fetch like a fetch barrier.
    Syscall,
}

/// Memory access class of an op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MemType {
    /// No memory access.
    #[default]
    None,
    /// Load.
    Load,
    /// Store.
    Store,
}

/// Ground-truth and prediction information attached to a control-flow op.
///
/// `npc` is filled by the Frontend from the trace; the prediction fields are
/// filled by the branch predictor during `predict_op`.
#[derive(Clone, Debug, Default)]
pub struct OracleInfo {
    /// True next PC.
    pub npc: u64,
    /// Predicted direction is taken.
    pub pred_taken: bool,
    /// Predicted next PC.
    pub pred_npc: u64,
    /// Direction or target mispredicted.
    pub mispred: bool,
    /// Target mispredicted while direction was right.
    pub misfetch: bool,
    /// Target missing from the BTB.
    pub btb_miss: bool,
    /// The misprediction is detectable at decode.
    pub recover_at_decode: bool,
    /// The misprediction is only detectable at execute.
    pub recover_at_exec: bool,
}

/// A decoded micro-op.
#[derive(Clone, Debug, Default)]
pub struct Op {
    /// Owning core.
    pub core: CoreId,
    /// Address of the macro-op this micro-op belongs to.
    pub addr: u64,
    /// Size in bytes of the macro-op.
    pub size: u64,
    /// First micro-op of its macro-op.
    pub bom: bool,
    /// Last micro-op of its macro-op.
    pub eom: bool,
    /// Control-flow class, if any.
    pub cf_type: Option<CfType>,
    /// Fetch barrier (serialising instruction, fence).
    pub bar_fetch: bool,
    /// Last op of the application.
    pub exit: bool,
    /// Memory access class.
    pub mem_type: MemType,
    /// Effective addresses of the memory operands.
    pub mem_addrs: Vec<u64>,
    /// Branch oracle and prediction state.
    pub oracle: OracleInfo,
    /// Fetched down a mispredicted path.
    pub off_path: bool,
    /// Per-core sequence number assigned at fetch.
    pub op_num: u64,
    /// Frontend instruction identifier.
    pub inst_uid: u64,
}

impl Op {
    /// Returns `true` if the op is a control-flow op.
    #[inline]
    pub const fn is_cf(&self) -> bool {
        self.cf_type.is_some()
    }

    /// Returns `true` if the op is a system call.
    #[inline]
    pub fn is_syscall(&self) -> bool {
        self.cf_type == Some(CfType::Syscall)
    }

    /// Returns `true` if fetch must stall behind this op until it retires.
    #[inline]
    pub fn serialises_fetch(&self) -> bool {
        self.bar_fetch || self.is_syscall()
    }

    /// Returns `true` if the op is control flow predicted taken.
    #[inline]
    pub const fn is_taken_cf(&self) -> bool {
        self.is_cf() && self.oracle.pred_taken
    }

    /// Returns the address immediately following this macro-op.
    #[inline]
    pub const fn end_addr(&self) -> u64 {
        self.addr.wrapping_add(self.size)
    }
}

/// Arena of ops with a free list.
///
/// Freed slots are recycled; a handle stays valid until its op is freed.
#[derive(Debug, Default)]
pub struct OpPool {
    slots: Vec<Op>,
    live: Vec<bool>,
    free_list: Vec<u32>,
    live_count: usize,
}

impl OpPool {
    /// Creates a pool with room for `capacity` ops before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            live_count: 0,
        }
    }

    /// Allocates a blank op owned by `core`.
    pub fn alloc(&mut self, core: CoreId) -> OpHandle {
        let op = Op {
            core,
            ..Op::default()
        };
        self.live_count += 1;
        if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = op;
            self.live[idx as usize] = true;
            OpHandle(idx)
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(op);
            self.live.push(true);
            OpHandle(idx)
        }
    }

    /// Returns an op to the free list.
    ///
    /// # Errors
    ///
    /// [`FrontendError::StaleOpHandle`] if the handle is not live.
    pub fn free(&mut self, handle: OpHandle) -> Result<()> {
        match self.live.get_mut(handle.0 as usize) {
            Some(live) if *live => {
                *live = false;
                self.free_list.push(handle.0);
                self.live_count -= 1;
                Ok(())
            }
            _ => Err(FrontendError::StaleOpHandle(handle.0)),
        }
    }

    /// Returns the op behind `handle` if it is live.
    pub fn get(&self, handle: OpHandle) -> Option<&Op> {
        let idx = handle.0 as usize;
        if self.live.get(idx).copied().unwrap_or(false) {
            self.slots.get(idx)
        } else {
            None
        }
    }

    /// Returns `true` if `handle` refers to a live op.
    pub fn is_live(&self, handle: OpHandle) -> bool {
        self.live.get(handle.0 as usize).copied().unwrap_or(false)
    }

    /// Number of ops currently allocated.
    pub const fn live_count(&self) -> usize {
        self.live_count
    }
}

impl Index<OpHandle> for OpPool {
    type Output = Op;

    fn index(&self, handle: OpHandle) -> &Op {
        debug_assert!(self.is_live(handle), "access to freed {handle}");
        &self.slots[handle.0 as usize]
    }
}

impl IndexMut<OpHandle> for OpPool {
    fn index_mut(&mut self, handle: OpHandle) -> &mut Op {
        debug_assert!(self.is_live(handle), "access to freed {handle}");
        &mut self.slots[handle.0 as usize]
    }
}
