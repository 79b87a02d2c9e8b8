//! Fetch Target (FT) construction and linear drain.
//!
//! A fetch target is the contiguous run of ops between two fetch-boundary
//! events. The fill loop builds one op at a time with [`FetchTarget::add_op`];
//! once closed it is pushed into the FTQ. The drain consumer later pulls its
//! ops in order with single-step undo.

use crate::common::{FrontendError, Result};
use crate::core::op::{OpHandle, OpPool};

/// Reason a fetch target was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FtEndedBy {
    /// Still open.
    #[default]
    Init,
    /// The last op reaches the end of an instruction-cache line.
    IcacheLineBoundary,
    /// The last op is predicted-taken control flow.
    TakenBranch,
    /// The last op is a fetch barrier or system call.
    BarFetch,
    /// The last op ends the application.
    AppExit,
}

/// A contiguous run of ops.
#[derive(Clone, Debug, Default)]
pub struct FetchTarget {
    ops: Vec<OpHandle>,
    /// Next op index handed to the drain consumer.
    op_pos: usize,
    start: u64,
    length: u64,
    ended_by: FtEndedBy,
}

impl FetchTarget {
    /// Creates an empty, open fetch target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an op, closing the fetch target if `ended_by` is not `Init`.
    ///
    /// The first op must begin a macro-op and sets the start address. Later
    /// ops either continue the current macro-op at the same address or begin
    /// a new one exactly at `prev_addr + prev_size`. Closing fixes the length
    /// to `end_addr - start`.
    ///
    /// # Errors
    ///
    /// Returns the matching [`FrontendError`] if the op breaks contiguity,
    /// the target is already closed, or a close is requested on an op that
    /// does not end its macro-op. The fetch target is unchanged on error.
    pub fn add_op(&mut self, pool: &OpPool, handle: OpHandle, ended_by: FtEndedBy) -> Result<()> {
        let op = &pool[handle];
        if self.is_closed() {
            return Err(FrontendError::FetchTargetAlreadyClosed { start: self.start });
        }

        match self.ops.last() {
            None => {
                if !op.bom {
                    return Err(FrontendError::NotMacroOpStart { addr: op.addr });
                }
            }
            Some(&prev) => {
                let prev = &pool[prev];
                if op.bom {
                    if prev.end_addr() != op.addr {
                        return Err(FrontendError::NonContiguousOp {
                            expected: prev.end_addr(),
                            actual: op.addr,
                        });
                    }
                } else if prev.addr != op.addr {
                    return Err(FrontendError::SplitMacroOp {
                        expected: prev.addr,
                        actual: op.addr,
                    });
                }
            }
        }

        if ended_by != FtEndedBy::Init && !op.eom {
            return Err(FrontendError::CloseOnNonEndOfMacroOp { addr: op.addr });
        }

        if self.ops.is_empty() {
            self.start = op.addr;
        }
        self.ops.push(handle);

        if ended_by != FtEndedBy::Init {
            self.length = op.end_addr().wrapping_sub(self.start);
            self.ended_by = ended_by;
        }
        Ok(())
    }

    /// Frees every op not yet handed to the drain consumer and resets the
    /// fetch target to the empty, open state.
    ///
    /// Ops before the drain cursor are owned by the consumer and are left alone.
    /// The fetch target is cleared even when a handle turns out to be stale.
    ///
    /// # Errors
    ///
    /// [`FrontendError::StaleOpHandle`] for the first op that was freed behind
    /// our back.
    pub fn free_ops_and_clear(&mut self, pool: &mut OpPool) -> Result<()> {
        let mut first_err = None;
        for &handle in &self.ops[self.op_pos..] {
            if let Err(err) = pool.free(handle) {
                first_err = first_err.or(Some(err));
            }
        }
        *self = Self::default();
        first_err.map_or(Ok(()), Err)
    }

    /// Returns `true` if the drain consumer has ops left to fetch.
    #[inline]
    pub fn can_fetch_op(&self) -> bool {
        self.op_pos < self.ops.len()
    }

    /// Hands the next op to the drain consumer.
    ///
    /// Returns the op and whether it is the last op of this fetch target.
    pub fn fetch_op(&mut self) -> Option<(OpHandle, bool)> {
        let handle = *self.ops.get(self.op_pos)?;
        self.op_pos += 1;
        Some((handle, self.op_pos == self.ops.len()))
    }

    /// Takes back the most recently fetched op.
    ///
    /// # Errors
    ///
    /// [`FrontendError::ReturnOutOfOrder`] unless `handle` is the op handed
    /// out by the last `fetch_op`.
    pub fn return_op(&mut self, pool: &OpPool, handle: OpHandle) -> Result<()> {
        match self.op_pos.checked_sub(1) {
            Some(prev) if self.ops[prev] == handle => {
                self.op_pos = prev;
                Ok(())
            }
            _ => Err(FrontendError::ReturnOutOfOrder {
                returned: pool.get(handle).map_or(0, |op| op.op_num),
            }),
        }
    }

    /// Address of the first op.
    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Byte length from the first byte of the first op to the last byte of
    /// the last op; zero while open.
    #[inline]
    pub const fn length(&self) -> u64 {
        self.length
    }

    /// Reason this fetch target was closed.
    #[inline]
    pub const fn ended_by(&self) -> FtEndedBy {
        self.ended_by
    }

    /// Returns `true` once a terminating op has been added.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.ended_by != FtEndedBy::Init
    }

    /// All ops, including those already fetched by the drain consumer.
    #[inline]
    pub fn ops(&self) -> &[OpHandle] {
        &self.ops
    }

    /// Number of ops.
    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if no op has been added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Drain cursor: index of the next op the consumer will receive.
    #[inline]
    pub const fn op_pos(&self) -> usize {
        self.op_pos
    }

    /// Next op the drain consumer would receive, without advancing.
    #[inline]
    pub fn peek(&self) -> Option<OpHandle> {
        self.ops.get(self.op_pos).copied()
    }

    /// A closed fetch target is enqueueable when it has a start, a length and ops.
    pub fn is_enqueueable(&self) -> bool {
        self.is_closed() && self.start != 0 && self.length != 0 && !self.ops.is_empty()
    }
}
