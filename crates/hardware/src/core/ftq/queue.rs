//! Fetch-Target Queue (FTQ).
//!
//! The FTQ is a per-core bounded deque of closed fetch targets (front =
//! oldest). It provides:
//! 1. **Enqueue:** The fill loop pushes closed FTs while below capacity.
//! 2. **Dequeue:** The drain consumer pops the head FT into its in-use slot.
//! 3. **Iteration:** Independent iterators walk the flattened op stream; their
//!    indices are rebased synchronously with every dequeue.
//! 4. **Flush:** Recovery frees every queued op and rewinds all iterators.

use std::collections::VecDeque;

use super::fetch_target::FetchTarget;
use super::iter::{FtqIter, IterId};
use crate::common::{CoreId, FrontendError, Result};
use crate::core::op::{OpHandle, OpPool};

/// Per-core fetch-target queue.
#[derive(Debug)]
pub struct Ftq {
    core: CoreId,
    fts: VecDeque<FetchTarget>,
    /// Capacity in fetch targets; set by the sizing controller.
    capacity: usize,
    iters: Vec<FtqIter>,
}

impl Ftq {
    /// Creates an empty FTQ holding at most `capacity` fetch targets.
    pub fn new(core: CoreId, capacity: usize) -> Self {
        Self {
            core,
            fts: VecDeque::with_capacity(capacity),
            capacity,
            iters: Vec::new(),
        }
    }

    /// Current capacity in fetch targets.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity.
    ///
    /// Only called by recovery, after the queue has been flushed, so the
    /// size bound holds across the change.
    pub fn set_capacity(&mut self, capacity: usize) {
        debug_assert!(self.fts.len() <= capacity);
        self.capacity = capacity;
    }

    /// Number of queued fetch targets.
    #[inline]
    pub fn num_fts(&self) -> usize {
        self.fts.len()
    }

    /// Number of ops across all queued fetch targets.
    pub fn num_ops(&self) -> usize {
        self.fts.iter().map(FetchTarget::len).sum()
    }

    /// Returns `true` if no fetch target is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fts.is_empty()
    }

    /// Returns `true` if the queue holds `capacity` fetch targets.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.fts.len() >= self.capacity
    }

    /// Oldest queued fetch target.
    #[inline]
    pub fn front(&self) -> Option<&FetchTarget> {
        self.fts.front()
    }

    /// Queued fetch target `idx` positions from the head.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&FetchTarget> {
        self.fts.get(idx)
    }

    /// Appends a closed fetch target. Iterators do not move.
    pub fn push(&mut self, ft: FetchTarget) {
        debug_assert!(!self.is_full(), "push into full FTQ");
        debug_assert!(ft.is_enqueueable(), "push of malformed fetch target");
        self.fts.push_back(ft);
    }

    /// Removes the head fetch target and rebases every iterator so that it
    /// keeps pointing at the same op.
    ///
    /// Iterators inside the removed FT are moved to the start of the new
    /// head, since their ops now belong to the drain consumer.
    pub fn pop_front(&mut self) -> Option<FetchTarget> {
        let ft = self.fts.pop_front()?;
        let removed = ft.len();
        for it in &mut self.iters {
            if it.ft_pos > 0 {
                debug_assert!(it.flattened_op_pos >= removed);
                it.flattened_op_pos -= removed;
                it.ft_pos -= 1;
            } else {
                debug_assert!(it.flattened_op_pos < removed);
                it.flattened_op_pos = 0;
                it.op_pos = 0;
            }
        }
        Some(ft)
    }

    /// Frees every queued op, empties the queue and rewinds all iterators.
    ///
    /// The queue is always left empty, even if some op was already freed.
    ///
    /// # Errors
    ///
    /// [`FrontendError::StaleOpHandle`] for the first queued op that was
    /// already freed.
    pub fn flush(&mut self, pool: &mut OpPool) -> Result<()> {
        let mut first_err = None;
        for ft in &mut self.fts {
            if let Err(err) = ft.free_ops_and_clear(pool) {
                first_err = first_err.or(Some(err));
            }
        }
        self.fts.clear();
        for it in &mut self.iters {
            it.reset();
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Registers a new iterator at the start of the queue.
    pub fn new_iter(&mut self) -> IterId {
        self.iters.push(FtqIter::default());
        IterId(self.iters.len() - 1)
    }

    /// Current position of an iterator.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownIterator`] for an id not created here.
    pub fn iter(&self, id: IterId) -> Result<&FtqIter> {
        self.iters.get(id.0).ok_or(FrontendError::UnknownIterator {
            core: self.core,
            iter: id.0,
        })
    }

    fn iter_mut(&mut self, id: IterId) -> Result<&mut FtqIter> {
        let core = self.core;
        self.iters
            .get_mut(id.0)
            .ok_or(FrontendError::UnknownIterator { core, iter: id.0 })
    }

    /// All registered iterators, in creation order.
    pub fn iters(&self) -> &[FtqIter] {
        &self.iters
    }

    /// Returns the op at the iterator's position and whether it is the last
    /// op of its fetch target.
    ///
    /// Returns `None` if the queue is empty or the iterator has walked past
    /// every closed fetch target.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownIterator`] for an id not created here.
    pub fn iter_get(&self, id: IterId) -> Result<Option<(OpHandle, bool)>> {
        let it = self.iter(id)?;
        Ok(self.op_at(it))
    }

    /// Advances the iterator by one op, rolling over fetch-target
    /// boundaries, then behaves as [`Ftq::iter_get`].
    ///
    /// Stepping off the last op of the last fetch target parks the iterator
    /// at the start of the (not yet enqueued) next fetch target, so it picks
    /// up the next FT pushed by the fill loop.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownIterator`] for an id not created here.
    pub fn iter_get_next(&mut self, id: IterId) -> Result<Option<(OpHandle, bool)>> {
        let num_fts = self.fts.len();
        let ft_len = {
            let it = self.iter(id)?;
            if it.ft_pos >= num_fts {
                debug_assert_eq!(it.op_pos, 0);
                return Ok(None);
            }
            self.fts[it.ft_pos].len()
        };

        let it = self.iter_mut(id)?;
        it.flattened_op_pos += 1;
        if it.op_pos + 1 == ft_len {
            it.ft_pos += 1;
            it.op_pos = 0;
        } else {
            it.op_pos += 1;
        }

        let it = *self.iter(id)?;
        Ok(self.op_at(&it))
    }

    /// Flattened op offset of the iterator from the FTQ head.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownIterator`] for an id not created here.
    pub fn iter_offset(&self, id: IterId) -> Result<usize> {
        Ok(self.iter(id)?.flattened_op_pos)
    }

    /// Fetch-target offset of the iterator from the FTQ head.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownIterator`] for an id not created here.
    pub fn iter_ft_offset(&self, id: IterId) -> Result<usize> {
        Ok(self.iter(id)?.ft_pos)
    }

    fn op_at(&self, it: &FtqIter) -> Option<(OpHandle, bool)> {
        if self.fts.is_empty() {
            debug_assert!(it.is_at_origin());
            return None;
        }
        let ft = self.fts.get(it.ft_pos)?;
        debug_assert!(it.op_pos < ft.len());
        let handle = *ft.ops().get(it.op_pos)?;
        Some((handle, it.op_pos + 1 == ft.len()))
    }
}
