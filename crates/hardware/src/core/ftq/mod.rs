//! Fetch-Target Queue and its supporting pieces.
//!
//! This module contains the data structures that decouple branch prediction
//! from instruction fetch:
//! 1. **Fetch Targets:** Contiguous op runs between fetch-boundary events.
//! 2. **Queue:** The bounded per-core FIFO of closed fetch targets.
//! 3. **Iterators:** Independent read cursors over the queued op stream.
//! 4. **Sizing:** The closed-loop controller that resizes the queue.

/// Fetch target construction and drain.
pub mod fetch_target;

/// Iterator positions and identifiers.
pub mod iter;

/// The bounded fetch-target queue.
pub mod queue;

/// Adaptive capacity controller.
pub mod sizing;

pub use fetch_target::{FetchTarget, FtEndedBy};
pub use iter::{FtqIter, IterId};
pub use queue::Ftq;
pub use sizing::{SizingController, SizingFeedback};
