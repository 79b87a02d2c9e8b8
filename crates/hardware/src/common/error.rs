//! Front-end error definitions.
//!
//! The front end distinguishes three tiers of abnormal conditions:
//! 1. **Fatal:** Modeling bugs (recovery address disagreement, malformed fetch
//!    targets, a starved fill loop). These are [`FrontendError`] values that
//!    propagate to the driver, which aborts the run.
//! 2. **Expected:** Full queue, empty frontend, exhausted bandwidth. These are
//!    not errors; the fill loop ends the cycle and reports a break reason.
//! 3. **Soft:** Anomalies in operand data, logged with `tracing::warn!` and
//!    replaced by a safe default.

use thiserror::Error;

use super::addr::CoreId;

/// Fatal front-end conditions.
///
/// Every variant indicates that the simulated model has reached a state it
/// cannot legally be in. None of them are retried.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FrontendError {
    /// The Frontend collaborator disagrees with the simulator about where
    /// fetch resumes after a recovery.
    #[error("{core}: recovery addr {expected:#x} does not match frontend's next fetch addr {actual:#x}")]
    RecoveryAddrMismatch {
        /// Core being recovered.
        core: CoreId,
        /// Address carried by the recovery record.
        expected: u64,
        /// Address reported by the Frontend.
        actual: u64,
    },

    /// The first op fetched after a recovery is not at the recovery address.
    #[error("{core}: first op after recovery at {actual:#x}, expected {expected:#x}")]
    RecoveryFetchMismatch {
        /// Core being filled.
        core: CoreId,
        /// Recovery address.
        expected: u64,
        /// Address of the op actually fetched.
        actual: u64,
    },

    /// The fill loop went too many consecutive cycles without fetching an op.
    #[error("{core}: no forward progress for {cycles} cycles")]
    NoForwardProgress {
        /// Starved core.
        core: CoreId,
        /// Consecutive cycles without a fetched op.
        cycles: u64,
    },

    /// The first op of a fetch target does not begin a macro-op.
    #[error("fetch target must start on a macro-op boundary (op at {addr:#x})")]
    NotMacroOpStart {
        /// Address of the offending op.
        addr: u64,
    },

    /// A new macro-op does not start where the previous one ended.
    #[error("non-contiguous op at {actual:#x}, expected {expected:#x}")]
    NonContiguousOp {
        /// `prev_addr + prev_size`.
        expected: u64,
        /// Address of the offending op.
        actual: u64,
    },

    /// A micro-op claims to continue a macro-op at a different address.
    #[error("micro-op at {actual:#x} continues macro-op at {expected:#x}")]
    SplitMacroOp {
        /// Address of the macro-op being continued.
        expected: u64,
        /// Address of the offending op.
        actual: u64,
    },

    /// An op was added to a fetch target that has already been terminated.
    #[error("fetch target starting at {start:#x} is already closed")]
    FetchTargetAlreadyClosed {
        /// Start address of the closed fetch target.
        start: u64,
    },

    /// A fetch target was terminated on an op that does not end a macro-op.
    #[error("fetch target closed on a non end-of-macro-op at {addr:#x}")]
    CloseOnNonEndOfMacroOp {
        /// Address of the offending op.
        addr: u64,
    },

    /// An op was returned to the in-use fetch target out of stack order.
    #[error("returned op #{returned} is not the most recently fetched op")]
    ReturnOutOfOrder {
        /// Sequence number of the op handed back.
        returned: u64,
    },

    /// An iterator handle that was never created on this core.
    #[error("{core}: unknown FTQ iterator {iter}")]
    UnknownIterator {
        /// Core queried.
        core: CoreId,
        /// Raw iterator index.
        iter: usize,
    },

    /// An op handle that does not refer to a live op in the pool.
    #[error("stale op handle {0}")]
    StaleOpHandle(u32),

    /// A core identifier outside the simulated core range.
    #[error("unknown core {0}")]
    UnknownCore(CoreId),
}

/// Invalid configuration values, reported by [`crate::config::Config::validate`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The FTQ capacity bounds are not ordered `min <= initial <= max`.
    #[error("FTQ capacity bounds out of order: min {min}, initial {initial}, max {max}")]
    CapacityBounds {
        /// Configured minimum.
        min: usize,
        /// Configured initial capacity.
        initial: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A size that must be non-zero is zero.
    #[error("{0} must be non-zero")]
    Zero(&'static str),

    /// A size that must be a power of two is not.
    #[error("{name} must be a power of two, got {value}")]
    NotPowerOfTwo {
        /// Field name.
        name: &'static str,
        /// Offending value.
        value: u64,
    },

    /// The fusion tables are wider than the per-set usage mask.
    #[error("fusion predictor supports at most {max} ways, got {ways}")]
    TooManyWays {
        /// Configured associativity.
        ways: usize,
        /// Supported maximum.
        max: usize,
    },

    /// A ratio threshold is not a finite number in `[0, 1]`.
    #[error("{name} must be within [0, 1], got {value}")]
    Threshold {
        /// Field name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// Result alias for fallible front-end operations.
pub type Result<T> = std::result::Result<T, FrontendError>;
