//! Decoupled instruction-supply pipeline.
//!
//! This module contains the per-core front end that runs ahead of the
//! instruction cache. It includes the following components:
//! 1. **Decoupled Front End:** Fill loop, drain consumer, recovery and retire.
//! 2. **Traits:** Interfaces of the Frontend and branch predictor collaborators.

/// Per-core decoupled front end (fill, drain, recovery, retire).
pub mod decoupled;

/// Collaborator traits driven by the front end.
pub mod traits;

pub use self::decoupled::{BreakReason, DecoupledFrontend, RecoveryInfo};
pub use self::traits::{BranchPredictor, Frontend};
