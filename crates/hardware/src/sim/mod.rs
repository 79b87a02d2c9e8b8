//! Simulation driver.
//!
//! Provides the [`Simulator`] that owns every core's front end together with
//! the op pool and the Frontend and branch-predictor collaborators, and
//! advances all cores once per cycle.

/// Cycle driver owning cores, pool and collaborators.
pub mod simulator;

pub use self::simulator::Simulator;
