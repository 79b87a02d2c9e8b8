//! Decoupled instruction-supply front end for a cycle-accurate CPU simulator.
//!
//! This crate implements the fetch-directed front end of a trace-driven
//! out-of-order core model with the following:
//! 1. **FTQ:** Fetch targets, a bounded per-core fetch-target queue and
//!    independent iterators over its op stream.
//! 2. **Decoupled Front End:** The per-cycle fill loop, the drain consumer,
//!    misprediction recovery and fetch-barrier stalls.
//! 3. **Adaptive Sizing:** A closed-loop controller resizing the FTQ from
//!    utility and timeliness feedback.
//! 4. **Fusion:** Unfused-committed histories and a tournament predictor for
//!    memory micro-op fusion.
//! 5. **Simulation:** Configuration, statistics and the multi-core driver.

/// Common types and constants (core ids, address helpers, errors).
pub mod common;
/// Front-end configuration (defaults, sizing modes, hierarchical config structures).
pub mod config;
/// Per-core front end (ops, FTQ, decoupled pipeline, fusion unit).
pub mod core;
/// Multi-core cycle driver.
pub mod sim;
/// Front-end statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Per-core front-end state.
pub use crate::core::Core;
/// Fatal front-end error and its result alias.
pub use crate::common::{FrontendError, Result};
/// Top-level driver; construct with `Simulator::new`.
pub use crate::sim::Simulator;
