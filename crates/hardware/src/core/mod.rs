//! Core front-end implementation.
//!
//! This module contains the per-core instruction-supply machinery: op records
//! and their pool, the fetch-target queue, the decoupled front end that fills
//! and drains it, and the fusion prediction unit.

/// Per-core front-end context.
pub mod cpu;

/// Fetch targets, the fetch-target queue, iterators and adaptive sizing.
pub mod ftq;

/// Op records and the handle-based op pool.
pub mod op;

/// Decoupled front end and collaborator traits.
pub mod pipeline;

/// Prediction units (memory micro-op fusion).
pub mod units;

pub use self::cpu::Core;
