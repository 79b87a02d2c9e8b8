//! Prediction units attached to the front end.
//!
//! This module contains the memory micro-op fusion unit: the unfused-committed
//! histories and the tournament fusion predictor with its replacement policy.

/// Memory micro-op fusion (histories, predictor, replacement policy).
pub mod fusion;
