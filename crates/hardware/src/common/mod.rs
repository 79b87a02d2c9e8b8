//! Common utilities and types used throughout the front end.
//!
//! This module provides the building blocks shared by the fetch-target queue,
//! the recovery logic and the fusion subsystem:
//! 1. **Identifiers:** Core identity and address helpers.
//! 2. **Constants:** Fixed table widths and counter limits.
//! 3. **Error Handling:** Fatal front-end errors and configuration errors.

/// Core identifier and address helpers.
pub mod addr;

/// Fixed widths of the modelled hardware tables.
pub mod constants;

/// Error types.
pub mod error;

pub use addr::{CoreId, cacheline_tag, line_base, reaches_line_end};
pub use error::{ConfigError, FrontendError, Result};
