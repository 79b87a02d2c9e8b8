//! Global front-end constants.
//!
//! Fixed widths of the hardware tables modelled by the front end. Tunable
//! sizes (queue bounds, table geometry, thresholds) live in
//! [`crate::config`]; the values here are architectural bit widths that do
//! not change between runs.

/// Mask applied to unfused-committed-history commit numbers (7-bit wraparound).
pub const COMMIT_NUM_MASK: u8 = 0x7F;

/// Mask applied to fusion-predictor tags (low byte of the PC).
pub const FUSION_TAG_MASK: u64 = 0xFF;

/// Mask applied to fusion distances stored in predictor entries (6 bits).
pub const FUSION_DISTANCE_MASK: u8 = 0x3F;

/// Saturation ceiling of every 2-bit counter (selector and confidence).
pub const COUNTER_MAX: u8 = 3;

/// Selector values below this threshold choose the local fusion table.
pub const SELECTOR_GLOBAL_THRESHOLD: u8 = 2;

/// Confidence assigned to a replaced or re-targeted entry after a miss.
pub const CONFIDENCE_WEAK: u8 = 1;

/// Maximum associativity supported by the per-set usage bitmask.
pub const MAX_FUSION_WAYS: usize = 64;

/// First sequence number handed out after reset.
pub const FIRST_OP_NUM: u64 = 1;
