/// Instructions making up a scripted program.
pub mod instruction;

/// Ops allocated directly in a pool.
pub mod op;

pub use instruction::{Inst, straight_line};
pub use op::OpBuilder;
