/// Fluent constructors for programs and ops.
pub mod builder;
