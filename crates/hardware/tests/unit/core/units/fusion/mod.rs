
/// Tournament fusion predictor and its replacement policy.
pub mod predictor;
