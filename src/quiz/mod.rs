pub mod evaluator;
pub mod generator;
pub mod scheduler;
pub mod srs;
