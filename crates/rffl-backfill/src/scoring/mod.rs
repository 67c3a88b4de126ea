// Score imputation: era baselines, bucket statistics, the blended estimator
// and the fill pass that applies it.

pub mod era;
pub mod estimator;
pub mod fill;
pub mod index;
pub mod stats;
