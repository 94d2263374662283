pub mod describe;
pub mod distribution;
pub mod rank;

pub use describe::{Summary, describe, mean, median, quantile, sample_std};
pub use rank::{Correlation, LinearFit, linear_fit, spearman};
