mod fit;
mod metrics;
mod reporter;

pub use fit::{Fit, FitConfig};
pub use metrics::{EpochMetrics, StepStats, argmax, count_correct};
pub use reporter::{LogReporter, TrainingReporter};
