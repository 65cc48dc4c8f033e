pub mod arch;
pub mod error;
pub mod evaluation;
pub mod initialization;
pub mod optimization;
mod test;
pub mod training;

pub use arch::{DigitClassifier, LayerSummary, Model, build_digit_classifier};
pub use error::{MlErr, Result};
