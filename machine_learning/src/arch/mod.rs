pub mod activations;
mod builder;
pub mod layers;
pub mod loss;
mod model;
mod sequential;

pub use builder::{DigitClassifier, IMAGE_SHAPE, NUM_CLASSES, build_digit_classifier};
pub use model::{LayerSummary, Model};
pub use sequential::Sequential;
