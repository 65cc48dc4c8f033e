pub mod config;
pub mod epochs;
pub mod error;
pub mod inference;
pub mod session;
pub mod training;

pub use config::RecognizerConfig;
pub use epochs::{DEFAULT_EPOCHS, Epochs, EpochsInput, MAX_EPOCHS, normalize_epochs};
pub use error::{RecognizerErr, Result};
pub use inference::{CapturedImage, LABELS};
pub use session::{Prediction, Session, SessionState, StartOutcome};
