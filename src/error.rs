use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use dataset::DatasetErr;
use machine_learning::MlErr;

/// The result type used in the entire recognizer.
pub type Result<T> = std::result::Result<T, RecognizerErr>;

/// The recognizer's error type.
#[derive(Debug)]
pub enum RecognizerErr {
    Dataset(DatasetErr),
    Ml(MlErr),
    ConfigRead { path: PathBuf, source: io::Error },
    ConfigParse(serde_json::Error),
    InvalidConfig(String),
    ImageSize { width: u32, height: u32 },
    /// The session has no trained model yet.
    NotTrained,
}

impl Display for RecognizerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataset(e) => write!(f, "dataset error: {e}"),
            Self::Ml(e) => write!(f, "model error: {e}"),
            Self::ConfigRead { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            Self::ConfigParse(e) => write!(f, "failed to parse config: {e}"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::ImageSize { width, height } => {
                write!(f, "expected a 28x28 image, got {width}x{height}")
            }
            Self::NotTrained => write!(f, "no model has been trained yet"),
        }
    }
}

impl Error for RecognizerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Dataset(e) => Some(e),
            Self::Ml(e) => Some(e),
            Self::ConfigRead { source, .. } => Some(source),
            Self::ConfigParse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DatasetErr> for RecognizerErr {
    fn from(value: DatasetErr) -> Self {
        Self::Dataset(value)
    }
}

impl From<MlErr> for RecognizerErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<ndarray::ShapeError> for RecognizerErr {
    fn from(value: ndarray::ShapeError) -> Self {
        Self::Ml(MlErr::from(value))
    }
}

impl From<serde_json::Error> for RecognizerErr {
    fn from(value: serde_json::Error) -> Self {
        Self::ConfigParse(value)
    }
}
