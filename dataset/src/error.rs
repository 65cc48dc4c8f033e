use std::{error::Error, fmt, io};

use image::ImageError;
use tokio::task::JoinError;

/// The dataset module's result type.
pub type Result<T> = std::result::Result<T, DatasetErr>;

/// Failures while fetching, decoding, partitioning or batching the dataset.
#[derive(Debug)]
pub enum DatasetErr {
    AssetFetch {
        path: String,
        source: io::Error,
    },
    Decode(ImageError),
    DecodeTask(JoinError),
    SpriteGeometry {
        width: u32,
        height: u32,
        image_size: usize,
        total: usize,
    },
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidRatio(f64),
    BatchSizeExceeded {
        requested: usize,
        available: usize,
    },
}

impl fmt::Display for DatasetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetErr::AssetFetch { path, source } => {
                write!(f, "failed to fetch asset '{path}': {source}")
            }
            DatasetErr::Decode(e) => write!(f, "failed to decode sprite: {e}"),
            DatasetErr::DecodeTask(e) => write!(f, "sprite decoding task failed: {e}"),
            DatasetErr::SpriteGeometry {
                width,
                height,
                image_size,
                total,
            } => write!(
                f,
                "sprite is {width}x{height}, expected {image_size} columns and at least {total} rows"
            ),
            DatasetErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch for {what}: got {got}, expected {expected}"),
            DatasetErr::InvalidRatio(ratio) => {
                write!(f, "train/test ratio must lie in (0, 1), got {ratio}")
            }
            DatasetErr::BatchSizeExceeded {
                requested,
                available,
            } => write!(
                f,
                "requested a batch of {requested} examples but at most {available} can be drawn"
            ),
        }
    }
}

impl Error for DatasetErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DatasetErr::AssetFetch { source, .. } => Some(source),
            DatasetErr::Decode(e) => Some(e),
            DatasetErr::DecodeTask(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ImageError> for DatasetErr {
    fn from(value: ImageError) -> Self {
        Self::Decode(value)
    }
}
