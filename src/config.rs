use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use dataset::{DEFAULT_CHUNK_ROWS, DecoderConfig};
use machine_learning::arch::{IMAGE_SHAPE, NUM_CLASSES};
use serde::Deserialize;

use crate::{EpochsInput, RecognizerErr, Result};

/// Everything the recognizer can be tuned with.
///
/// Every field has a default, so a config file only needs the ones it changes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Directory the asset paths are relative to.
    pub assets_dir: PathBuf,
    pub sprite_path: String,
    pub labels_path: String,
    pub total_examples: usize,
    pub image_size: usize,
    pub num_classes: usize,
    /// Fraction of the examples that go to the training partition.
    pub train_ratio: f64,
    pub chunk_rows: usize,
    /// Examples drawn once per run to train on.
    pub train_size: usize,
    /// Examples drawn once per run to validate on.
    pub validation_size: usize,
    pub batch_size: usize,
    /// Test examples used when evaluating a trained model.
    pub evaluation_size: usize,
    pub epochs: EpochsInput,
    /// Seeds shuffling and initialization, a random seed is used if missing.
    pub seed: Option<u64>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            sprite_path: "mnist_images.png".into(),
            labels_path: "mnist_labels_uint8".into(),
            total_examples: 65_000,
            image_size: 784,
            num_classes: 10,
            train_ratio: 5. / 6.,
            chunk_rows: DEFAULT_CHUNK_ROWS,
            train_size: 5_500,
            validation_size: 1_000,
            batch_size: 512,
            evaluation_size: 500,
            epochs: EpochsInput::Absent,
            seed: None,
        }
    }
}

impl RecognizerConfig {
    /// Loads the config from an optional JSON file and then applies the environment overrides.
    ///
    /// # Arguments
    /// * `path` - The config file, the defaults are used if it's `None`.
    ///
    /// # Returns
    /// The validated config or an error if the file couldn't be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| RecognizerErr::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };

        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies the `ASSETS_DIR`, `EPOCHS` and `SEED` overrides.
    ///
    /// # Arguments
    /// * `lookup` - Resolves an override by name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("ASSETS_DIR") {
            self.assets_dir = dir.into();
        }

        if let Some(epochs) = lookup("EPOCHS") {
            self.epochs = EpochsInput::Text(epochs);
        }

        if let Some(seed) = lookup("SEED") {
            let seed = seed
                .trim()
                .parse()
                .map_err(|_| RecognizerErr::InvalidConfig(format!("SEED is not a u64: {seed}")))?;
            self.seed = Some(seed);
        }

        self.validate()?;
        Ok(self)
    }

    /// Checks the values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(RecognizerErr::InvalidConfig(msg.to_string()));

        if !(self.train_ratio > 0. && self.train_ratio < 1.) {
            return invalid("train_ratio must lie in (0, 1)");
        }

        if self.chunk_rows == 0 || self.batch_size == 0 {
            return invalid("chunk_rows and batch_size must be positive");
        }

        if self.image_size != IMAGE_SHAPE.len() {
            return Err(RecognizerErr::InvalidConfig(format!(
                "image_size must be {} to fit the classifier, got {}",
                IMAGE_SHAPE.len(),
                self.image_size
            )));
        }

        if self.num_classes != NUM_CLASSES {
            return Err(RecognizerErr::InvalidConfig(format!(
                "num_classes must be {NUM_CLASSES} to fit the classifier, got {}",
                self.num_classes
            )));
        }

        if self.train_size == 0 {
            return invalid("train_size must be positive");
        }

        Ok(())
    }

    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            sprite_path: self.sprite_path.clone(),
            labels_path: self.labels_path.clone(),
            total_examples: self.total_examples,
            image_size: self.image_size,
            num_classes: self.num_classes,
            chunk_rows: NonZeroUsize::new(self.chunk_rows).unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.batch_size).unwrap_or(NonZeroUsize::MIN)
    }
}
