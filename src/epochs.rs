use std::fmt;

use serde::Deserialize;

/// Epochs used when the input is missing or makes no sense.
pub const DEFAULT_EPOCHS: usize = 10;

/// Upper bound for the amount of epochs of a single run.
pub const MAX_EPOCHS: usize = 100;

/// The epoch count as the user typed it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EpochsInput {
    Number(f64),
    Text(String),
    #[default]
    Absent,
}

impl From<f64> for EpochsInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for EpochsInput {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for EpochsInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<EpochsInput>> From<Option<T>> for EpochsInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// An amount of epochs within `1..=MAX_EPOCHS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epochs(usize);

impl Epochs {
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for Epochs {
    fn default() -> Self {
        Self(DEFAULT_EPOCHS)
    }
}

impl fmt::Display for Epochs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Turns whatever the user typed into a usable amount of epochs.
///
/// Missing, non numeric and non positive inputs fall back to `DEFAULT_EPOCHS`, anything
/// above `MAX_EPOCHS` is capped. Fractions are truncated first.
pub fn normalize_epochs(input: &EpochsInput) -> Epochs {
    let value = match input {
        EpochsInput::Number(n) => Some(*n),
        EpochsInput::Text(s) => s.trim().parse::<f64>().ok(),
        EpochsInput::Absent => None,
    };

    match value.map(f64::trunc) {
        Some(n) if n.is_nan() || n < 1. => Epochs::default(),
        Some(n) if n > MAX_EPOCHS as f64 => Epochs(MAX_EPOCHS),
        Some(n) => Epochs(n as usize),
        None => Epochs::default(),
    }
}
