use std::fmt;

use crate::{MlErr, Result};

/// Accuracy over the examples of a single class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassAccuracy {
    pub class: usize,
    /// Hits over `count`, zero when the class never showed up.
    pub accuracy: f32,
    /// The amount of examples labeled with this class.
    pub count: usize,
}

/// Counts of `(actual, predicted)` class pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfusionMatrix {
    num_classes: usize,
    counts: Vec<usize>,
}

impl ConfusionMatrix {
    /// Creates an empty `num_classes` by `num_classes` matrix.
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            counts: vec![0; num_classes * num_classes],
        }
    }

    /// Builds the matrix out of parallel label and prediction vectors.
    ///
    /// # Arguments
    /// * `labels` - The actual class of every example.
    /// * `predictions` - The predicted class of every example.
    /// * `num_classes` - The amount of classes.
    ///
    /// # Returns
    /// An error if the vectors differ in length or hold a class out of range.
    pub fn from_predictions(
        labels: &[usize],
        predictions: &[usize],
        num_classes: usize,
    ) -> Result<Self> {
        if labels.len() != predictions.len() {
            return Err(MlErr::SizeMismatch {
                what: "predictions",
                got: predictions.len(),
                expected: labels.len(),
            });
        }

        let mut matrix = Self::new(num_classes);
        for (&actual, &predicted) in labels.iter().zip(predictions) {
            matrix.record(actual, predicted)?;
        }

        Ok(matrix)
    }

    pub fn record(&mut self, actual: usize, predicted: usize) -> Result<()> {
        let class = actual.max(predicted);
        if class >= self.num_classes {
            return Err(MlErr::SizeMismatch {
                what: "class index",
                got: class,
                expected: self.num_classes,
            });
        }

        self.counts[actual * self.num_classes + predicted] += 1;
        Ok(())
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// How many examples of class `actual` were predicted as `predicted`.
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual * self.num_classes + predicted]
    }

    /// The counts of a single actual class, indexed by predicted class.
    pub fn row(&self, actual: usize) -> &[usize] {
        &self.counts[actual * self.num_classes..][..self.num_classes]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn accuracy(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.;
        }

        let hits: usize = (0..self.num_classes).map(|c| self.get(c, c)).sum();
        hits as f32 / total as f32
    }

    pub fn per_class_accuracy(&self) -> Vec<ClassAccuracy> {
        (0..self.num_classes)
            .map(|class| {
                let count: usize = self.row(class).iter().sum();
                let hits = self.get(class, class);

                ClassAccuracy {
                    class,
                    accuracy: if count == 0 { 0. } else { hits as f32 / count as f32 },
                    count,
                }
            })
            .collect()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "     ")?;
        for predicted in 0..self.num_classes {
            write!(f, "{predicted:>6}")?;
        }

        for actual in 0..self.num_classes {
            write!(f, "\n{actual:>5}")?;
            for count in self.row(actual) {
                write!(f, "{count:>6}")?;
            }
        }

        Ok(())
    }
}
