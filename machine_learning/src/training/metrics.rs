use std::fmt;

use ndarray::{ArrayView2, Axis};

/// Loss and hits accumulated over one or more batches.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    /// Sum of the per-example losses.
    pub loss_sum: f32,
    pub correct: usize,
    pub count: usize,
}

impl StepStats {
    /// Creates the stats of a single batch out of its mean loss.
    pub fn new(mean_loss: f32, correct: usize, count: usize) -> Self {
        Self {
            loss_sum: mean_loss * count as f32,
            correct,
            count,
        }
    }

    pub fn merge(&mut self, other: StepStats) {
        self.loss_sum += other.loss_sum;
        self.correct += other.correct;
        self.count += other.count;
    }

    pub fn loss(&self) -> f32 {
        if self.count == 0 {
            return 0.;
        }

        self.loss_sum / self.count as f32
    }

    pub fn accuracy(&self) -> f32 {
        if self.count == 0 {
            return 0.;
        }

        self.correct as f32 / self.count as f32
    }
}

/// What a single epoch of training measured.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochMetrics {
    /// One based.
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
}

impl fmt::Display for EpochMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch {}: loss {:.4} acc {:.4}",
            self.epoch, self.loss, self.accuracy
        )?;

        if let (Some(loss), Some(acc)) = (self.val_loss, self.val_accuracy) {
            write!(f, " val_loss {loss:.4} val_acc {acc:.4}")?;
        }

        Ok(())
    }
}

/// Index of the largest value of each row, the first one wins on ties.
pub fn argmax(values: ArrayView2<f32>) -> Vec<usize> {
    values
        .axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = i;
                }
            }
            best
        })
        .collect()
}

/// The amount of rows whose predicted class matches the one-hot target's.
pub fn count_correct(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> usize {
    argmax(y_pred)
        .into_iter()
        .zip(argmax(y))
        .filter(|(p, t)| p == t)
        .count()
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn merged_stats_weight_by_batch_size() {
        let mut stats = StepStats::new(1., 3, 4);
        stats.merge(StepStats::new(4., 0, 1));

        assert_eq!(stats.loss(), 8. / 5.);
        assert_eq!(stats.accuracy(), 3. / 5.);
    }

    #[test]
    fn empty_stats() {
        let stats = StepStats::default();
        assert_eq!(stats.loss(), 0.);
        assert_eq!(stats.accuracy(), 0.);
    }

    #[test]
    fn counts_hits() {
        let y_pred = array![[0.9, 0.1], [0.3, 0.7], [0.5, 0.5]];
        let y = array![[1., 0.], [1., 0.], [1., 0.]];

        assert_eq!(argmax(y_pred.view()), [0, 1, 0]);
        assert_eq!(count_correct(y_pred.view(), y.view()), 2);
    }
}
