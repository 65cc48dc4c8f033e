use std::{fmt, ops::Range};

use rand::{Rng, seq::SliceRandom};

use crate::{DatasetErr, DecodedDataset, Result};

/// One side of the train/test split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Train,
    Test,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Train => f.write_str("TRAIN"),
            Partition::Test => f.write_str("TEST"),
        }
    }
}

/// Splits `total` examples into a train prefix and a test suffix.
///
/// Properties:
/// - `train = floor(ratio * total)` and `train + test == total`.
///
/// # Returns
/// The `(train, test)` counts or an error if `ratio` is not in `(0, 1)`.
pub fn split_counts(total: usize, ratio: f64) -> Result<(usize, usize)> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(DatasetErr::InvalidRatio(ratio));
    }

    let train = (ratio * total as f64).floor() as usize;
    Ok((train, total - train))
}

/// Creates a shuffled permutation of `[0, n)`.
pub fn shuffled_indices<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices
}

/// A decoded dataset split into train and test partitions.
///
/// Each partition gets a single shuffled ordering at construction time which is reused
/// for every batch drawn during the session.
#[derive(Debug, Clone)]
pub struct PartitionedDataset {
    dataset: DecodedDataset,
    train_count: usize,
    train_indices: Vec<usize>,
    test_indices: Vec<usize>,
}

impl PartitionedDataset {
    /// Creates a new `PartitionedDataset`.
    ///
    /// # Arguments
    /// * `dataset` - The full decoded dataset.
    /// * `ratio` - The share of examples that go to the train partition.
    /// * `rng` - The random number generator used to shuffle both orderings.
    ///
    /// # Returns
    /// A new `PartitionedDataset` or an error if the ratio is invalid.
    pub fn new<R: Rng + ?Sized>(dataset: DecodedDataset, ratio: f64, rng: &mut R) -> Result<Self> {
        let (train_count, test_count) = split_counts(dataset.len(), ratio)?;

        let train_indices = shuffled_indices(train_count, rng);
        let test_indices = shuffled_indices(test_count, rng);

        log::info!("partitioned dataset: train={train_count} test={test_count}");

        Ok(Self {
            dataset,
            train_count,
            train_indices,
            test_indices,
        })
    }

    /// Returns the range of example positions a partition covers in the full dataset.
    #[inline]
    pub fn range(&self, which: Partition) -> Range<usize> {
        match which {
            Partition::Train => 0..self.train_count,
            Partition::Test => self.train_count..self.dataset.len(),
        }
    }

    #[inline]
    pub fn len(&self, which: Partition) -> usize {
        self.range(which).len()
    }

    /// Returns the fixed shuffled ordering of a partition.
    #[inline]
    pub fn indices(&self, which: Partition) -> &[usize] {
        match which {
            Partition::Train => &self.train_indices,
            Partition::Test => &self.test_indices,
        }
    }

    #[inline]
    pub fn image_size(&self) -> usize {
        self.dataset.image_size()
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.dataset.num_classes()
    }

    #[inline]
    pub fn dataset(&self) -> &DecodedDataset {
        &self.dataset
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn dataset(n: usize) -> DecodedDataset {
        let images = (0..n).map(|i| i as f32).collect();
        let labels = (0..n).flat_map(|i| [(i % 2 == 0) as u8, (i % 2 == 1) as u8]).collect();
        DecodedDataset::new(images, labels, 1, 2).unwrap()
    }

    #[test]
    fn counts_always_cover_the_dataset() {
        for total in [1, 2, 7, 100, 65000] {
            for ratio in [0.01, 0.25, 0.5, 5. / 6., 0.99] {
                let (train, test) = split_counts(total, ratio).unwrap();
                assert_eq!(train + test, total);
                assert_eq!(train, (ratio * total as f64).floor() as usize);
            }
        }
    }

    #[test]
    fn reference_split() {
        assert_eq!(split_counts(65000, 5. / 6.).unwrap(), (54166, 10834));
    }

    #[test]
    fn ratio_outside_the_open_interval_is_rejected() {
        for ratio in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                split_counts(10, ratio),
                Err(DatasetErr::InvalidRatio(_))
            ));
        }
    }

    #[test]
    fn shuffled_indices_are_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut indices = shuffled_indices(50, &mut rng);
        indices.sort_unstable();
        assert_eq!(indices, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn train_is_the_prefix_and_test_the_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        let ds = PartitionedDataset::new(dataset(10), 0.7, &mut rng).unwrap();

        assert_eq!(ds.range(Partition::Train), 0..7);
        assert_eq!(ds.range(Partition::Test), 7..10);
        assert_eq!(ds.indices(Partition::Train).len(), 7);
        assert_eq!(ds.indices(Partition::Test).len(), 3);
    }

    #[test]
    fn same_seed_same_orderings() {
        let a = PartitionedDataset::new(dataset(20), 0.5, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = PartitionedDataset::new(dataset(20), 0.5, &mut StdRng::seed_from_u64(3)).unwrap();

        assert_eq!(a.indices(Partition::Train), b.indices(Partition::Train));
        assert_eq!(a.indices(Partition::Test), b.indices(Partition::Test));
    }
}
