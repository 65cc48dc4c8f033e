use ndarray::{Array2, ArrayView1};

use crate::{DatasetErr, Partition, PartitionedDataset, Result};

/// Position of the shuffled ordering the batch walk starts at. The walk never
/// includes the first shuffled example of a partition.
pub const BATCH_INDEX_OFFSET: usize = 1;

/// An owned batch of examples.
///
/// - `inputs`: `[batch_size, image_size]`
/// - `targets`: `[batch_size, num_classes]`, one-hot
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Array2<f32>,
    pub targets: Array2<f32>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inputs.nrows() == 0
    }
}

impl PartitionedDataset {
    /// Draws a batch from a partition following its fixed shuffled ordering.
    ///
    /// Row `i` of the batch holds the example at `indices[i + BATCH_INDEX_OFFSET]`, so two
    /// calls with the same size return the same examples.
    ///
    /// # Arguments
    /// * `which` - The partition to read from.
    /// * `batch_size` - The amount of examples to copy.
    ///
    /// # Returns
    /// A new `Batch` or an error if the partition can't provide `batch_size` examples.
    pub fn next_batch(&self, which: Partition, batch_size: usize) -> Result<Batch> {
        let indices = self.indices(which);
        let available = indices.len().saturating_sub(BATCH_INDEX_OFFSET);

        if batch_size > available {
            return Err(DatasetErr::BatchSizeExceeded {
                requested: batch_size,
                available,
            });
        }

        let start = self.range(which).start;
        let mut inputs = Array2::zeros((batch_size, self.image_size()));
        let mut targets = Array2::zeros((batch_size, self.num_classes()));

        let rows = inputs.outer_iter_mut().zip(targets.outer_iter_mut());
        for (&idx, (mut x, mut y)) in indices[BATCH_INDEX_OFFSET..].iter().zip(rows) {
            let (image, label) = self.dataset().example(start + idx);

            x.assign(&ArrayView1::from(image));
            y.iter_mut()
                .zip(label)
                .for_each(|(t, &l)| *t = f32::from(l));
        }

        Ok(Batch { inputs, targets })
    }
}
