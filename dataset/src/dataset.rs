use crate::{DatasetErr, Result};

/// The full, unsplit decoded dataset.
///
/// Holds two parallel row-major buffers:
/// - `images`: `len * image_size` floats in `[0, 1]`.
/// - `labels`: `len * num_classes` one-hot bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDataset {
    images: Vec<f32>,
    labels: Vec<u8>,
    image_size: usize,
    num_classes: usize,
    len: usize,
}

impl DecodedDataset {
    /// Creates a new dataset from owned buffers.
    ///
    /// # Arguments
    /// * `images` - The flattened, normalized images.
    /// * `labels` - The flattened one-hot labels.
    /// * `image_size` - The amount of pixels per image.
    /// * `num_classes` - The amount of classes per label.
    ///
    /// # Returns
    /// A new `DecodedDataset` or an error if both buffers don't describe the same amount of examples.
    pub fn new(
        images: Vec<f32>,
        labels: Vec<u8>,
        image_size: usize,
        num_classes: usize,
    ) -> Result<Self> {
        if image_size == 0 || images.len() % image_size != 0 {
            return Err(DatasetErr::SizeMismatch {
                what: "images",
                got: images.len(),
                expected: image_size * (images.len() / image_size.max(1)),
            });
        }

        let len = images.len() / image_size;

        if labels.len() != len * num_classes {
            return Err(DatasetErr::SizeMismatch {
                what: "labels",
                got: labels.len(),
                expected: len * num_classes,
            });
        }

        Ok(Self {
            images,
            labels,
            image_size,
            num_classes,
            len,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn image_size(&self) -> usize {
        self.image_size
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    #[inline]
    pub fn images(&self) -> &[f32] {
        &self.images
    }

    #[inline]
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Returns the image and label rows of the example at `idx` (panics if out of bounds).
    #[inline]
    pub fn example(&self, idx: usize) -> (&[f32], &[u8]) {
        let image = &self.images[idx * self.image_size..(idx + 1) * self.image_size];
        let label = &self.labels[idx * self.num_classes..(idx + 1) * self.num_classes];
        (image, label)
    }
}
