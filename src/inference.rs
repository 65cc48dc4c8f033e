use dataset::{Partition, PartitionedDataset};
use image::DynamicImage;
use machine_learning::{
    DigitClassifier,
    arch::{IMAGE_SHAPE, NUM_CLASSES},
    evaluation::{ClassAccuracy, ConfusionMatrix},
    training::argmax,
};
use ndarray::{Array2, Array4};

use crate::{RecognizerErr, Result, training::to_images};

/// The label of every class, by class index.
pub const LABELS: [&str; NUM_CLASSES] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// The side of a captured image.
pub const IMAGE_SIDE: usize = 28;

/// A single drawn digit: 28x28 grayscale pixels in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedImage {
    pixels: Vec<u8>,
}

impl CapturedImage {
    /// Creates a new `CapturedImage` out of one byte per pixel.
    ///
    /// # Returns
    /// An error unless there are exactly 28x28 pixels.
    pub fn from_gray(pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != IMAGE_SIDE * IMAGE_SIDE {
            return Err(RecognizerErr::ImageSize {
                width: pixels.len() as u32,
                height: 1,
            });
        }

        Ok(Self { pixels })
    }

    /// Creates a new `CapturedImage` out of RGBA pixels, only the first channel is kept.
    pub fn from_rgba(rgba: &[u8]) -> Result<Self> {
        if rgba.len() != IMAGE_SIDE * IMAGE_SIDE * 4 {
            return Err(RecognizerErr::ImageSize {
                width: (rgba.len() / 4) as u32,
                height: 1,
            });
        }

        Ok(Self {
            pixels: rgba.chunks_exact(4).map(|px| px[0]).collect(),
        })
    }

    /// Creates a new `CapturedImage` out of a decoded 28x28 image, reading its red channel.
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        if (width as usize, height as usize) != (IMAGE_SIDE, IMAGE_SIDE) {
            return Err(RecognizerErr::ImageSize { width, height });
        }

        Self::from_rgba(image.to_rgba8().as_raw())
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Classifies a single captured image.
///
/// Pixels are scaled to `[0, 1]` like the decoded dataset and fed as a `[1, 28, 28, 1]`
/// batch.
///
/// # Returns
/// The label of the most likely class.
pub fn predict(model: &mut DigitClassifier, image: &CapturedImage) -> Result<&'static str> {
    let class = {
        let x = Array4::from_shape_fn((1, IMAGE_SIDE, IMAGE_SIDE, 1), |(_, y, x, _)| {
            f32::from(image.pixels[y * IMAGE_SIDE + x]) / 255.
        });
        let classes = model.predict_classes(x.view())?;
        classes.first().copied().unwrap_or_default()
    };

    Ok(LABELS.get(class).copied().unwrap_or(LABELS[0]))
}

/// Predicted and actual classes of a set of test examples, position by position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredictionSet {
    pub predictions: Vec<usize>,
    pub labels: Vec<usize>,
}

/// Classifies `test_size` examples of the test partition.
pub fn do_prediction(
    model: &mut DigitClassifier,
    data: &PartitionedDataset,
    test_size: usize,
) -> Result<PredictionSet> {
    let batch = data.next_batch(Partition::Test, test_size)?;
    let labels = argmax(batch.targets.view());

    let (x, _) = to_images(batch)?;
    let predictions = model.predict_classes(x.view())?;

    Ok(PredictionSet {
        predictions,
        labels,
    })
}

/// How well a model does on the test partition.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub accuracy: f32,
    pub confusion: ConfusionMatrix,
    pub per_class: Vec<ClassAccuracy>,
}

/// Builds the confusion matrix and the per-class accuracy over `test_size` test examples.
pub fn evaluate(
    model: &mut DigitClassifier,
    data: &PartitionedDataset,
    test_size: usize,
) -> Result<Evaluation> {
    let PredictionSet {
        predictions,
        labels,
    } = do_prediction(model, data, test_size)?;
    let confusion = ConfusionMatrix::from_predictions(&labels, &predictions, NUM_CLASSES)?;

    Ok(Evaluation {
        accuracy: confusion.accuracy(),
        per_class: confusion.per_class_accuracy(),
        confusion,
    })
}

/// A test example ready to be displayed.
#[derive(Clone, Debug, PartialEq)]
pub struct ExampleImage {
    /// `[28, 28]` intensities in `[0, 1]`.
    pub pixels: Array2<f32>,
    pub label: &'static str,
}

/// The examples a batch of `n` test examples starts with.
pub fn example_images(data: &PartitionedDataset, n: usize) -> Result<Vec<ExampleImage>> {
    let batch = data.next_batch(Partition::Test, n)?;
    let labels = argmax(batch.targets.view());

    batch
        .inputs
        .outer_iter()
        .zip(labels)
        .map(|(row, class)| -> Result<ExampleImage> {
            let pixels = row
                .to_owned()
                .into_shape_with_order((IMAGE_SHAPE.h, IMAGE_SHAPE.w))?;

            Ok(ExampleImage {
                pixels,
                label: LABELS.get(class).copied().unwrap_or(LABELS[0]),
            })
        })
        .collect()
}
