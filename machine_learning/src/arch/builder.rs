use rand::Rng;

use super::{
    Model, Sequential,
    activations::ActFn,
    layers::{Layer, MapShape},
    loss::CategoricalCrossEntropy,
};
use crate::optimization::Adam;

/// The shape of a single digit image: 28x28 with one channel.
pub const IMAGE_SHAPE: MapShape = MapShape::new(28, 28, 1);

/// The amount of digit classes.
pub const NUM_CLASSES: usize = 10;

/// A digit classifier as built by `build_digit_classifier`.
pub type DigitClassifier = Model<Adam, CategoricalCrossEntropy>;

/// Builds the convolutional digit classifier with fresh parameters.
///
/// ```text
/// conv2d   5x5, 8 filters, relu   -> 24x24x8
/// max pool 2x2, stride 2          -> 12x12x8
/// conv2d   5x5, 16 filters, relu  -> 8x8x16
/// max pool 2x2, stride 2          -> 4x4x16
/// flatten                         -> 256
/// dense    10, softmax            -> 10
/// ```
///
/// Trains with Adam and categorical cross-entropy.
///
/// # Arguments
/// * `rng` - The source of the initial parameters.
pub fn build_digit_classifier<R: Rng + ?Sized>(rng: &mut R) -> DigitClassifier {
    let conv1 = Layer::conv2d(IMAGE_SHAPE, 8, 5, Some(ActFn::relu()));
    let pool1 = Layer::max_pool2d(MapShape::new(24, 24, 8), 2, 2);
    let conv2 = Layer::conv2d(MapShape::new(12, 12, 8), 16, 5, Some(ActFn::relu()));
    let pool2 = Layer::max_pool2d(MapShape::new(8, 8, 16), 2, 2);
    let flatten = Layer::flatten(MapShape::new(4, 4, 16));
    let dense = Layer::dense((256, NUM_CLASSES), Some(ActFn::softmax()));

    let network = Sequential::new([conv1, pool1, conv2, pool2, flatten, dense]);
    let optimizer = Adam::with_defaults(network.size());

    Model::new(
        network,
        IMAGE_SHAPE,
        optimizer,
        CategoricalCrossEntropy::new(),
        rng,
    )
}
