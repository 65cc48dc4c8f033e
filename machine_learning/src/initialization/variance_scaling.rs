use rand::Rng;
use rand_distr::Distribution;

use super::TruncatedNormal;
use crate::arch::layers::Layer;

/// Generates the initial parameters of a network with fan-in variance scaling.
///
/// Every layer's weights are drawn from a truncated normal with a standard deviation of
/// `sqrt(1 / fan_in)` and its biases start at zero.
///
/// # Arguments
/// * `layers` - The layers of the network, in order.
/// * `rng` - A random number generator.
///
/// # Returns
/// A flat buffer with the parameters of every layer, one after the other.
pub fn variance_scaling<R: Rng + ?Sized>(layers: &[Layer], rng: &mut R) -> Vec<f32> {
    let size = layers.iter().map(Layer::size).sum();
    let mut params = Vec::with_capacity(size);

    for layer in layers.iter().filter(|layer| layer.size() > 0) {
        let dist = TruncatedNormal::new((1. / layer.fan_in().max(1) as f32).sqrt());
        let weights = layer.weights_len();

        params.extend((0..weights).map(|_| dist.sample(rng)));
        params.extend(std::iter::repeat_n(0., layer.size() - weights));
    }

    params
}
