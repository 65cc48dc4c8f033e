use std::mem;

use ndarray::{Array2, ArrayView2};

use super::layers::Layer;
use crate::{MlErr, Result};

/// A sequential network: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The network holds no parameters, they live in a flat buffer which is split in as many
/// consecutive chunks as layers, each one as long as that layer's `size`.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Returns the amount of parameters in the network.
    pub fn size(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The parameters of the whole network.
    /// * `x` - The input data, one example per row.
    ///
    /// # Returns
    /// The output of the last layer or an error if occurred.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_size(params.len())?;

        let mut rest = params;
        let mut out = x.to_owned();

        for layer in self.layers.iter_mut() {
            let (params, tail) = rest.split_at(layer.size());
            out = layer.forward(params, out.view())?;
            rest = tail;
        }

        Ok(out)
    }

    /// Propagates `d`, the delta w.r.t. the output of the last forward pass, back through
    /// the network. Each layer writes its own chunk of `grad`.
    ///
    /// # Returns
    /// The delta w.r.t. the network's input.
    pub fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<Array2<f32>> {
        self.check_size(params.len())?;
        self.check_size(grad.len())?;

        let mut params_rest = params;
        let mut grad_rest = grad;
        let mut d = d;

        for layer in self.layers.iter_mut().rev() {
            let at = params_rest.len() - layer.size();
            let (params_head, params) = params_rest.split_at(at);
            let (grad_head, grad) = mem::take(&mut grad_rest).split_at_mut(at);

            d = layer.backward(params, grad, d)?;

            params_rest = params_head;
            grad_rest = grad_head;
        }

        Ok(d)
    }

    fn check_size(&self, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what: "network parameters",
                got,
                expected,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::arch::{activations::ActFn, layers::MapShape};

    #[test]
    fn size_adds_up_the_layers() {
        let net = Sequential::new([
            Layer::conv2d(MapShape::new(4, 4, 1), 2, 3, Some(ActFn::relu())),
            Layer::max_pool2d(MapShape::new(2, 2, 2), 2, 2),
            Layer::flatten(MapShape::new(1, 1, 2)),
            Layer::dense((2, 3), None),
        ]);

        assert_eq!(net.size(), (9 + 1) * 2 + (2 + 1) * 3);
    }

    #[test]
    fn forward_chains_dense_layers() {
        let mut net = Sequential::new([Layer::dense((2, 2), None), Layer::dense((2, 1), None)]);
        let params = [
            1., 0., 0., 1., 1., 1., // identity plus one
            2., 3., 0.5, // 2a + 3b + 0.5
        ];

        let y = net.forward(&params, array![[1., 2.]].view()).unwrap();
        assert_eq!(y, array![[2. * 2. + 3. * 3. + 0.5]]);
    }

    #[test]
    fn backward_fills_every_chunk_of_the_gradient() {
        let mut net = Sequential::new([Layer::dense((2, 2), None), Layer::dense((2, 1), None)]);
        let params = [1., 0., 0., 1., 1., 1., 2., 3., 0.5];
        let mut grad = [0.; 9];

        net.forward(&params, array![[1., 2.]].view()).unwrap();
        let dx = net.backward(&params, &mut grad, array![[1.]]).unwrap();

        // Second layer sees [2, 3] as input, the first one [1, 2] and a delta of [2, 3].
        assert_eq!(grad, [2., 3., 4., 6., 2., 3., 2., 3., 1.]);
        assert_eq!(dx, array![[2., 3.]]);
    }

    #[test]
    fn wrong_parameter_count_is_rejected() {
        let mut net = Sequential::new([Layer::dense((2, 2), None)]);
        let err = net.forward(&[0.; 5], array![[1., 2.]].view()).unwrap_err();

        assert!(matches!(
            err,
            MlErr::SizeMismatch { got: 5, expected: 6, .. }
        ));
    }
}
