use ndarray::{Array2, ArrayView2};

use super::MapShape;
use crate::{Result, arch::activations::ActFn};

/// Every layer a `Sequential` can hold.
///
/// All of them consume and produce `[batch, features]` matrices, maps travel flattened
/// in `(y, x, c)` order.
#[derive(Clone, Debug)]
pub enum Layer {
    Conv2d(super::Conv2d),
    MaxPool2d(super::MaxPool2d),
    Flatten(super::Flatten),
    Dense(super::Dense),
}
use Layer::*;

impl Layer {
    pub fn conv2d(input: MapShape, filters: usize, kernel: usize, act_fn: Option<ActFn>) -> Self {
        Conv2d(super::Conv2d::new(input, filters, kernel, act_fn))
    }

    pub fn max_pool2d(input: MapShape, pool: usize, stride: usize) -> Self {
        MaxPool2d(super::MaxPool2d::new(input, pool, stride))
    }

    pub fn flatten(input: MapShape) -> Self {
        Flatten(super::Flatten::new(input))
    }

    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Dense(super::Dense::new(dim, act_fn))
    }

    /// Returns the amount of parameters of this layer.
    pub fn size(&self) -> usize {
        match self {
            Conv2d(l) => l.size(),
            Dense(l) => l.size(),
            MaxPool2d(_) | Flatten(_) => 0,
        }
    }

    /// Returns how many of this layer's leading parameters are weights, the rest are biases.
    pub fn weights_len(&self) -> usize {
        match self {
            Conv2d(l) => l.size() - l.output().c,
            Dense(l) => l.dim().0 * l.dim().1,
            MaxPool2d(_) | Flatten(_) => 0,
        }
    }

    /// Returns the amount of inputs feeding each output of this layer.
    pub fn fan_in(&self) -> usize {
        match self {
            Conv2d(l) => l.fan_in(),
            Dense(l) => l.dim().0,
            MaxPool2d(_) | Flatten(_) => 0,
        }
    }

    pub fn input_len(&self) -> usize {
        match self {
            Conv2d(l) => l.input().len(),
            MaxPool2d(l) => l.input().len(),
            Flatten(l) => l.input().len(),
            Dense(l) => l.dim().0,
        }
    }

    /// The shape of this layer's output, maps report `[h, w, c]` and vectors `[n]`.
    pub fn output_shape(&self) -> Vec<usize> {
        match self {
            Conv2d(l) => vec![l.output().h, l.output().w, l.output().c],
            MaxPool2d(l) => vec![l.output().h, l.output().w, l.output().c],
            Flatten(l) => vec![l.input().len()],
            Dense(l) => vec![l.dim().1],
        }
    }

    pub fn output_len(&self) -> usize {
        self.output_shape().iter().product()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Conv2d(_) => "conv2d",
            MaxPool2d(_) => "max_pooling2d",
            Flatten(_) => "flatten",
            Dense(_) => "dense",
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Conv2d(l) => l.forward(params, x),
            MaxPool2d(l) => l.forward(x),
            Flatten(l) => l.forward(x),
            Dense(l) => l.forward(params, x),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Conv2d(l) => l.backward(params, grad, d),
            MaxPool2d(l) => l.backward(d),
            Flatten(l) => l.backward(d),
            Dense(l) => l.backward(params, grad, d),
        }
    }
}
