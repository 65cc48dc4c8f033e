use ndarray::{Array2, ArrayView2, ArrayView4, Axis, CowArray, Ix2};
use rand::Rng;

use super::{Sequential, layers::MapShape, loss::LossFn};
use crate::{
    MlErr, Result,
    initialization,
    optimization::Optimizer,
    training::{StepStats, count_correct},
};

/// Batches larger than this are run in pieces when only predicting.
const INFERENCE_CHUNK: usize = 512;

/// One row of a model summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerSummary {
    pub name: &'static str,
    pub output_shape: Vec<usize>,
    pub params: usize,
}

/// A network bound to its parameters, its optimizer and its loss function.
///
/// Inputs are `[n, h, w, c]` batches of maps matching `input_shape`, outputs are
/// `[n, classes]`.
#[derive(Clone, Debug)]
pub struct Model<O: Optimizer, L: LossFn> {
    network: Sequential,
    input: MapShape,
    params: Vec<f32>,
    grad: Vec<f32>,
    optimizer: O,
    loss_fn: L,
}

impl<O: Optimizer, L: LossFn> Model<O, L> {
    /// Creates a new `Model` with variance scaled initial parameters.
    ///
    /// # Arguments
    /// * `network` - The layers of the model.
    /// * `input` - The shape of a single input example.
    /// * `optimizer` - The optimizer, sized for `network.size()` parameters.
    /// * `loss_fn` - The loss minimized while training.
    /// * `rng` - The source of the initial parameters.
    pub fn new<R: Rng + ?Sized>(
        network: Sequential,
        input: MapShape,
        optimizer: O,
        loss_fn: L,
        rng: &mut R,
    ) -> Self {
        let params = initialization::variance_scaling(network.layers(), rng);

        Self {
            grad: vec![0.; params.len()],
            network,
            input,
            params,
            optimizer,
            loss_fn,
        }
    }

    /// Creates a new `Model` out of explicit parameters.
    ///
    /// # Returns
    /// An error if `params` doesn't hold exactly `network.size()` values.
    pub fn with_params(
        network: Sequential,
        input: MapShape,
        params: Vec<f32>,
        optimizer: O,
        loss_fn: L,
    ) -> Result<Self> {
        if params.len() != network.size() {
            return Err(MlErr::SizeMismatch {
                what: "model parameters",
                got: params.len(),
                expected: network.size(),
            });
        }

        Ok(Self {
            grad: vec![0.; params.len()],
            network,
            input,
            params,
            optimizer,
            loss_fn,
        })
    }

    /// Returns the amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Runs the model over a batch of examples.
    ///
    /// # Returns
    /// The output of the network, one row per example.
    pub fn predict(&mut self, x: ArrayView4<f32>) -> Result<Array2<f32>> {
        let x = self.flatten_input(x)?;
        let mut chunks = Vec::new();

        for chunk in x.axis_chunks_iter(Axis(0), INFERENCE_CHUNK) {
            chunks.push(self.network.forward(&self.params, chunk)?);
        }

        match chunks.len() {
            0 => return Ok(Array2::zeros((0, self.output_len()))),
            1 => return Ok(chunks.remove(0)),
            _ => {}
        }

        let views: Vec<_> = chunks.iter().map(|c| c.view()).collect();

        Ok(ndarray::concatenate(Axis(0), &views)?)
    }

    /// The predicted class of every example.
    pub fn predict_classes(&mut self, x: ArrayView4<f32>) -> Result<Vec<usize>> {
        let y_pred = self.predict(x)?;
        Ok(crate::training::argmax(y_pred.view()))
    }

    /// Takes one optimization step over a batch.
    ///
    /// # Arguments
    /// * `x` - The input examples.
    /// * `y` - The one-hot targets.
    ///
    /// # Returns
    /// The loss and hits the batch had *before* the step.
    pub fn train_step(&mut self, x: ArrayView4<f32>, y: ArrayView2<f32>) -> Result<StepStats> {
        let x = self.flatten_input(x)?;
        self.check_targets(x.nrows(), y)?;

        if x.nrows() == 0 {
            return Err(MlErr::EmptyBatch);
        }

        let y_pred = self.network.forward(&self.params, x.view())?;
        let loss = self.loss_fn.loss(y_pred.view(), y);
        let stats = StepStats::new(loss, count_correct(y_pred.view(), y), x.nrows());

        let d = self.loss_fn.loss_prime(y_pred.view(), y);
        self.network.backward(&self.params, &mut self.grad, d)?;
        self.optimizer.update_params(&self.grad, &mut self.params)?;

        Ok(stats)
    }

    /// Measures the loss and hits over a batch without touching the parameters.
    pub fn evaluate(&mut self, x: ArrayView4<f32>, y: ArrayView2<f32>) -> Result<StepStats> {
        self.check_targets(x.len_of(Axis(0)), y)?;

        let y_pred = self.predict(x)?;
        let loss = self.loss_fn.loss(y_pred.view(), y);
        Ok(StepStats::new(loss, count_correct(y_pred.view(), y), y.nrows()))
    }

    /// Describes every layer: its name, the shape of its output and its amount of parameters.
    pub fn summary(&self) -> Vec<LayerSummary> {
        self.network
            .layers()
            .iter()
            .map(|layer| LayerSummary {
                name: layer.name(),
                output_shape: layer.output_shape(),
                params: layer.size(),
            })
            .collect()
    }

    fn output_len(&self) -> usize {
        self.network
            .layers()
            .last()
            .map_or(self.input.len(), |layer| layer.output_len())
    }

    /// Checks `x` against the input shape and turns it into `[n, h * w * c]` rows.
    fn flatten_input<'a>(&self, x: ArrayView4<'a, f32>) -> Result<CowArray<'a, f32, Ix2>> {
        let (n, h, w, c) = x.dim();
        let got = MapShape::new(h, w, c);

        if got != self.input {
            return Err(MlErr::SizeMismatch {
                what: "input example",
                got: got.len(),
                expected: self.input.len(),
            });
        }

        let rows = (n, got.len());
        if x.is_standard_layout() {
            return Ok(CowArray::from(x.into_shape_with_order(rows)?));
        }

        let x = x.as_standard_layout().into_owned();
        Ok(CowArray::from(x.into_shape_with_order(rows)?))
    }

    fn check_targets(&self, n: usize, y: ArrayView2<f32>) -> Result<()> {
        if y.nrows() != n {
            return Err(MlErr::SizeMismatch {
                what: "target rows",
                got: y.nrows(),
                expected: n,
            });
        }

        let classes = self.output_len();
        if y.ncols() != classes {
            return Err(MlErr::SizeMismatch {
                what: "target classes",
                got: y.ncols(),
                expected: classes,
            });
        }

        Ok(())
    }
}
