use std::num::NonZeroUsize;

use log::{debug, warn};
use ndarray::{ArrayView2, ArrayView4, Axis};
use rand::{Rng, seq::SliceRandom};

use super::{EpochMetrics, StepStats};
use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn},
    optimization::Optimizer,
};

/// How a `Fit` walks over its training data.
#[derive(Clone, Copy, Debug)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: NonZeroUsize,
    /// Whether the training examples are reshuffled before every epoch.
    pub shuffle: bool,
}

/// A training run, one item per epoch.
///
/// Nothing is trained until the iterator is advanced, each `next` runs a whole epoch. The run
/// ends after `epochs` items or right after the first error.
pub struct Fit<'a, O, L, R>
where
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    model: &'a mut Model<O, L>,
    x: ArrayView4<'a, f32>,
    y: ArrayView2<'a, f32>,
    validation: Option<(ArrayView4<'a, f32>, ArrayView2<'a, f32>)>,
    config: FitConfig,
    rng: R,

    order: Vec<usize>,
    epoch: usize,
    done: bool,
}

impl<'a, O, L, R> Fit<'a, O, L, R>
where
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Creates a new `Fit`.
    ///
    /// # Arguments
    /// * `model` - The model to train.
    /// * `x`, `y` - The training examples and their one-hot targets.
    /// * `validation` - Examples measured after every epoch, never trained on.
    /// * `config` - The amount of epochs and the mini-batch size.
    /// * `rng` - Shuffles the training examples.
    pub fn new(
        model: &'a mut Model<O, L>,
        x: ArrayView4<'a, f32>,
        y: ArrayView2<'a, f32>,
        validation: Option<(ArrayView4<'a, f32>, ArrayView2<'a, f32>)>,
        config: FitConfig,
        rng: R,
    ) -> Self {
        Self {
            order: (0..x.len_of(Axis(0))).collect(),
            model,
            x,
            y,
            validation,
            config,
            rng,
            epoch: 0,
            done: false,
        }
    }

    fn run_epoch(&mut self) -> Result<EpochMetrics> {
        if self.order.is_empty() {
            return Err(MlErr::EmptyBatch);
        }

        if self.y.nrows() != self.order.len() {
            return Err(MlErr::SizeMismatch {
                what: "training targets",
                got: self.y.nrows(),
                expected: self.order.len(),
            });
        }

        if self.config.shuffle {
            self.order.shuffle(&mut self.rng);
        }

        let mut train = StepStats::default();
        for batch in self.order.chunks(self.config.batch_size.get()) {
            let x = self.x.select(Axis(0), batch);
            let y = self.y.select(Axis(0), batch);
            train.merge(self.model.train_step(x.view(), y.view())?);
        }

        let epoch = self.epoch + 1;
        let loss = train.loss();
        if !loss.is_finite() {
            return Err(MlErr::TrainingFailed { epoch, loss });
        }

        let val = match self.validation {
            Some((x, y)) => Some(self.model.evaluate(x, y)?),
            None => None,
        };

        Ok(EpochMetrics {
            epoch,
            loss,
            accuracy: train.accuracy(),
            val_loss: val.map(|v| v.loss()),
            val_accuracy: val.map(|v| v.accuracy()),
        })
    }
}

impl<O, L, R> Iterator for Fit<'_, O, L, R>
where
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    type Item = Result<EpochMetrics>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.epoch >= self.config.epochs {
            return None;
        }

        let metrics = self.run_epoch();
        self.epoch += 1;

        match &metrics {
            Ok(m) => debug!(epoch = m.epoch, loss = m.loss; "epoch done"),
            Err(e) => {
                warn!(epoch = self.epoch; "training stopped: {e}");
                self.done = true;
            }
        }

        Some(metrics)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }

        let left = self.config.epochs.saturating_sub(self.epoch);
        (0, Some(left))
    }
}

impl<O: Optimizer, L: LossFn> Model<O, L> {
    /// Starts a training run over the given examples.
    ///
    /// See `Fit` for how the run progresses.
    pub fn fit<'a, R: Rng>(
        &'a mut self,
        x: ArrayView4<'a, f32>,
        y: ArrayView2<'a, f32>,
        validation: Option<(ArrayView4<'a, f32>, ArrayView2<'a, f32>)>,
        config: FitConfig,
        rng: R,
    ) -> Fit<'a, O, L, R> {
        Fit::new(self, x, y, validation, config, rng)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array4};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        arch::{
            Sequential,
            activations::ActFn,
            layers::{Layer, MapShape},
            loss::CategoricalCrossEntropy,
        },
        optimization::Adam,
    };

    fn model() -> Model<Adam, CategoricalCrossEntropy> {
        let input = MapShape::new(1, 2, 1);
        let network = Sequential::new([
            Layer::flatten(input),
            Layer::dense((2, 2), Some(ActFn::softmax())),
        ]);
        let optimizer = Adam::new(network.size(), 0.05, 0.9, 0.999, 1e-7);
        Model::new(
            network,
            input,
            optimizer,
            CategoricalCrossEntropy::new(),
            &mut StdRng::seed_from_u64(1),
        )
    }

    /// Class 0 when the left pixel is brighter, class 1 otherwise.
    fn data() -> (Array4<f32>, Array2<f32>) {
        let pixels = [[1., 0.], [0., 1.], [0.9, 0.2], [0.1, 0.8], [0.7, 0.], [0., 0.6]];
        let x = Array4::from_shape_fn((6, 1, 2, 1), |(n, _, j, _)| pixels[n][j]);
        let y = Array2::from_shape_fn((6, 2), |(n, c)| (c == n % 2) as u8 as f32);
        (x, y)
    }

    fn config(epochs: usize) -> FitConfig {
        FitConfig {
            epochs,
            batch_size: NonZeroUsize::new(2).unwrap(),
            shuffle: true,
        }
    }

    #[test]
    fn yields_one_item_per_epoch() {
        let mut model = model();
        let (x, y) = data();

        let validation = Some((x.view(), y.view()));
        let metrics: Vec<_> = model
            .fit(x.view(), y.view(), validation, config(3), StdRng::seed_from_u64(0))
            .collect::<Result<_>>()
            .unwrap();

        let epochs: Vec<_> = metrics.iter().map(|m| m.epoch).collect();
        assert_eq!(epochs, [1, 2, 3]);
        assert!(metrics.iter().all(|m| m.val_loss.is_some()));
    }

    #[test]
    fn loss_goes_down() {
        let mut model = model();
        let (x, y) = data();

        let metrics: Vec<_> = model
            .fit(x.view(), y.view(), None, config(60), StdRng::seed_from_u64(0))
            .collect::<Result<_>>()
            .unwrap();

        let (first, last) = (metrics[0], metrics[59]);
        assert!(last.loss < first.loss, "{first} -> {last}");
        assert_eq!(last.accuracy, 1.);
        assert_eq!(last.val_accuracy, None);
    }

    #[test]
    fn zero_epochs_trains_nothing() {
        let mut model = model();
        let before = model.params().to_vec();
        let (x, y) = data();

        let mut fit = model.fit(x.view(), y.view(), None, config(0), StdRng::seed_from_u64(0));
        assert!(fit.next().is_none());
        drop(fit);

        assert_eq!(model.params(), &before[..]);
    }

    #[test]
    fn stops_after_the_first_error() {
        let mut model = model();
        let x = Array4::<f32>::zeros((0, 1, 2, 1));
        let y = Array2::<f32>::zeros((0, 2));

        let mut fit = model.fit(x.view(), y.view(), None, config(5), StdRng::seed_from_u64(0));
        assert!(matches!(fit.next(), Some(Err(MlErr::EmptyBatch))));
        assert!(fit.next().is_none());
    }

    #[test]
    fn diverging_loss_fails_the_run() {
        let mut model = model();
        let (mut x, y) = data();
        x.fill(f32::NAN);

        let mut fit = model.fit(x.view(), y.view(), None, config(5), StdRng::seed_from_u64(0));
        assert!(matches!(
            fit.next(),
            Some(Err(MlErr::TrainingFailed { epoch: 1, .. }))
        ));
        assert!(fit.next().is_none());
    }
}
