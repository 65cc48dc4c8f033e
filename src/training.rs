use std::num::NonZeroUsize;

use dataset::{Batch, Partition, PartitionedDataset};
use log::{debug, info};
use machine_learning::{
    DigitClassifier,
    arch::IMAGE_SHAPE,
    training::{EpochMetrics, FitConfig, TrainingReporter},
};
use ndarray::{Array2, Array4, Axis};
use rand::Rng;
use tokio::{sync::mpsc, task};

use crate::{Epochs, Result};

/// The sizes a training run draws its data with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrainingPlan {
    pub train_size: usize,
    pub validation_size: usize,
    pub batch_size: NonZeroUsize,
}

/// Turns a batch of flat rows into `[n, 28, 28, 1]` images and their one-hot targets.
pub(crate) fn to_images(batch: Batch) -> Result<(Array4<f32>, Array2<f32>)> {
    let n = batch.len();
    let shape = (n, IMAGE_SHAPE.h, IMAGE_SHAPE.w, IMAGE_SHAPE.c);
    let x = batch.inputs.into_shape_with_order(shape)?;
    Ok((x, batch.targets))
}

/// Trains `model` for `epochs` epochs.
///
/// A single training batch and a single validation batch are drawn up front, every epoch
/// reshuffles the training batch and walks it in mini-batches. The scheduler gets a chance
/// to run other tasks between epochs.
///
/// # Arguments
/// * `model` - The model to train, its parameters carry over from previous runs.
/// * `data` - The partitioned dataset to draw from.
/// * `epochs` - The amount of epochs.
/// * `plan` - The sizes of the drawn batches.
/// * `rng` - Shuffles the mini-batches.
/// * `reporter` - Gets every epoch's metrics.
///
/// # Returns
/// The metrics of every epoch or the first error found.
pub async fn train<R, P>(
    model: &mut DigitClassifier,
    data: &PartitionedDataset,
    epochs: Epochs,
    plan: &TrainingPlan,
    rng: &mut R,
    reporter: &mut P,
) -> Result<Vec<EpochMetrics>>
where
    R: Rng + Send,
    P: TrainingReporter + Send + ?Sized,
{
    let ((x, y), (val_x, val_y)) = task::block_in_place(|| -> Result<_> {
        let train = to_images(data.next_batch(Partition::Train, plan.train_size)?)?;
        let validation = to_images(data.next_batch(Partition::Test, plan.validation_size)?)?;
        Ok((train, validation))
    })?;

    info!(
        epochs = epochs.get(),
        train = x.len_of(Axis(0)),
        validation = val_x.len_of(Axis(0));
        "starting training"
    );

    let config = FitConfig {
        epochs: epochs.get(),
        batch_size: plan.batch_size,
        shuffle: true,
    };
    let validation = (val_x.len_of(Axis(0)) > 0).then(|| (val_x.view(), val_y.view()));
    let mut fit = model.fit(x.view(), y.view(), validation, config, &mut *rng);
    let mut history = Vec::with_capacity(epochs.get());

    // Epochs are CPU-bound.
    while let Some(metrics) = task::block_in_place(|| fit.next()) {
        let metrics = match metrics {
            Ok(metrics) => metrics,
            Err(e) => {
                reporter.on_train_end();
                return Err(e.into());
            }
        };

        reporter.on_epoch_end(&metrics);
        history.push(metrics);
        task::yield_now().await;
    }

    reporter.on_train_end();
    Ok(history)
}

/// What a `ChannelReporter` sends.
#[derive(Clone, Debug, PartialEq)]
pub enum TrainingEvent {
    Epoch(EpochMetrics),
    Finished,
}

/// Forwards the progress of a run through a channel, for consumers living in other tasks.
#[derive(Clone, Debug)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<TrainingEvent>,
}

impl ChannelReporter {
    /// Creates a new `ChannelReporter` and the receiving end of its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TrainingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: TrainingEvent) {
        if self.tx.send(event).is_err() {
            debug!("training event dropped, nobody is listening");
        }
    }
}

impl TrainingReporter for ChannelReporter {
    fn on_epoch_end(&mut self, metrics: &EpochMetrics) {
        self.send(TrainingEvent::Epoch(*metrics));
    }

    fn on_train_end(&mut self) {
        self.send(TrainingEvent::Finished);
    }
}
