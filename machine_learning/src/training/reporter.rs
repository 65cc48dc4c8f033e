use log::info;

use super::EpochMetrics;

/// Receives the progress of a training run, one record per finished epoch.
pub trait TrainingReporter {
    fn on_epoch_end(&mut self, metrics: &EpochMetrics);

    /// Called once when the run is over, whether it finished or failed.
    fn on_train_end(&mut self) {}
}

/// Writes every epoch record to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl TrainingReporter for LogReporter {
    fn on_epoch_end(&mut self, metrics: &EpochMetrics) {
        info!(
            epoch = metrics.epoch,
            loss = metrics.loss,
            accuracy = metrics.accuracy;
            "{metrics}"
        );
    }

    fn on_train_end(&mut self) {
        info!("training finished");
    }
}

impl<T: TrainingReporter + ?Sized> TrainingReporter for &mut T {
    fn on_epoch_end(&mut self, metrics: &EpochMetrics) {
        (**self).on_epoch_end(metrics);
    }

    fn on_train_end(&mut self) {
        (**self).on_train_end();
    }
}

/// Keeps every record in memory.
impl TrainingReporter for Vec<EpochMetrics> {
    fn on_epoch_end(&mut self, metrics: &EpochMetrics) {
        self.push(*metrics);
    }
}
