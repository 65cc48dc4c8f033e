use std::fmt;

use dataset::{AssetSource, Partition, PartitionedDataset, decode};
use log::{error, info, warn};
use machine_learning::{
    DigitClassifier, LayerSummary, build_digit_classifier,
    training::{EpochMetrics, LogReporter, TrainingReporter},
};
use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    CapturedImage, Epochs, EpochsInput, RecognizerConfig, RecognizerErr, Result,
    inference::{self, Evaluation, ExampleImage},
    normalize_epochs,
    training::{self, TrainingPlan},
};

/// Where a session is in its lifecycle.
///
/// `None` only holds before the first run, every run goes through `Training` and ends in
/// `Done`, whether it succeeded or not.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    None,
    Training,
    Done,
}

/// What `Session::predict` answers with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prediction {
    Label(&'static str),
    /// A training run is in progress, or another call such as `evaluate` is using the model.
    Busy,
    /// There's no model to predict with.
    NoModel,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "{label}"),
            Self::Busy => write!(f, "training..."),
            Self::NoModel => write!(f, "no model"),
        }
    }
}

/// How a `start_training` call went.
#[derive(Clone, Debug, PartialEq)]
pub enum StartOutcome {
    /// The run finished, with the metrics of every epoch.
    Trained(Vec<EpochMetrics>),
    /// Another run was already in progress, nothing was done.
    AlreadyTraining,
}

/// The session singletons, created on the first run and reused by the next ones.
struct Resources {
    dataset: Option<PartitionedDataset>,
    model: Option<DigitClassifier>,
    rng: StdRng,
    reporter: Box<dyn TrainingReporter + Send>,
}

/// Moves the session to `Done` when dropped, whichever way the run ends.
struct RunGuard<'a>(&'a Mutex<SessionState>);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock() = SessionState::Done;
    }
}

/// Owns the dataset and the model, and decides what may run at any time.
///
/// Only one training run may be in flight: a `start_training` call made while another one
/// runs returns right away. Predictions never wait on a run, they answer `Busy` instead.
pub struct Session<S: AssetSource> {
    config: RecognizerConfig,
    source: S,
    state: Mutex<SessionState>,
    last_prediction: Mutex<Option<Prediction>>,
    resources: tokio::sync::Mutex<Resources>,
}

impl<S: AssetSource> Session<S> {
    /// Creates a new `Session`, nothing is loaded until the first `start_training`.
    ///
    /// # Arguments
    /// * `config` - The dataset and training configuration.
    /// * `source` - Where the dataset assets are read from.
    pub fn new(config: RecognizerConfig, source: S) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let resources = Resources {
            dataset: None,
            model: None,
            rng,
            reporter: Box::new(LogReporter),
        };

        Self {
            config,
            source,
            state: Mutex::new(SessionState::None),
            last_prediction: Mutex::new(None),
            resources: tokio::sync::Mutex::new(resources),
        }
    }

    /// Replaces the reporter that gets the progress of every run, logging by default.
    pub fn with_reporter<R>(mut self, reporter: R) -> Self
    where
        R: TrainingReporter + Send + 'static,
    {
        self.resources.get_mut().reporter = Box::new(reporter);
        self
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Runs a training session, loading the dataset and building the model first if needed.
    ///
    /// # Arguments
    /// * `epochs` - The requested amount of epochs, normalized before use.
    ///
    /// # Returns
    /// `AlreadyTraining` if a run is in progress, otherwise the metrics of the run or the
    /// error that ended it. The session is `Done` afterwards in both cases.
    pub async fn start_training<E: Into<EpochsInput>>(&self, epochs: E) -> Result<StartOutcome> {
        let _guard = {
            let mut state = self.state.lock();
            if *state == SessionState::Training {
                info!("a training run is already in progress");
                return Ok(StartOutcome::AlreadyTraining);
            }

            *state = SessionState::Training;
            RunGuard(&self.state)
        };

        let epochs = normalize_epochs(&epochs.into());
        info!(epochs = epochs.get(); "training session started");

        match self.run(epochs).await {
            Ok(history) => Ok(StartOutcome::Trained(history)),
            Err(e) => {
                error!("training session failed: {e}");
                Err(e)
            }
        }
    }

    async fn run(&self, epochs: Epochs) -> Result<Vec<EpochMetrics>> {
        let mut guard = self.resources.lock().await;
        let res = &mut *guard;

        let data = match res.dataset.take() {
            Some(data) => data,
            None => self.load(&mut res.rng).await?,
        };
        let data = res.dataset.insert(data);

        let model = res.model.get_or_insert_with(|| {
            info!("building model");
            build_digit_classifier(&mut res.rng)
        });

        let plan = TrainingPlan {
            train_size: self.config.train_size,
            validation_size: self.config.validation_size,
            batch_size: self.config.batch_size(),
        };

        training::train(
            model,
            data,
            epochs,
            &plan,
            &mut res.rng,
            res.reporter.as_mut(),
        )
        .await
    }

    async fn load(&self, rng: &mut StdRng) -> Result<PartitionedDataset> {
        info!("loading dataset");

        let decoded = decode(&self.source, &self.config.decoder_config()).await?;
        let data = PartitionedDataset::new(decoded, self.config.train_ratio, rng)?;

        info!(
            train = data.len(Partition::Train),
            test = data.len(Partition::Test);
            "dataset loaded"
        );
        Ok(data)
    }

    /// Classifies a captured image if the session can.
    ///
    /// # Arguments
    /// * `image` - The drawn digit, `None` when the drawing was cleared.
    ///
    /// # Returns
    /// `None` for a `None` image, which leaves the session untouched. Otherwise the label,
    /// or `Busy` while training, or `NoModel` when there's nothing to predict with.
    pub fn predict(&self, image: Option<&CapturedImage>) -> Option<Prediction> {
        let image = image?;

        let state = self.state();
        let prediction = match state {
            SessionState::None => Prediction::NoModel,
            SessionState::Training => Prediction::Busy,
            SessionState::Done => self.classify(image),
        };

        *self.last_prediction.lock() = Some(prediction);
        Some(prediction)
    }

    fn classify(&self, image: &CapturedImage) -> Prediction {
        let Ok(mut res) = self.resources.try_lock() else {
            return Prediction::Busy;
        };

        let Some(model) = res.model.as_mut() else {
            return Prediction::NoModel;
        };

        match inference::predict(model, image) {
            Ok(label) => Prediction::Label(label),
            Err(e) => {
                warn!("failed to classify the image: {e}");
                Prediction::NoModel
            }
        }
    }

    /// The last answer `predict` gave, until cleared.
    pub fn last_prediction(&self) -> Option<Prediction> {
        *self.last_prediction.lock()
    }

    /// Forgets the displayed prediction.
    pub fn clear(&self) {
        self.last_prediction.lock().take();
    }

    /// Evaluates the model over the configured amount of test examples.
    pub async fn evaluate(&self) -> Result<Evaluation> {
        let mut guard = self.resources.lock().await;
        let res = &mut *guard;

        let (Some(model), Some(data)) = (res.model.as_mut(), res.dataset.as_ref()) else {
            return Err(RecognizerErr::NotTrained);
        };

        inference::evaluate(model, data, self.config.evaluation_size)
    }

    /// Describes the model's layers, `None` before it's built.
    pub async fn model_summary(&self) -> Option<Vec<LayerSummary>> {
        let res = self.resources.lock().await;
        res.model.as_ref().map(|model| model.summary())
    }

    /// The first `n` examples the test partition serves, for display.
    pub async fn example_images(&self, n: usize) -> Result<Vec<ExampleImage>> {
        let res = self.resources.lock().await;
        let data = res.dataset.as_ref().ok_or(RecognizerErr::NotTrained)?;
        inference::example_images(data, n)
    }
}
