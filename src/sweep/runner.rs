use std::time::Instant;

use tracing::{debug, info};

use crate::data::Dataset;
use crate::error::TrialError;
use crate::network::spec::ModelDescription;
use crate::sweep::domain::Configuration;
use crate::sweep::report::TrialResult;
use crate::train::backend::{TrainingBackend, TrainingContext};
use crate::train::train_config::TrainConfig;

/// Runs single trials against a backend under one fixed protocol.
///
/// The protocol (epochs, batch size, validation split, optimizer, seed) is
/// owned by the runner so every trial of a sweep trains the same way.
pub struct TrialRunner<B: TrainingBackend> {
    backend: B,
    protocol: TrainConfig,
}

impl<B: TrainingBackend> TrialRunner<B> {
    pub fn new(backend: B, protocol: TrainConfig) -> Self {
        TrialRunner { backend, protocol }
    }

    pub fn protocol(&self) -> &TrainConfig {
        &self.protocol
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Trains `description`, then scores it once on `test`.
    ///
    /// The backend's context is held for the whole trial and released on
    /// every exit path. Failures are not retried; they come back tagged
    /// with `config`.
    pub fn run(
        &mut self,
        ordinal: usize,
        description: &ModelDescription,
        config: Option<Configuration>,
        train: &Dataset,
        test: &Dataset,
    ) -> Result<TrialResult, TrialError> {
        self.run_keeping_model(ordinal, description, config, train, test).map(|(_, result)| result)
    }

    /// [`run`](Self::run), also handing back the trained model.
    pub fn run_keeping_model(
        &mut self,
        ordinal: usize,
        description: &ModelDescription,
        config: Option<Configuration>,
        train: &Dataset,
        test: &Dataset,
    ) -> Result<(B::Model, TrialResult), TrialError> {
        let tag = |source| TrialError { config, source };
        let started = Instant::now();
        info!(ordinal, model = %description.name, "trial started");

        let mut context = TrainingContext::acquire(&mut self.backend).map_err(tag)?;
        let (mut model, training_curve) = context.fit(description, train, &self.protocol).map_err(tag)?;
        let test_score = context.evaluate(&mut model, test).map_err(tag)?;
        drop(context);

        info!(
            ordinal,
            model = %description.name,
            accuracy = test_score.accuracy,
            loss = test_score.loss,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "trial finished"
        );
        debug!(ordinal, epochs = training_curve.len(), "training curve captured");

        Ok((model, TrialResult { ordinal, config, training_curve, test_score }))
    }
}
