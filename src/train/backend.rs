use std::ops::{Deref, DerefMut};

use crate::data::Dataset;
use crate::error::BackendError;
use crate::network::spec::ModelDescription;
use crate::train::epoch_stats::{EpochStats, TestScore};
use crate::train::train_config::TrainConfig;

/// The engine that turns a [`ModelDescription`] into trained weights and
/// scores them. The sweep only orchestrates; every numeric step goes through
/// this trait.
///
/// Backends own a non-reentrant training context (device, memory pools).
/// It is acquired once per trial and released when the trial ends, whether
/// the trial succeeded or failed.
pub trait TrainingBackend {
    /// A trained model, opaque to the sweep.
    type Model;

    fn acquire(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn release(&mut self) {}

    /// Trains a fresh model for `description` and returns it with its
    /// per-epoch training curve.
    fn fit(
        &mut self,
        description: &ModelDescription,
        train: &Dataset,
        protocol: &TrainConfig,
    ) -> Result<(Self::Model, Vec<EpochStats>), BackendError>;

    /// Scores a trained model on held-out data.
    fn evaluate(&mut self, model: &mut Self::Model, test: &Dataset) -> Result<TestScore, BackendError>;
}

/// Scoped hold on a backend's training context; releases it on drop.
pub struct TrainingContext<'a, B: TrainingBackend + ?Sized> {
    backend: &'a mut B,
}

impl<'a, B: TrainingBackend + ?Sized> TrainingContext<'a, B> {
    pub fn acquire(backend: &'a mut B) -> Result<Self, BackendError> {
        backend.acquire()?;
        Ok(TrainingContext { backend })
    }
}

impl<B: TrainingBackend + ?Sized> Deref for TrainingContext<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.backend
    }
}

impl<B: TrainingBackend + ?Sized> DerefMut for TrainingContext<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: TrainingBackend + ?Sized> Drop for TrainingContext<'_, B> {
    fn drop(&mut self) {
        self.backend.release();
    }
}
