use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::data::Dataset;
use crate::error::BackendError;
use crate::network::network::Network;
use crate::network::spec::ModelDescription;
use crate::train::backend::TrainingBackend;
use crate::train::epoch_stats::{EpochStats, TestScore};
use crate::train::loop_fn::{evaluate, train_loop};
use crate::train::train_config::TrainConfig;

/// CPU training backend built on this crate's own layers.
///
/// The training context is a single slot: acquiring it twice without a
/// release fails with [`BackendError::ResourceBusy`].
#[derive(Debug, Default)]
pub struct NativeBackend {
    busy: bool,
}

impl NativeBackend {
    pub fn new() -> Self {
        NativeBackend::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

impl TrainingBackend for NativeBackend {
    type Model = Network;

    fn acquire(&mut self) -> Result<(), BackendError> {
        if self.busy {
            return Err(BackendError::ResourceBusy);
        }
        self.busy = true;
        Ok(())
    }

    fn release(&mut self) {
        self.busy = false;
    }

    fn fit(
        &mut self,
        description: &ModelDescription,
        train: &Dataset,
        protocol: &TrainConfig,
    ) -> Result<(Network, Vec<EpochStats>), BackendError> {
        protocol.validate()?;
        if description.input_shape() != Some(train.input_shape) {
            return Err(BackendError::ShapeMismatch(format!(
                "model \"{}\" expects input {:?}, dataset provides {:?}",
                description.name,
                description.input_shape(),
                train.input_shape
            )));
        }
        if description.n_classes() != Some(train.n_classes) {
            return Err(BackendError::ShapeMismatch(format!(
                "model \"{}\" has {:?} outputs, dataset has {} classes",
                description.name,
                description.n_classes(),
                train.n_classes
            )));
        }

        let mut rng = StdRng::seed_from_u64(protocol.seed);
        let mut network = Network::from_description(description, &mut rng)?;
        debug!(model = %description.name, "\n{}", description.summary());

        let (fit_set, val_set) = train.split_validation(protocol.validation_split);
        let mut optimizer = protocol.optimizer.build();
        let curve = train_loop(
            &mut network,
            &fit_set,
            Some(&val_set),
            optimizer.as_mut(),
            protocol,
            &mut rng,
        )?;
        Ok((network, curve))
    }

    fn evaluate(&mut self, model: &mut Network, test: &Dataset) -> Result<TestScore, BackendError> {
        if test.is_empty() {
            return Err(BackendError::InvalidProtocol("test set is empty".into()));
        }
        if test.input_shape != model.input_shape {
            return Err(BackendError::ShapeMismatch(format!(
                "test set input {:?} does not match model input {:?}",
                test.input_shape, model.input_shape
            )));
        }
        Ok(evaluate(model, test))
    }
}
