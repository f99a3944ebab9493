use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ferrite_sweep::data::one_hot;
use ferrite_sweep::train::{EpochStats, TestScore};
use ferrite_sweep::{
    BackendError, Configuration, Dataset, Dimension, HyperparameterDomain, InputShape, ModelDescription, SweepContext,
    SweepError, TrainConfig, TrainingBackend, TrialRunner,
};

/// Backend that returns canned accuracies keyed by model name.
#[derive(Default)]
struct Scripted {
    accuracy: HashMap<String, f64>,
    failing: Vec<String>,
    trained: Vec<String>,
    held: bool,
    releases: usize,
    stop_after: Option<(usize, Arc<AtomicBool>)>,
}

impl Scripted {
    fn with(mut self, name: &str, accuracy: f64) -> Self {
        self.accuracy.insert(name.to_owned(), accuracy);
        self
    }

    fn failing(mut self, name: &str) -> Self {
        self.failing.push(name.to_owned());
        self
    }
}

impl TrainingBackend for Scripted {
    type Model = f64;

    fn acquire(&mut self) -> Result<(), BackendError> {
        if self.held {
            return Err(BackendError::ResourceBusy);
        }
        self.held = true;
        Ok(())
    }

    fn release(&mut self) {
        self.held = false;
        self.releases += 1;
    }

    fn fit(
        &mut self,
        description: &ModelDescription,
        _train: &Dataset,
        protocol: &TrainConfig,
    ) -> Result<(f64, Vec<EpochStats>), BackendError> {
        self.trained.push(description.name.clone());
        if let Some((n, flag)) = &self.stop_after {
            if self.trained.len() >= *n {
                flag.store(true, Ordering::Relaxed);
            }
        }
        if self.failing.contains(&description.name) {
            return Err(BackendError::Other("device lost".into()));
        }
        let accuracy = self.accuracy.get(&description.name).copied().unwrap_or(0.5);
        let curve = (1..=protocol.epochs)
            .map(|epoch| EpochStats {
                epoch,
                total_epochs: protocol.epochs,
                train_loss: 1.0,
                train_accuracy: accuracy,
                val_loss: Some(1.0),
                val_accuracy: Some(accuracy),
                elapsed_ms: 0,
            })
            .collect();
        Ok((accuracy, curve))
    }

    fn evaluate(&mut self, model: &mut f64, _test: &Dataset) -> Result<TestScore, BackendError> {
        Ok(TestScore { loss: 1.0 - *model, accuracy: *model })
    }
}

fn data() -> Dataset {
    let inputs = vec![vec![0.0; 28 * 28]; 4];
    let labels = (0..4).map(|i| one_hot(i % 10, 10)).collect();
    Dataset::new(inputs, labels, InputShape::default(), 10).unwrap()
}

fn baseline() -> Configuration {
    Configuration { conv_layers: 2, conv_filters: 32, filter_size: 3, dense_layers: 1, dense_units: 128 }
}

fn single(units: usize) -> HyperparameterDomain {
    HyperparameterDomain {
        conv_layers: vec![2],
        conv_filters: vec![32],
        filter_size: vec![3],
        dense_layers: vec![1],
        dense_units: vec![units],
    }
}

fn context(domain: HyperparameterDomain, backend: Scripted) -> SweepContext<Scripted> {
    let runner = TrialRunner::new(backend, TrainConfig::new(2, 128, 0.3));
    SweepContext::new(domain, InputShape::default(), 10, baseline(), runner)
}

#[test]
fn swept_configuration_beats_baseline() {
    let backend = Scripted::default().with("baseline", 0.90).with("conv2x32k3-dense1x100", 0.93);
    let mut ctx = context(single(100), backend);
    let report = ctx.run(&data(), &data()).unwrap();

    assert_eq!(report.trials.len(), 2);
    assert_eq!(report.trials[0].config, None);
    assert_eq!(report.best, 1);
    assert_eq!(report.best().config.map(|c| c.dense_units), Some(100));
    assert_eq!(report.trials[1].training_curve.len(), 2);
}

#[test]
fn baseline_runs_even_when_also_in_grid() {
    let backend = Scripted::default().with("baseline", 0.9).with("conv2x32k3-dense1x128", 0.9);
    let mut ctx = context(single(128), backend);
    let report = ctx.run(&data(), &data()).unwrap();

    assert_eq!(report.trials.len(), 2);
    assert!(report.trials[0].is_baseline());
    assert_eq!(report.trials[1].config, Some(baseline()));
    // equal accuracy: earlier trial wins
    assert_eq!(report.best, 0);
}

#[test]
fn trials_follow_grid_order() {
    let domain = HyperparameterDomain {
        conv_layers: vec![1, 2],
        conv_filters: vec![8],
        filter_size: vec![3, 5],
        dense_layers: vec![0],
        dense_units: vec![16],
    };
    let mut ctx = context(domain, Scripted::default());
    ctx.run(&data(), &data()).unwrap();

    let backend = ctx.runner.into_backend();
    assert_eq!(
        backend.trained,
        vec!["baseline", "conv1x8k3-dense0x16", "conv1x8k5-dense0x16", "conv2x8k3-dense0x16", "conv2x8k5-dense0x16"]
    );
    assert_eq!(backend.releases, 5);
}

#[test]
fn failed_trials_are_isolated() {
    let domain = HyperparameterDomain { dense_units: vec![64, 100, 128], ..single(0) };
    let backend = Scripted::default().with("conv2x32k3-dense1x128", 0.7).failing("conv2x32k3-dense1x100");
    let mut ctx = context(domain, backend);
    let report = ctx.run(&data(), &data()).unwrap();

    assert_eq!(report.trials.iter().map(|t| t.ordinal).collect::<Vec<_>>(), vec![0, 1, 3]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].ordinal, 2);
    assert_eq!(report.failures[0].config.map(|c| c.dense_units), Some(100));
    assert!(report.failures[0].reason.contains("device lost"));
    assert_eq!(report.best().ordinal, 3);
    // context released after the failure too
    let backend = ctx.runner.into_backend();
    assert!(!backend.held);
    assert_eq!(backend.releases, 4);
}

#[test]
fn all_failures_yield_no_successful_trials() {
    let backend = Scripted::default().failing("baseline").failing("conv2x32k3-dense1x100");
    let mut ctx = context(single(100), backend);
    match ctx.run(&data(), &data()) {
        Err(SweepError::NoSuccessfulTrials { failures }) => {
            assert_eq!(failures.iter().map(|f| f.ordinal).collect::<Vec<_>>(), vec![0, 1]);
            assert_eq!(failures[0].config, None);
        }
        other => panic!("expected NoSuccessfulTrials, got {other:?}"),
    }
}

#[test]
fn invalid_configuration_aborts_sweep() {
    let domain = HyperparameterDomain { conv_filters: vec![16, 0], ..single(64) };
    let mut ctx = context(domain, Scripted::default());
    let err = ctx.run(&data(), &data()).unwrap_err();

    assert!(matches!(err, SweepError::ConfigurationInvalid { .. }));
    assert_eq!(ctx.runner.backend().trained, vec!["baseline", "conv2x16k3-dense1x64"]);
}

#[test]
fn dimension_pairs_for_filters() {
    let domain = HyperparameterDomain { conv_filters: vec![32, 64, 128], ..single(64) };
    let backend = Scripted::default()
        .with("conv2x32k3-dense1x64", 0.80)
        .with("conv2x64k3-dense1x64", 0.85)
        .with("conv2x128k3-dense1x64", 0.82);
    let mut ctx = context(domain, backend);
    let report = ctx.run(&data(), &data()).unwrap();

    let mut pairs = report.dimension_pairs(Dimension::ConvFilters);
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(pairs, vec![(32, 0.80), (64, 0.85), (128, 0.82)]);
    assert_eq!(report.best().config.map(|c| c.conv_filters), Some(64));
}

#[test]
fn stop_flag_ends_sweep_between_trials() {
    let flag = Arc::new(AtomicBool::new(false));
    let domain = HyperparameterDomain { dense_units: vec![16, 32, 64, 128], ..single(0) };
    let backend = Scripted { stop_after: Some((2, flag.clone())), ..Scripted::default() };
    let mut ctx = context(domain, backend);
    ctx.stop_flag = Some(flag);
    let report = ctx.run(&data(), &data()).unwrap();

    assert!(report.stopped);
    assert_eq!(report.trials.len(), 2);
}

#[test]
fn baseline_alone_returns_model() {
    let mut ctx = context(single(64), Scripted::default().with("baseline", 0.75));
    let (model, result) = ctx.run_baseline(&data(), &data()).unwrap();

    assert_eq!(model, 0.75);
    assert_eq!(result.ordinal, 0);
    assert!(result.is_baseline());
    assert_eq!(ctx.runner.backend().trained, vec!["baseline"]);
}

#[test]
fn baseline_alone_failure_is_fatal() {
    let mut ctx = context(single(64), Scripted::default().failing("baseline"));
    match ctx.run_baseline(&data(), &data()) {
        Err(SweepError::TrialFailed(err)) => {
            assert_eq!(err.config, None);
            assert!(matches!(err.source, BackendError::Other(_)));
        }
        other => panic!("expected TrialFailed, got {other:?}"),
    }
    assert!(!ctx.runner.backend().held);
}

#[test]
fn oversized_domain_is_rejected_before_training() {
    let wide: Vec<usize> = (1..=8192).collect();
    let domain = HyperparameterDomain {
        conv_layers: wide.clone(),
        conv_filters: wide.clone(),
        filter_size: wide.clone(),
        dense_layers: wide.clone(),
        dense_units: wide,
    };
    let mut ctx = context(domain, Scripted::default());
    assert!(matches!(ctx.run(&data(), &data()), Err(SweepError::ConfigurationInvalid { .. })));
    assert!(ctx.runner.backend().trained.is_empty());
}
