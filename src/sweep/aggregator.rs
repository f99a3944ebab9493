use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::data::Dataset;
use crate::error::{Result, TrialError};
use crate::network::assemble::{assemble_with, AssemblyRules};
use crate::network::spec::{InputShape, ModelDescription};
use crate::sweep::domain::{Configuration, HyperparameterDomain};
use crate::sweep::report::{FailedTrial, SweepReport, TrialResult};
use crate::sweep::runner::TrialRunner;
use crate::train::backend::TrainingBackend;

/// Everything a sweep needs, owned by the caller and passed through the
/// whole run. Nothing here is mutated by the sweep except the runner's
/// backend.
pub struct SweepContext<B: TrainingBackend> {
    pub domain: HyperparameterDomain,
    pub input_shape: InputShape,
    pub n_classes: usize,
    pub baseline: Configuration,
    pub rules: AssemblyRules,
    pub runner: TrialRunner<B>,
    /// Checked before each generated trial; the running trial always finishes.
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl<B: TrainingBackend> SweepContext<B> {
    pub fn new(
        domain: HyperparameterDomain,
        input_shape: InputShape,
        n_classes: usize,
        baseline: Configuration,
        runner: TrialRunner<B>,
    ) -> Self {
        SweepContext {
            domain,
            input_shape,
            n_classes,
            baseline,
            rules: AssemblyRules::default(),
            runner,
            stop_flag: None,
        }
    }

    /// Builds the description a sweep would train for `config`
    /// (`None` is the baseline).
    pub fn describe(&self, config: Option<&Configuration>) -> Result<ModelDescription> {
        match config {
            None => assemble_with(&self.rules, self.input_shape, self.n_classes, &self.baseline, "baseline"),
            Some(c) => assemble_with(&self.rules, self.input_shape, self.n_classes, c, c.to_string()),
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop_flag.as_ref().map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    /// Trains and scores the baseline alone, keeping the model. Unlike a
    /// sweep, a backend failure here ends the run with `TrialFailed`.
    pub fn run_baseline(&mut self, train: &Dataset, test: &Dataset) -> Result<(B::Model, TrialResult)> {
        let description = self.describe(None)?;
        Ok(self.runner.run_keeping_model(0, &description, None, train, test)?)
    }

    /// Shorthand for [`sweep`].
    pub fn run(&mut self, train: &Dataset, test: &Dataset) -> Result<SweepReport> {
        sweep(self, train, test)
    }
}

/// Runs the baseline as trial 0, then every configuration of the domain in
/// grid order, one at a time.
///
/// # Errors
/// - `ConfigurationInvalid` when the grid size overflows, or as soon as any
///   configuration fails to assemble. Trials already run are discarded.
/// - `NoSuccessfulTrials` when every trial failed in training or evaluation.
///
/// A trial that fails in the backend is recorded in
/// [`SweepReport::failures`] and the sweep moves on.
pub fn sweep<B: TrainingBackend>(ctx: &mut SweepContext<B>, train: &Dataset, test: &Dataset) -> Result<SweepReport> {
    let total = ctx.domain.checked_size()? + 1;
    info!(trials = total, "sweep started");

    let mut trials = Vec::new();
    let mut failures = Vec::new();

    let baseline = ctx.describe(None)?;
    record(ctx.runner.run(0, &baseline, None, train, test), 0, &mut trials, &mut failures);

    let mut stopped = false;
    for (i, config) in ctx.domain.configurations().enumerate() {
        if ctx.stop_requested() {
            info!(completed = i + 1, remaining = total - i - 1, "sweep stopped");
            stopped = true;
            break;
        }
        let ordinal = i + 1;
        let description = assemble_with(&ctx.rules, ctx.input_shape, ctx.n_classes, &config, config.to_string())?;
        let outcome = ctx.runner.run(ordinal, &description, Some(config), train, test);
        record(outcome, ordinal, &mut trials, &mut failures);
    }

    let report = SweepReport::new(trials, failures, stopped)?;
    let best = report.best();
    info!(
        best = %best.label(),
        ordinal = best.ordinal,
        accuracy = best.test_score.accuracy,
        succeeded = report.trials.len(),
        failed = report.failures.len(),
        "sweep finished"
    );
    Ok(report)
}

fn record(
    outcome: std::result::Result<TrialResult, TrialError>,
    ordinal: usize,
    trials: &mut Vec<TrialResult>,
    failures: &mut Vec<FailedTrial>,
) {
    match outcome {
        Ok(result) => trials.push(result),
        Err(err) => {
            warn!(ordinal, error = %err, "trial failed");
            failures.push(FailedTrial { ordinal, config: err.config, reason: err.source.to_string() });
        }
    }
}
