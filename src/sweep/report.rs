use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::sweep::domain::{Configuration, Dimension};
use crate::train::epoch_stats::{EpochStats, TestScore};

/// Outcome of one successful trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Position in generation order; the baseline is 0.
    pub ordinal: usize,
    /// `None` for the baseline.
    pub config: Option<Configuration>,
    pub training_curve: Vec<EpochStats>,
    pub test_score: TestScore,
}

impl TrialResult {
    pub fn is_baseline(&self) -> bool {
        self.config.is_none()
    }

    pub fn label(&self) -> String {
        label(self.config.as_ref())
    }
}

/// A trial whose backend raised. Kept in the report, with no score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTrial {
    pub ordinal: usize,
    pub config: Option<Configuration>,
    pub reason: String,
}

fn label(config: Option<&Configuration>) -> String {
    config.map_or_else(|| "baseline".to_owned(), Configuration::to_string)
}

/// Every trial of one sweep, in generation order, and the best of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Successful trials, ordered by ordinal.
    pub trials: Vec<TrialResult>,
    pub failures: Vec<FailedTrial>,
    /// Index into `trials` of the best test accuracy.
    pub best: usize,
    /// Set when the sweep was stopped before the grid was exhausted.
    #[serde(default)]
    pub stopped: bool,
}

impl SweepReport {
    /// Builds a report, picking the best trial.
    ///
    /// A later trial replaces the current best only with a strictly greater
    /// accuracy, so ties go to the earliest trial. NaN never wins.
    ///
    /// # Errors
    /// `NoSuccessfulTrials`, carrying `failures`, when `trials` is empty.
    pub fn new(trials: Vec<TrialResult>, failures: Vec<FailedTrial>, stopped: bool) -> Result<SweepReport> {
        match best_index(&trials) {
            Some(best) => Ok(SweepReport { trials, failures, best, stopped }),
            None => Err(SweepError::NoSuccessfulTrials { failures }),
        }
    }

    pub fn best(&self) -> &TrialResult {
        &self.trials[self.best]
    }

    pub fn baseline(&self) -> Option<&TrialResult> {
        self.trials.iter().find(|t| t.is_baseline())
    }

    /// `(value, test accuracy)` for every successful non-baseline trial,
    /// in trial order.
    pub fn dimension_pairs(&self, dimension: Dimension) -> Vec<(usize, f64)> {
        self.trials
            .iter()
            .filter_map(|t| t.config.map(|c| (c.value(dimension), t.test_score.accuracy)))
            .collect()
    }

    /// Pairs for all five dimensions.
    pub fn all_dimension_pairs(&self) -> BTreeMap<Dimension, Vec<(usize, f64)>> {
        Dimension::ALL.iter().map(|&d| (d, self.dimension_pairs(d))).collect()
    }

    /// Pearson correlation between a dimension's value and test accuracy.
    pub fn pearson(&self, dimension: Dimension) -> Option<f64> {
        pearson(&self.dimension_pairs(dimension))
    }

    pub fn correlations(&self) -> BTreeMap<Dimension, Option<f64>> {
        Dimension::ALL.iter().map(|&d| (d, self.pearson(d))).collect()
    }

    pub fn save_json(&self, path: &str) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_json(path: &str) -> Result<SweepReport> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Plain-text results table, best trial marked with `*`.
    pub fn summary_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "  {:>3}  {:<24} {:>9} {:>9} {:>9}", "#", "trial", "test_acc", "test_loss", "val_acc");
        for (i, t) in self.trials.iter().enumerate() {
            let marker = if i == self.best { '*' } else { ' ' };
            let val = t
                .training_curve
                .last()
                .and_then(|s| s.val_accuracy)
                .map_or_else(|| "-".to_owned(), |v| format!("{v:.4}"));
            let _ = writeln!(
                out,
                "{marker} {:>3}  {:<24} {:>9.4} {:>9.4} {:>9}",
                t.ordinal,
                t.label(),
                t.test_score.accuracy,
                t.test_score.loss,
                val
            );
        }
        for f in &self.failures {
            let _ = writeln!(out, "  {:>3}  {:<24} failed: {}", f.ordinal, label(f.config.as_ref()), f.reason);
        }
        let _ = writeln!(out);
        for (dimension, r) in self.correlations() {
            let r = r.map_or_else(|| "n/a".to_owned(), |r| format!("{r:+.3}"));
            let _ = writeln!(out, "  corr({}, test_acc) = {r}", dimension.name());
        }
        out
    }
}

fn best_index(trials: &[TrialResult]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, t) in trials.iter().enumerate() {
        let acc = t.test_score.accuracy;
        match best {
            None => best = Some((i, acc)),
            Some((_, b)) if acc > b || (b.is_nan() && !acc.is_nan()) => best = Some((i, acc)),
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}

/// Sample Pearson correlation. `None` for fewer than two points or when
/// either side has zero variance.
pub fn pearson(pairs: &[(usize, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|&(x, _)| x as f64).sum::<f64>() / n;
    let my = pairs.iter().map(|&(_, y)| y).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x as f64 - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then_some(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(filters: usize) -> Configuration {
        Configuration { conv_layers: 1, conv_filters: filters, filter_size: 3, dense_layers: 1, dense_units: 64 }
    }

    fn trial(ordinal: usize, config: Option<Configuration>, accuracy: f64) -> TrialResult {
        TrialResult { ordinal, config, training_curve: Vec::new(), test_score: TestScore { loss: 0.3, accuracy } }
    }

    #[test]
    fn test_best_is_strict_maximum() {
        let report =
            SweepReport::new(vec![trial(0, None, 0.90), trial(1, Some(config(32)), 0.93)], Vec::new(), false).unwrap();
        assert_eq!(report.best, 1);
        assert_eq!(report.best().config, Some(config(32)));
    }

    #[test]
    fn test_ties_go_to_earliest() {
        let trials = vec![trial(0, None, 0.9), trial(1, Some(config(16)), 0.95), trial(2, Some(config(32)), 0.95)];
        assert_eq!(SweepReport::new(trials, Vec::new(), false).unwrap().best, 1);
    }

    #[test]
    fn test_nan_never_wins() {
        let trials = vec![trial(0, None, f64::NAN), trial(1, Some(config(16)), 0.1)];
        assert_eq!(SweepReport::new(trials, Vec::new(), false).unwrap().best, 1);
    }

    #[test]
    fn test_empty_keeps_failures() {
        let failures = vec![FailedTrial { ordinal: 0, config: None, reason: "oom".into() }];
        match SweepReport::new(Vec::new(), failures.clone(), false) {
            Err(SweepError::NoSuccessfulTrials { failures: kept }) => assert_eq!(kept, failures),
            other => panic!("expected NoSuccessfulTrials, got {other:?}"),
        }
    }

    #[test]
    fn test_dimension_pairs_skip_baseline() {
        let trials = vec![
            trial(0, None, 0.7),
            trial(1, Some(config(32)), 0.80),
            trial(2, Some(config(64)), 0.85),
            trial(3, Some(config(128)), 0.82),
        ];
        let report = SweepReport::new(trials, Vec::new(), false).unwrap();
        assert_eq!(report.dimension_pairs(Dimension::ConvFilters), vec![(32, 0.80), (64, 0.85), (128, 0.82)]);
        assert_eq!(report.dimension_pairs(Dimension::FilterSize), vec![(3, 0.80), (3, 0.85), (3, 0.82)]);
        assert_eq!(report.all_dimension_pairs().len(), 5);
    }

    #[test]
    fn test_pearson() {
        assert_relative_eq!(pearson(&[(1, 0.1), (2, 0.2), (3, 0.3)]).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pearson(&[(1, 0.3), (2, 0.2), (3, 0.1)]).unwrap(), -1.0, epsilon = 1e-12);
        assert!(pearson(&[(1, 0.5)]).is_none());
        assert!(pearson(&[(3, 0.1), (3, 0.9)]).is_none());
    }

    #[test]
    fn test_summary_table_marks_best_and_failures() {
        let failures = vec![FailedTrial { ordinal: 2, config: Some(config(64)), reason: "oom".into() }];
        let report =
            SweepReport::new(vec![trial(0, None, 0.5), trial(1, Some(config(32)), 0.6)], failures, false).unwrap();
        let table = report.summary_table();
        assert!(table.contains("*   1  conv1x32k3-dense1x64"));
        assert!(table.contains("failed: oom"));
        assert!(table.contains("corr(conv_filters, test_acc) = n/a"));
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let path = path.to_str().unwrap();
        let report =
            SweepReport::new(vec![trial(0, None, 0.5), trial(1, Some(config(32)), 0.6)], Vec::new(), true).unwrap();
        report.save_json(path).unwrap();
        assert_eq!(SweepReport::load_json(path).unwrap(), report);
    }

    #[test]
    fn test_load_errors_are_typed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(SweepReport::load_json(missing.to_str().unwrap()), Err(SweepError::Io(_))));

        let garbled = dir.path().join("garbled.json");
        std::fs::write(&garbled, "{ \"trials\": 3").unwrap();
        assert!(matches!(SweepReport::load_json(garbled.to_str().unwrap()), Err(SweepError::Json(_))));
    }
}
