//! JSON sweep configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{import_images, load_idx_pair, Dataset};
use crate::error::Result;
use crate::network::assemble::AssemblyRules;
use crate::network::spec::InputShape;
use crate::sweep::domain::{Configuration, HyperparameterDomain};
use crate::train::train_config::TrainConfig;

/// Where the train and test sets come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum DatasetSource {
    /// MNIST-style IDX file pairs.
    Idx {
        train_images: PathBuf,
        train_labels: PathBuf,
        test_images: PathBuf,
        test_labels: PathBuf,
    },
    /// Folders of `<category>_<n>.png` images.
    ImageFolder { train_dir: PathBuf, test_dir: PathBuf },
}

impl Default for DatasetSource {
    fn default() -> Self {
        DatasetSource::Idx {
            train_images: "data/train-images-idx3-ubyte".into(),
            train_labels: "data/train-labels-idx1-ubyte".into(),
            test_images: "data/t10k-images-idx3-ubyte".into(),
            test_labels: "data/t10k-labels-idx1-ubyte".into(),
        }
    }
}

/// Loaded train and test sets, plus category names for image folders.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub train: Dataset,
    pub test: Dataset,
    pub categories: Vec<String>,
}

/// Everything needed to run a sweep from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub domain: HyperparameterDomain,
    pub baseline: Configuration,
    pub input_shape: InputShape,
    pub n_classes: usize,
    pub training: TrainConfig,
    #[serde(default)]
    pub rules: AssemblyRules,
    pub dataset: DatasetSource,
    #[serde(default)]
    pub train_limit: Option<usize>,
    #[serde(default)]
    pub test_limit: Option<usize>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            domain: HyperparameterDomain::default(),
            baseline: Configuration {
                conv_layers: 2,
                conv_filters: 32,
                filter_size: 3,
                dense_layers: 1,
                dense_units: 128,
            },
            input_shape: InputShape::default(),
            n_classes: 10,
            training: TrainConfig::default(),
            rules: AssemblyRules::default(),
            dataset: DatasetSource::default(),
            train_limit: None,
            test_limit: None,
        }
    }
}

impl SweepConfig {
    pub fn save_json(&self, path: &str) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_json(path: &str) -> Result<SweepConfig> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Reads both datasets and applies the sample limits.
    pub fn load_datasets(&self) -> Result<LoadedData> {
        let (mut train, mut test, categories) = match &self.dataset {
            DatasetSource::Idx { train_images, train_labels, test_images, test_labels } => {
                let train = load_idx_pair(train_images, train_labels, self.n_classes)?;
                let test = load_idx_pair(test_images, test_labels, self.n_classes)?;
                (train, test, Vec::new())
            }
            DatasetSource::ImageFolder { train_dir, test_dir } => {
                let (train, categories) = import_images(train_dir, self.input_shape, self.n_classes, Vec::new())?;
                let (test, categories) = import_images(test_dir, self.input_shape, self.n_classes, categories)?;
                (train, test, categories)
            }
        };
        if let Some(n) = self.train_limit {
            train.truncate(n);
        }
        if let Some(n) = self.test_limit {
            test.truncate(n);
        }
        info!(train = train.len(), test = test.len(), shape = ?train.input_shape, "datasets loaded");
        Ok(LoadedData { train, test, categories })
    }
}
