use serde::{Serialize, Deserialize};

use crate::activation::ActivationFunction;
use crate::error::{Result, SweepError};
use crate::network::spec::{InputShape, ModelDescription, StageSpec};
use crate::sweep::domain::Configuration;

/// Fixed construction parameters shared by every model in a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssemblyRules {
    /// Edge length of the single pooling window after the convolution block.
    pub pool_size: usize,
    /// Rate used by every dropout stage.
    pub dropout_rate: f64,
}

impl Default for AssemblyRules {
    fn default() -> Self {
        AssemblyRules { pool_size: 2, dropout_rate: 0.5 }
    }
}

/// Builds the description for `config` using the default [`AssemblyRules`].
pub fn assemble(input_shape: InputShape, n_classes: usize, config: &Configuration) -> Result<ModelDescription> {
    assemble_with(&AssemblyRules::default(), input_shape, n_classes, config, config.to_string())
}

/// Builds a description named `name`.
///
/// Layout:
/// ```text
/// Input
/// Conv2d × conv_layers
/// MaxPool2d, Dropout          (once, after the whole conv block)
/// Flatten
/// (Dense, Dropout) × dense_layers
/// Dropout, Classifier
/// ```
///
/// Zero conv or dense blocks are allowed; the pooling, flatten and output
/// stages are always present.
pub fn assemble_with(
    rules: &AssemblyRules,
    input_shape: InputShape,
    n_classes: usize,
    config: &Configuration,
    name: impl Into<String>,
) -> Result<ModelDescription> {
    let name = name.into();
    let invalid = |reason: String| SweepError::ConfigurationInvalid { label: name.clone(), reason };

    if config.conv_layers > 0 && (config.conv_filters == 0 || config.filter_size == 0) {
        return Err(invalid(format!(
            "{} convolution layers need a positive filter count and size",
            config.conv_layers
        )));
    }
    if config.dense_layers > 0 && config.dense_units == 0 {
        return Err(invalid(format!("{} dense layers need a positive unit count", config.dense_layers)));
    }
    if n_classes == 0 {
        return Err(invalid("the classifier needs at least one class".to_owned()));
    }

    let mut stages = Vec::with_capacity(6 + config.conv_layers + 2 * config.dense_layers);
    stages.push(StageSpec::Input { shape: input_shape });

    for _ in 0..config.conv_layers {
        stages.push(StageSpec::Conv2d {
            filters: config.conv_filters,
            kernel_size: config.filter_size,
            activation: ActivationFunction::ReLU,
        });
    }
    stages.push(StageSpec::MaxPool2d { pool_size: rules.pool_size });
    stages.push(StageSpec::Dropout { rate: rules.dropout_rate });
    stages.push(StageSpec::Flatten);

    for _ in 0..config.dense_layers {
        stages.push(StageSpec::Dense { units: config.dense_units, activation: ActivationFunction::ReLU });
        stages.push(StageSpec::Dropout { rate: rules.dropout_rate });
    }
    stages.push(StageSpec::Dropout { rate: rules.dropout_rate });
    stages.push(StageSpec::Classifier { classes: n_classes });

    let description = ModelDescription { name, stages };
    // Catches feature maps that shrink away and zero-sized inputs.
    description.output_shapes().map_err(|reason| SweepError::ConfigurationInvalid {
        label: description.name.clone(),
        reason,
    })?;
    Ok(description)
}
