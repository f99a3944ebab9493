use std::fmt;
use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// One point in the architecture search space.
///
/// Created by [`ConfigurationGrid`] (or by hand for the baseline) and never
/// mutated afterwards; results carry an unchanged copy for traceability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    /// Number of convolution stages in the convolutional block.
    pub conv_layers: usize,
    /// Filters per convolution stage.
    pub conv_filters: usize,
    /// Square kernel edge length.
    pub filter_size: usize,
    /// Number of dense blocks (dense + dropout).
    pub dense_layers: usize,
    /// Units per dense block.
    pub dense_units: usize,
}

impl Configuration {
    /// The value this configuration takes along `dimension`.
    pub fn value(&self, dimension: Dimension) -> usize {
        match dimension {
            Dimension::ConvLayers => self.conv_layers,
            Dimension::ConvFilters => self.conv_filters,
            Dimension::FilterSize => self.filter_size,
            Dimension::DenseLayers => self.dense_layers,
            Dimension::DenseUnits => self.dense_units,
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conv{}x{}k{}-dense{}x{}",
            self.conv_layers, self.conv_filters, self.filter_size, self.dense_layers, self.dense_units
        )
    }
}

/// The five hyperparameter dimensions, outer to inner in grid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    ConvLayers,
    ConvFilters,
    FilterSize,
    DenseLayers,
    DenseUnits,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::ConvLayers,
        Dimension::ConvFilters,
        Dimension::FilterSize,
        Dimension::DenseLayers,
        Dimension::DenseUnits,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::ConvLayers => "conv_layers",
            Dimension::ConvFilters => "conv_filters",
            Dimension::FilterSize => "filter_size",
            Dimension::DenseLayers => "dense_layers",
            Dimension::DenseUnits => "dense_units",
        }
    }
}

/// Candidate values for each dimension of the sweep.
///
/// Values are used exactly as given: duplicates are not removed, so a
/// duplicated value yields duplicated configurations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperparameterDomain {
    pub conv_layers: Vec<usize>,
    pub conv_filters: Vec<usize>,
    pub filter_size: Vec<usize>,
    pub dense_layers: Vec<usize>,
    pub dense_units: Vec<usize>,
}

impl HyperparameterDomain {
    pub fn values(&self, dimension: Dimension) -> &[usize] {
        match dimension {
            Dimension::ConvLayers => &self.conv_layers,
            Dimension::ConvFilters => &self.conv_filters,
            Dimension::FilterSize => &self.filter_size,
            Dimension::DenseLayers => &self.dense_layers,
            Dimension::DenseUnits => &self.dense_units,
        }
    }

    /// Total number of configurations in the Cartesian product, or `None`
    /// if it does not fit in a `usize`.
    pub fn size(&self) -> Option<usize> {
        Dimension::ALL.iter().try_fold(1usize, |acc, &d| acc.checked_mul(self.values(d).len()))
    }

    /// Like [`size`](Self::size), with overflow reported as
    /// `ConfigurationInvalid`.
    pub fn checked_size(&self) -> Result<usize> {
        self.size().ok_or_else(|| SweepError::ConfigurationInvalid {
            label: "domain".to_owned(),
            reason: format!(
                "grid of {} x {} x {} x {} x {} configurations overflows",
                self.conv_layers.len(),
                self.conv_filters.len(),
                self.filter_size.len(),
                self.dense_layers.len(),
                self.dense_units.len()
            ),
        })
    }

    /// Lazily enumerates every configuration in nested order
    /// (`conv_layers` outermost, `dense_units` innermost).
    ///
    /// Calling this again restarts the enumeration from the first point. A
    /// grid too large for a `usize` stops after `usize::MAX` points; use
    /// [`checked_size`](Self::checked_size) to reject it up front.
    pub fn configurations(&self) -> ConfigurationGrid<'_> {
        ConfigurationGrid { domain: self, next: 0, end: self.size().unwrap_or(usize::MAX) }
    }
}

impl Default for HyperparameterDomain {
    fn default() -> Self {
        HyperparameterDomain {
            conv_layers: vec![1, 2, 3],
            conv_filters: vec![16, 32, 64],
            filter_size: vec![3, 5],
            dense_layers: vec![1, 2],
            dense_units: vec![64, 128],
        }
    }
}

impl<'a> IntoIterator for &'a HyperparameterDomain {
    type Item = Configuration;
    type IntoIter = ConfigurationGrid<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.configurations()
    }
}

/// Lazy, finite iterator over a [`HyperparameterDomain`].
///
/// Each position is decoded from a single mixed-radix counter, so nothing
/// beyond the counter is materialised regardless of grid size.
#[derive(Debug, Clone)]
pub struct ConfigurationGrid<'a> {
    domain: &'a HyperparameterDomain,
    next: usize,
    end: usize,
}

impl ConfigurationGrid<'_> {
    fn decode(&self, mut index: usize) -> Configuration {
        let mut picked = [0usize; 5];
        // Innermost dimension varies fastest.
        for (slot, &dimension) in Dimension::ALL.iter().enumerate().rev() {
            let values = self.domain.values(dimension);
            picked[slot] = values[index % values.len()];
            index /= values.len();
        }
        Configuration {
            conv_layers: picked[0],
            conv_filters: picked[1],
            filter_size: picked[2],
            dense_layers: picked[3],
            dense_units: picked[4],
        }
    }
}

impl Iterator for ConfigurationGrid<'_> {
    type Item = Configuration;

    fn next(&mut self) -> Option<Configuration> {
        if self.next >= self.end {
            return None;
        }
        let config = self.decode(self.next);
        self.next += 1;
        Some(config)
    }

    fn nth(&mut self, n: usize) -> Option<Configuration> {
        self.next = self.next.saturating_add(n).min(self.end);
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ConfigurationGrid<'_> {}

impl FusedIterator for ConfigurationGrid<'_> {}
