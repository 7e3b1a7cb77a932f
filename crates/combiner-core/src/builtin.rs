//! Aggregators shipped with the service, selectable from configuration.

use crate::model::{Aggregate, AggregateInput, Aggregated, MetadataSource, UserModel};
use anyhow::bail;
use combiner_common::types::{NdArray, ReportedMetric, Tags};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinKind {
    /// Pass the first message through.
    #[default]
    First,
    /// Element-wise mean of equally shaped arrays.
    Mean,
    /// Element-wise maximum of equally shaped arrays.
    Max,
}

impl std::fmt::Display for BuiltinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuiltinKind::First => write!(f, "first"),
            BuiltinKind::Mean => write!(f, "mean"),
            BuiltinKind::Max => write!(f, "max"),
        }
    }
}

impl std::str::FromStr for BuiltinKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(BuiltinKind::First),
            "mean" => Ok(BuiltinKind::Mean),
            "max" => Ok(BuiltinKind::Max),
            _ => Err(format!("unknown aggregator: {s}")),
        }
    }
}

/// A built-in high-level aggregator with a static tag table.
///
/// Numeric kinds fall back to selecting the first message when any input is
/// binary or text.
///
/// # Examples
///
/// ```
/// use combiner_common::types::{NdArray, Tags};
/// use combiner_core::builtin::{BuiltinAggregator, BuiltinKind};
/// use combiner_core::model::{Aggregate, AggregateInput, Aggregated};
///
/// let mean = BuiltinAggregator::new(BuiltinKind::Mean, Tags::new());
/// let a = NdArray::from_vec(vec![1.0, 2.0]);
/// let b = NdArray::from_vec(vec![3.0, 6.0]);
/// let out = mean
///     .aggregate(&[AggregateInput::Array(&a), AggregateInput::Array(&b)], &[&[], &[]])
///     .unwrap();
/// assert_eq!(out, Aggregated::Array(NdArray::from_vec(vec![2.0, 4.0])));
/// ```
#[derive(Debug, Clone)]
pub struct BuiltinAggregator {
    kind: BuiltinKind,
    tags: Tags,
}

impl BuiltinAggregator {
    pub fn new(kind: BuiltinKind, tags: Tags) -> Self {
        Self { kind, tags }
    }

    pub fn kind(&self) -> BuiltinKind {
        self.kind
    }

    /// Wrap into a [`UserModel`] serving both transports through the high-level contract.
    pub fn into_model(self) -> UserModel {
        let name = self.kind.to_string();
        UserModel::from_aggregate(Arc::new(self)).named(name)
    }
}

impl Aggregate for BuiltinAggregator {
    fn aggregate(
        &self,
        inputs: &[AggregateInput<'_>],
        _feature_names: &[&[String]],
    ) -> anyhow::Result<Aggregated> {
        if self.kind == BuiltinKind::First {
            return Ok(Aggregated::Select(0));
        }
        let Some(arrays) = inputs
            .iter()
            .map(AggregateInput::as_array)
            .collect::<Option<Vec<_>>>()
        else {
            return Ok(Aggregated::Select(0));
        };
        let Some((first, rest)) = arrays.split_first() else {
            bail!("no inputs to aggregate");
        };
        for (i, array) in rest.iter().enumerate() {
            if array.shape() != first.shape() {
                bail!(
                    "input {} has shape {:?} but input 0 has shape {:?}",
                    i + 1,
                    array.shape(),
                    first.shape()
                );
            }
        }

        let mut acc = first.values().to_vec();
        for array in rest {
            for (slot, v) in acc.iter_mut().zip(array.values()) {
                match self.kind {
                    BuiltinKind::Max => *slot = slot.max(*v),
                    BuiltinKind::Mean | BuiltinKind::First => *slot += v,
                }
            }
        }
        if self.kind == BuiltinKind::Mean {
            let n = arrays.len() as f64;
            acc.iter_mut().for_each(|v| *v /= n);
        }
        let array = NdArray::new(first.shape().to_vec(), acc).map_err(anyhow::Error::msg)?;
        Ok(Aggregated::Array(array))
    }
}

impl MetadataSource for BuiltinAggregator {
    fn tags(&self) -> Tags {
        self.tags.clone()
    }

    fn metrics(&self) -> Vec<ReportedMetric> {
        vec![ReportedMetric::new(
            "COUNTER",
            format!("{}_aggregations", self.kind),
            1.0,
        )]
    }
}
