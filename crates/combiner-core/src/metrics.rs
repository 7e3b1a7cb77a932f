use crate::error::{CombinerError, Result};
use combiner_common::types::{MetricEntry, MetricKind, ReportedMetric};

/// Turn collaborator-reported metrics into typed entries.
///
/// A single unrecognised kind rejects the whole set; the error detail is the
/// JSON rendering of everything that was reported.
pub fn validate_metrics(reported: &[ReportedMetric]) -> Result<Vec<MetricEntry>> {
    let mut entries = Vec::with_capacity(reported.len());
    for metric in reported {
        match metric.kind.parse::<MetricKind>() {
            Ok(kind) => entries.push(MetricEntry {
                kind,
                key: metric.key.clone(),
                value: metric.value,
            }),
            Err(e) => {
                tracing::warn!(key = %metric.key, error = %e, "Collaborator reported an invalid metric");
                let detail = serde_json::to_string(reported).unwrap_or_else(|_| e.clone());
                return Err(CombinerError::InvalidMetrics(detail));
            }
        }
    }
    Ok(entries)
}
