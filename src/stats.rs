//! Lookahead windows and the median rule used to separate losses from noise.

use serde::{Deserialize, Serialize};

use crate::measurement::Measurement;

/// Default number of samples in a lookahead window.
pub const DEFAULT_LOOKAHEAD: usize = 5;

/// How the median of an even-length window is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedianRule {
    /// `lower + upper / 2` for even windows. Matches the behavior existing
    /// dashboards were calibrated against.
    #[default]
    LowerPlusHalfUpper,
    /// Arithmetic mean of the two central values.
    Mean,
}

impl MedianRule {
    /// Median of `values`; sorts in place. An empty slice yields 0.
    pub fn median(self, values: &mut [f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }

        values.sort_by(f64::total_cmp);

        let center = values.len() / 2;
        if values.len() % 2 == 1 {
            return values[center];
        }

        let lower = values[center - 1];
        let upper = values[center];
        match self {
            MedianRule::LowerPlusHalfUpper => lower + upper / 2.0,
            MedianRule::Mean => (lower + upper) / 2.0,
        }
    }
}

/// Up to `len` samples starting at `start`, truncated at the series end.
pub fn lookahead(series: &[Measurement], start: usize, len: usize) -> &[Measurement] {
    if start >= series.len() {
        return &[];
    }
    let end = start.saturating_add(len).min(series.len());
    &series[start..end]
}

/// Median QoS of the lookahead window starting at `start`.
pub fn median_qos_ahead(series: &[Measurement], start: usize, len: usize, rule: MedianRule) -> f64 {
    let mut values: Vec<f64> = lookahead(series, start, len).iter().map(|m| m.qos).collect();
    rule.median(&mut values)
}

/// Index of the lowest QoS in the lookahead window starting at `start`.
///
/// Ties keep the earliest sample.
pub fn min_qos_index_ahead(series: &[Measurement], start: usize, len: usize) -> usize {
    let window = lookahead(series, start, len);
    let mut index_minimum = start;
    let mut minimum = match window.first() {
        Some(first) => first.qos,
        None => return start,
    };

    for (offset, sample) in window.iter().enumerate().skip(1) {
        if sample.qos < minimum {
            minimum = sample.qos;
            index_minimum = start + offset;
        }
    }

    index_minimum
}
