//! Discretization of numeric columns into labeled bins, so that numeric
//! features can be fed to the WoE analyzer.

use crate::{
    error::{FeatureError, FeatureResult},
    stats,
    table::{Column, Table},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinStrategy {
    /// `n_bins` equal-width intervals over [min, max].
    #[default]
    EqualWidth,
    /// Edges at the `i / n_bins` quantiles.
    Quantile,
}

/// Suffix of the label column added by [`bin_numeric`].
pub const BIN_SUFFIX: &str = "_bin";

/// Sorted, de-duplicated bin edges. Empty input gives no edges.
pub fn bin_edges(values: &[f64], n_bins: usize, strategy: BinStrategy) -> Vec<f64> {
    if values.is_empty() || n_bins == 0 {
        return Vec::new();
    }
    let mut edges: Vec<f64> = match strategy {
        BinStrategy::EqualWidth => {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let width = (max - min) / n_bins as f64;
            (0..=n_bins)
                .map(|i| if i == n_bins { max } else { min + width * i as f64 })
                .collect()
        }
        BinStrategy::Quantile => (0..=n_bins)
            .filter_map(|i| stats::quantile(values, i as f64 / n_bins as f64))
            .collect(),
    };
    edges.dedup();
    edges
}

/// Shortest decimal precision tried for edge labels.
const MIN_EDGE_DECIMALS: usize = 4;
const MAX_EDGE_DECIMALS: usize = 15;

fn fmt_edge(x: f64, decimals: usize) -> String {
    let s = format!("{x:.decimals$}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// One label per edge, at the fewest decimals that keep adjacent edges
/// apart. Falls back to the shortest round-trip form.
fn edge_labels(edges: &[f64]) -> Vec<String> {
    let distinct = |labels: &[String]| labels.windows(2).all(|w| w[0] != w[1]);
    for decimals in MIN_EDGE_DECIMALS..=MAX_EDGE_DECIMALS {
        let labels: Vec<String> = edges.iter().map(|&e| fmt_edge(e, decimals)).collect();
        if distinct(&labels) {
            return labels;
        }
    }
    edges
        .iter()
        .map(|&e| if e == 0.0 { "0".to_string() } else { e.to_string() })
        .collect()
}

/// Interval label of `x`; the last interval is closed on the right.
fn label_for(x: f64, edges: &[f64], labels: &[String]) -> String {
    if edges.len() == 1 {
        let e = &labels[0];
        return format!("[{e}, {e}]");
    }
    let last = edges.len() - 2;
    let idx = edges.partition_point(|e| *e <= x).saturating_sub(1).min(last);
    let (lo, hi) = (&labels[idx], &labels[idx + 1]);
    if idx == last {
        format!("[{lo}, {hi}]")
    } else {
        format!("[{lo}, {hi})")
    }
}

/// Add a `{column}_bin` text column holding each row's interval label.
/// Missing inputs get missing labels.
pub fn bin_numeric(
    table: &Table,
    column: &str,
    n_bins: usize,
    strategy: BinStrategy,
) -> FeatureResult<Table> {
    if n_bins == 0 {
        return Err(FeatureError::invalid("n_bins must be at least 1"));
    }
    let values = table
        .column(column)?
        .to_f64()
        .ok_or_else(|| FeatureError::invalid(format!("cannot bin non-numeric column '{column}'")))?;
    let edges = bin_edges(&stats::present(&values), n_bins, strategy);
    log::debug!("Bin edges for '{column}': {edges:?}");
    let edge_text = edge_labels(&edges);

    let labels = values
        .iter()
        .map(|v| v.map(|x| label_for(x, &edges, &edge_text)))
        .collect();
    table
        .clone()
        .with_column(format!("{column}{BIN_SUFFIX}"), Column::Text(labels))
}
