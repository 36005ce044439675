//! Weight of Evidence (WoE) and Information Value (IV).
//!
//! For every distinct value (bin) of a feature:
//!
//! ```text
//! good_dist = (good + ε) / (total_good + ε)
//! bad_dist  = (bad  + ε) / (total_bad  + ε)
//! woe       = ln(good_dist / bad_dist)
//! ```
//!
//! where `good` counts target = 1 and `bad` counts target = 0. Epsilon
//! keeps every WoE finite, including bins that are all good or all bad.
//!
//! RULE: a target without both classes is an error. It would otherwise
//! divide by zero and yield ∞/NaN.

use crate::{
    error::{FeatureError, FeatureResult},
    table::{Column, Table},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Bin label used for rows whose feature value is missing.
pub const MISSING_BIN: &str = "<missing>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WoeBin {
    pub bin:       String,
    pub count:     usize,
    pub good:      usize,
    pub bad:       usize,
    pub good_dist: f64,
    pub bad_dist:  f64,
    pub woe:       f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WoeTable {
    pub feature:    String,
    pub target:     String,
    pub epsilon:    f64,
    pub total_good: usize,
    pub total_bad:  usize,
    pub bins:       Vec<WoeBin>,
}

impl WoeTable {
    /// WoE of one bin, if present.
    pub fn woe(&self, bin: &str) -> Option<f64> {
        self.bins.iter().find(|b| b.bin == bin).map(|b| b.woe)
    }

    /// The public view: bin value → WoE.
    pub fn woe_map(&self) -> BTreeMap<String, f64> {
        self.bins.iter().map(|b| (b.bin.clone(), b.woe)).collect()
    }

    /// `Σ (good_dist − bad_dist) · woe` over all bins.
    pub fn information_value(&self) -> f64 {
        self.bins
            .iter()
            .map(|b| (b.good_dist - b.bad_dist) * b.woe)
            .sum()
    }
}

/// Target cells as booleans (`true` = 1). Anything but 0/1 is rejected.
fn binary_target(column: &Column, name: &str) -> FeatureResult<Vec<bool>> {
    let not_binary =
        || FeatureError::invalid(format!("Target column {name} must be binary (0 or 1)"));
    match column {
        Column::Int(v) => v
            .iter()
            .map(|x| match x {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(not_binary()),
            })
            .collect(),
        Column::Float(v) => v
            .iter()
            .map(|x| match x {
                Some(x) if *x == 0.0 => Ok(false),
                Some(x) if *x == 1.0 => Ok(true),
                _ => Err(not_binary()),
            })
            .collect(),
        _ => Err(not_binary()),
    }
}

/// Lower edge of an interval label such as `[2, 10)`.
fn interval_lower(label: &str) -> Option<f64> {
    let (lo, _) = label.strip_prefix('[')?.split_once(',')?;
    lo.trim().parse().ok()
}

/// Sort position of a bin key: keys with a numeric position first, by value,
/// then other present keys, then the missing bin.
fn bin_rank(key: Option<&str>, numeric: bool) -> (u8, f64) {
    let value = key.and_then(|k| {
        if numeric { k.parse::<f64>().ok() } else { interval_lower(k) }
    });
    match (key, value) {
        (Some(_), Some(v)) => (0, v),
        (Some(_), None) => (1, 0.0),
        (None, _) => (2, 0.0),
    }
}

/// Compute per-bin WoE of `feature_col` against the binary `target_col`.
///
/// Bins are ordered by value: numerically for numeric features, by lower
/// edge for interval labels, lexically otherwise, with the missing-value
/// bin last. Treat the result as a mapping.
pub fn calculate_woe(
    table: &Table,
    feature_col: &str,
    target_col: &str,
    epsilon: f64,
) -> FeatureResult<WoeTable> {
    log::info!("Calculating WoE for feature: {feature_col}");
    compute(table, feature_col, target_col, epsilon)
        .inspect(|w| {
            log::info!("WoE calculation successful for {feature_col}: {} bins", w.bins.len())
        })
        .inspect_err(|e| log::error!("Error in WoE calculation for {feature_col}: {e}"))
}

fn compute(
    table: &Table,
    feature_col: &str,
    target_col: &str,
    epsilon: f64,
) -> FeatureResult<WoeTable> {
    table.require(&[feature_col, target_col])?;
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(FeatureError::invalid(format!("epsilon must be positive, got {epsilon}")));
    }
    let target = binary_target(table.column(target_col)?, target_col)?;

    let total_good = target.iter().filter(|&&t| t).count();
    let total_bad = target.len() - total_good;
    if total_good == 0 || total_bad == 0 {
        return Err(FeatureError::invalid(format!(
            "Target column {target_col} has no variation (all 0s or all 1s)"
        )));
    }

    let numeric = table.column(feature_col)?.is_numeric();
    let mut groups = table.group_rows(feature_col)?;
    groups.sort_by(|a, b| {
        let (ra, va) = bin_rank(a.key.as_deref(), numeric);
        let (rb, vb) = bin_rank(b.key.as_deref(), numeric);
        ra.cmp(&rb).then(va.total_cmp(&vb)).then_with(|| a.key.cmp(&b.key))
    });

    let bins = groups
        .into_iter()
        .map(|g| {
            let count = g.rows.len();
            let good = g.rows.iter().filter(|&&r| target[r]).count();
            let bad = count - good;
            let good_dist = (good as f64 + epsilon) / (total_good as f64 + epsilon);
            let bad_dist = (bad as f64 + epsilon) / (total_bad as f64 + epsilon);
            WoeBin {
                bin: g.key.unwrap_or_else(|| MISSING_BIN.to_string()),
                count,
                good,
                bad,
                good_dist,
                bad_dist,
                woe: (good_dist / bad_dist).ln(),
            }
        })
        .collect();

    Ok(WoeTable {
        feature: feature_col.to_string(),
        target: target_col.to_string(),
        epsilon,
        total_good,
        total_bad,
        bins,
    })
}
