//! RFMS (Recency, Frequency, Monetary, Stability) labeling.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. compute_recency            adds Recency
//!   2. compute_frequency_monetary adds Frequency, Monetary
//!   3. assign_rfms_label          thresholds read the columns from 1-2
//!   4. assign_user_labels         renders RFMS_Label as Good/Bad
//!
//! RULE: this module fails fast. A bad timestamp, a missing column or an
//! out-of-domain label is an error, never a silently degraded label.

use crate::{
    config::{ColumnConfig, PipelineConfig, RfmsConfig},
    error::{FeatureError, FeatureResult},
    event::{PipelineEvent, Reporter},
    stage::{FeatureStage, StagePolicy},
    stats,
    table::{Aggregate, Column, Table},
    timestamp,
    types::{RiskLabel, BAD, GOOD},
};
use serde::{Deserialize, Serialize};

pub const RECENCY: &str = "Recency";
pub const FREQUENCY: &str = "Frequency";
pub const MONETARY: &str = "Monetary";
pub const RFMS_LABEL: &str = "RFMS_Label";
pub const USER_LABEL: &str = "User_Label";

pub const GOOD_LABEL: &str = "Good";
pub const BAD_LABEL: &str = "Bad";

// ── Thresholds ───────────────────────────────────────────────────────────────

/// The thresholds a labeling pass actually used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RfmsThresholds {
    pub recency:   f64,
    pub frequency: f64,
    pub monetary:  f64,
}

impl RfmsThresholds {
    /// Explicit thresholds where given, the column median otherwise.
    /// An explicit 0 is a real threshold, not "unset".
    pub fn resolve(table: &Table, explicit: &RfmsConfig) -> FeatureResult<Self> {
        let pick = |given: Option<f64>, column: &str| -> FeatureResult<f64> {
            match given {
                Some(t) => Ok(t),
                None => stats::median(&complete_numeric(table, column)?).ok_or_else(|| {
                    FeatureError::invalid(format!("cannot take the median of empty column '{column}'"))
                }),
            }
        };
        Ok(Self {
            recency:   pick(explicit.recency_threshold, RECENCY)?,
            frequency: pick(explicit.frequency_threshold, FREQUENCY)?,
            monetary:  pick(explicit.monetary_threshold, MONETARY)?,
        })
    }

    /// Good iff recent enough, frequent enough and valuable enough.
    /// Ties at a threshold count as Good on every dimension.
    pub fn label(&self, recency: f64, frequency: f64, monetary: f64) -> RiskLabel {
        if recency <= self.recency && frequency >= self.frequency && monetary >= self.monetary {
            GOOD
        } else {
            BAD
        }
    }
}

/// Numeric column without missing or non-finite cells.
fn complete_numeric(table: &Table, column: &str) -> FeatureResult<Vec<f64>> {
    let values = table
        .column(column)?
        .to_f64()
        .ok_or_else(|| FeatureError::invalid(format!("column '{column}' must be numeric")))?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(x) if x.is_finite() => Ok(x),
            Some(x) => Err(FeatureError::invalid(format!(
                "column '{column}' has a non-finite value {x} at row {row}"
            ))),
            None => Err(FeatureError::invalid(format!(
                "column '{column}' has a missing value at row {row}"
            ))),
        })
        .collect()
}

// ── Steps ────────────────────────────────────────────────────────────────────

/// Days between each row's timestamp and the latest timestamp in the table.
///
/// The parsed timestamps replace `time_col`. Any unparseable or missing
/// timestamp fails the whole column.
pub fn compute_recency(table: &Table, time_col: &str) -> FeatureResult<Table> {
    let parsed = timestamp::parse_strict(table.column(time_col)?, time_col)?;
    let recency = match parsed.iter().max() {
        Some(&max_date) => parsed
            .iter()
            .map(|t| Some((max_date - *t).num_days()))
            .collect(),
        None => Vec::new(),
    };

    let mut out = table.clone();
    out.set_column(time_col, Column::Timestamp(parsed.into_iter().map(Some).collect()))?;
    out.set_column(RECENCY, Column::Int(recency))?;
    log::info!("Recency computed for {} rows", out.height());
    Ok(out)
}

/// Per-customer row count and amount sum, joined onto every row of the
/// customer.
pub fn compute_frequency_monetary(table: &Table, cols: &ColumnConfig) -> FeatureResult<Table> {
    table.require(&[cols.customer_id.as_str(), cols.amount.as_str()])?;
    let amounts = table
        .column(&cols.amount)?
        .to_f64()
        .ok_or_else(|| FeatureError::invalid(format!("column '{}' must be numeric", cols.amount)))?;

    let groups: Vec<_> = table
        .group_rows(&cols.customer_id)?
        .into_iter()
        .filter(|g| g.key.is_some())
        .collect();

    let mut keys = Vec::with_capacity(groups.len());
    let mut frequency = Vec::with_capacity(groups.len());
    let mut monetary = Vec::with_capacity(groups.len());
    for group in groups {
        frequency.push(Some(group.rows.len() as i64));
        monetary.push(Some(group.rows.iter().filter_map(|&r| amounts[r]).sum::<f64>()));
        keys.extend(group.key);
    }

    let aggregate = Aggregate::new(keys)?
        .with_column(FREQUENCY, Column::Int(frequency))?
        .with_column(MONETARY, Column::Float(monetary))?;
    log::info!("Frequency and monetary computed for {} customers", aggregate.len());
    table.left_join_aggregate(&cols.customer_id, &aggregate)
}

/// Label every row with resolved thresholds.
pub fn assign_rfms_label_with(table: &Table, thresholds: &RfmsThresholds) -> FeatureResult<Table> {
    let recency = complete_numeric(table, RECENCY)?;
    let frequency = complete_numeric(table, FREQUENCY)?;
    let monetary = complete_numeric(table, MONETARY)?;

    let labels = (0..table.height())
        .map(|r| Some(thresholds.label(recency[r], frequency[r], monetary[r])))
        .collect();
    table.clone().with_column(RFMS_LABEL, Column::Int(labels))
}

/// Label every row; thresholds not given explicitly default to the median.
pub fn assign_rfms_label(table: &Table, explicit: &RfmsConfig) -> FeatureResult<Table> {
    let thresholds = RfmsThresholds::resolve(table, explicit)?;
    log::debug!("RFMS thresholds: {thresholds:?}");
    assign_rfms_label_with(table, &thresholds)
}

/// Render RFMS_Label as User_Label: 0 → Good, 1 → Bad.
pub fn assign_user_labels(table: &Table) -> FeatureResult<Table> {
    let labels = table.column(RFMS_LABEL)?;
    let rendered = (0..table.height())
        .map(|row| match labels.f64_at(row) {
            Some(v) if v == GOOD as f64 => Ok(Some(GOOD_LABEL.to_string())),
            Some(v) if v == BAD as f64  => Ok(Some(BAD_LABEL.to_string())),
            _ => {
                let raw = labels.key_at(row).unwrap_or_else(|| "<missing>".into());
                Err(FeatureError::Mapping(format!(
                    "{RFMS_LABEL} value '{raw}' at row {row} is not 0 or 1"
                )))
            }
        })
        .collect::<FeatureResult<Vec<_>>>()
        .inspect_err(|e| log::error!("{e}"))?;
    table.clone().with_column(USER_LABEL, Column::Text(rendered))
}

/// Run the four RFMS steps in their fixed order.
pub fn calculate_rfms(
    table: &Table,
    config: &PipelineConfig,
    reporter: &mut dyn Reporter,
) -> FeatureResult<Table> {
    run_steps(table, config, reporter).inspect_err(|e| log::error!("RFMS calculation failed: {e}"))
}

fn run_steps(
    table: &Table,
    config: &PipelineConfig,
    reporter: &mut dyn Reporter,
) -> FeatureResult<Table> {
    let cols = &config.columns;
    table.require(&[cols.customer_id.as_str(), cols.amount.as_str(), cols.timestamp.as_str()])?;

    let with_recency = compute_recency(table, &cols.timestamp)?;
    let with_fm = compute_frequency_monetary(&with_recency, cols)?;

    let thresholds = RfmsThresholds::resolve(&with_fm, &config.rfms)?;
    reporter.report(PipelineEvent::ThresholdsResolved {
        recency:   thresholds.recency,
        frequency: thresholds.frequency,
        monetary:  thresholds.monetary,
    });
    let labeled = assign_rfms_label_with(&with_fm, &thresholds)?;

    let (good, bad) = label_counts(&labeled)?;
    reporter.report(PipelineEvent::LabelsAssigned { good, bad });
    assign_user_labels(&labeled)
}

fn label_counts(table: &Table) -> FeatureResult<(usize, usize)> {
    let labels = table.column(RFMS_LABEL)?;
    let good = (0..table.height())
        .filter(|&r| labels.f64_at(r) == Some(GOOD as f64))
        .count();
    Ok((good, table.height() - good))
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct RfmsStage {
    config: PipelineConfig,
}

impl RfmsStage {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl FeatureStage for RfmsStage {
    fn name(&self) -> &'static str {
        "rfms"
    }

    fn policy(&self) -> StagePolicy {
        StagePolicy::FailFast
    }

    fn apply(&self, table: &Table, reporter: &mut dyn Reporter) -> FeatureResult<Table> {
        calculate_rfms(table, &self.config, reporter)
    }
}
