//! Calendar decomposition of the transaction timestamp.
//!
//! Unparseable timestamps become missing and are reported; the imputer
//! later fills the derived columns.

use crate::{
    error::FeatureResult,
    event::{PipelineEvent, Reporter},
    stage::{FeatureStage, StagePolicy},
    table::{Column, Table},
    timestamp,
};
use chrono::{Datelike, NaiveDateTime, Timelike};

pub const TRANSACTION_HOUR: &str = "transaction_hour";
pub const TRANSACTION_DAY: &str = "transaction_day";
pub const TRANSACTION_MONTH: &str = "transaction_month";
pub const TRANSACTION_YEAR: &str = "transaction_year";
pub const TRANSACTION_DAYOFWEEK: &str = "transaction_dayofweek";

/// Parse `time_col` (coercing bad values to missing) and add hour, day,
/// month, year and day-of-week (Monday = 0) columns.
pub fn extract_time_features(
    table: &Table,
    time_col: &str,
    reporter: &mut dyn Reporter,
) -> FeatureResult<Table> {
    let (parsed, coerced) = timestamp::parse_coerce(table.column(time_col)?);
    if coerced > 0 {
        reporter.report(PipelineEvent::TimestampsCoerced {
            column: time_col.to_string(),
            coerced,
        });
    }

    let part = |f: fn(&NaiveDateTime) -> i64| -> Column {
        Column::Int(parsed.iter().map(|t| t.as_ref().map(f)).collect())
    };

    let mut out = table.clone();
    out.set_column(TRANSACTION_HOUR, part(|t| i64::from(t.hour())))?;
    out.set_column(TRANSACTION_DAY, part(|t| i64::from(t.day())))?;
    out.set_column(TRANSACTION_MONTH, part(|t| i64::from(t.month())))?;
    out.set_column(TRANSACTION_YEAR, part(|t| i64::from(t.year())))?;
    out.set_column(
        TRANSACTION_DAYOFWEEK,
        part(|t| i64::from(t.weekday().num_days_from_monday())),
    )?;
    out.set_column(time_col, Column::Timestamp(parsed))?;

    log::info!("Extracted calendar features from '{time_col}'");
    Ok(out)
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct TimeFeatureStage {
    time_col: String,
    policy:   StagePolicy,
}

impl TimeFeatureStage {
    pub fn new(time_col: impl Into<String>, policy: StagePolicy) -> Self {
        Self { time_col: time_col.into(), policy }
    }
}

impl FeatureStage for TimeFeatureStage {
    fn name(&self) -> &'static str {
        "time_features"
    }

    fn policy(&self) -> StagePolicy {
        self.policy
    }

    fn apply(&self, table: &Table, reporter: &mut dyn Reporter) -> FeatureResult<Table> {
        extract_time_features(table, &self.time_col, reporter)
    }
}
