//! Missing-value imputation.
//!
//! Numeric columns take their median, categorical columns their most
//! frequent value. Timestamp columns are never touched.

use crate::{
    error::{FeatureError, FeatureResult},
    event::{PipelineEvent, Reporter},
    stage::{FeatureStage, StagePolicy},
    stats,
    table::{Column, ColumnKind, Table},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Median,
    MostFrequent,
}

impl ImputeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImputeStrategy::Median       => "median",
            ImputeStrategy::MostFrequent => "most_frequent",
        }
    }

    /// Default strategy for a column kind; `None` for kinds never imputed.
    pub fn for_kind(kind: ColumnKind) -> Option<Self> {
        match kind {
            ColumnKind::Int | ColumnKind::Float => Some(ImputeStrategy::Median),
            ColumnKind::Text                    => Some(ImputeStrategy::MostFrequent),
            ColumnKind::Timestamp               => None,
        }
    }
}

/// Per-column imputation plan.
#[derive(Debug, Clone, Default)]
pub struct Imputer {
    strategies: Vec<(String, ImputeStrategy)>,
}

impl Imputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Median for every numeric column, most-frequent for every text column.
    pub fn auto(table: &Table) -> Self {
        let strategies = table
            .columns()
            .filter_map(|(name, col)| {
                ImputeStrategy::for_kind(col.kind()).map(|s| (name.to_string(), s))
            })
            .collect();
        Self { strategies }
    }

    pub fn with_strategy(mut self, column: impl Into<String>, strategy: ImputeStrategy) -> Self {
        self.strategies.push((column.into(), strategy));
        self
    }

    /// Fill every missing cell of the planned columns. A planned column with
    /// no values at all is dropped, since no fill value can be learned.
    pub fn fit_transform(&self, table: &Table, reporter: &mut dyn Reporter) -> FeatureResult<Table> {
        let mut out = table.clone();
        for (name, strategy) in &self.strategies {
            let column = out.column(name)?;
            let missing = column.null_count();
            if missing == 0 {
                continue;
            }
            if missing == column.len() {
                log::warn!("Column '{name}' has no observed values; dropping it");
                out.drop_column(name)?;
                reporter.report(PipelineEvent::ColumnDropped {
                    column: name.clone(),
                    reason: "all values missing".into(),
                });
                continue;
            }
            let filled = match strategy {
                ImputeStrategy::Median       => fill_median(column, name)?,
                ImputeStrategy::MostFrequent => fill_most_frequent(column),
            };
            out.set_column(name.clone(), filled)?;
            reporter.report(PipelineEvent::ColumnImputed {
                column:   name.clone(),
                strategy: strategy.as_str().into(),
                filled:   missing,
            });
        }
        Ok(out)
    }
}

fn fill_median(column: &Column, name: &str) -> FeatureResult<Column> {
    let values = column.to_f64().ok_or_else(|| {
        FeatureError::invalid(format!("median imputation needs a numeric column, '{name}' is not"))
    })?;
    let median = stats::median(&stats::present(&values))
        .ok_or_else(|| FeatureError::invalid(format!("column '{name}' has no values")))?;
    Ok(Column::Float(values.into_iter().map(|v| Some(v.unwrap_or(median))).collect()))
}

/// Ties go to the smallest rendered value.
fn fill_most_frequent(column: &Column) -> Column {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in 0..column.len() {
        if let Some(k) = column.key_at(row) {
            *counts.entry(k).or_default() += 1;
        }
    }
    let mode = counts
        .iter()
        .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then_with(|| kb.cmp(ka)))
        .map(|(k, _)| k.clone())
        .unwrap_or_default();

    match column {
        Column::Int(v) => {
            let fill = mode.parse::<i64>().ok();
            Column::Int(v.iter().map(|x| x.or(fill)).collect())
        }
        Column::Float(v) => {
            let fill = mode.parse::<f64>().ok();
            Column::Float(v.iter().map(|x| x.filter(|f| !f.is_nan()).or(fill)).collect())
        }
        Column::Text(v) => {
            Column::Text(v.iter().map(|x| x.clone().or_else(|| Some(mode.clone()))).collect())
        }
        Column::Timestamp(_) => column.clone(),
    }
}

/// Impute every column with its kind's default strategy.
pub fn impute_missing(table: &Table, reporter: &mut dyn Reporter) -> FeatureResult<Table> {
    Imputer::auto(table).fit_transform(table, reporter)
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct ImputeStage;

impl FeatureStage for ImputeStage {
    fn name(&self) -> &'static str {
        "impute"
    }

    fn policy(&self) -> StagePolicy {
        StagePolicy::FailFast
    }

    fn apply(&self, table: &Table, reporter: &mut dyn Reporter) -> FeatureResult<Table> {
        impute_missing(table, reporter)
    }
}
