//! Numerical scaling with fit_transform semantics.
//!
//! Standardization uses the population standard deviation; a constant
//! column keeps scale 1 so it maps to all zeros. Min-max maps into [0, 1];
//! a constant column maps to 0. Missing cells are ignored when fitting and
//! stay missing.

use crate::{
    config::ScalingConfig,
    error::{FeatureError, FeatureResult},
    event::Reporter,
    stage::{FeatureStage, StagePolicy},
    stats,
    table::{Column, Table},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMethod {
    #[default]
    Standardize,
    MinMax,
}

/// Learned `(x - offset) / scale` parameters for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnScale {
    pub column: String,
    pub offset: f64,
    pub scale:  f64,
}

#[derive(Debug, Clone)]
pub struct Scaler {
    method: ScaleMethod,
    params: Vec<ColumnScale>,
}

impl Scaler {
    pub fn fit(table: &Table, columns: &[String], method: ScaleMethod) -> FeatureResult<Self> {
        let params = columns
            .iter()
            .map(|name| {
                let values = numeric(table, name)?;
                let present = stats::present(&values);
                let (offset, scale) = match method {
                    ScaleMethod::Standardize => {
                        let mean = stats::mean(&present);
                        let std = stats::std_dev(&present, 0);
                        (mean, std)
                    }
                    ScaleMethod::MinMax => {
                        let min = present.iter().copied().reduce(f64::min);
                        let max = present.iter().copied().reduce(f64::max);
                        (min, min.zip(max).map(|(lo, hi)| hi - lo))
                    }
                };
                let (offset, scale) = offset.zip(scale).ok_or_else(|| {
                    FeatureError::invalid(format!("column '{name}' has no values to fit a scaler"))
                })?;
                Ok(ColumnScale {
                    column: name.clone(),
                    offset,
                    scale: if scale == 0.0 { 1.0 } else { scale },
                })
            })
            .collect::<FeatureResult<Vec<_>>>()?;
        Ok(Self { method, params })
    }

    pub fn method(&self) -> ScaleMethod {
        self.method
    }

    pub fn params(&self) -> &[ColumnScale] {
        &self.params
    }

    pub fn transform(&self, table: &Table) -> FeatureResult<Table> {
        let mut out = table.clone();
        for p in &self.params {
            let scaled = numeric(table, &p.column)?
                .into_iter()
                .map(|v| v.map(|x| (x - p.offset) / p.scale))
                .collect();
            out.set_column(p.column.clone(), Column::Float(scaled))?;
        }
        Ok(out)
    }
}

fn numeric(table: &Table, name: &str) -> FeatureResult<Vec<Option<f64>>> {
    table
        .column(name)?
        .to_f64()
        .ok_or_else(|| FeatureError::invalid(format!("column '{name}' is not numeric")))
}

/// Fit and apply a scaler over `columns` of the same table.
pub fn normalize_numerical_features(
    table: &Table,
    columns: &[String],
    method: ScaleMethod,
) -> FeatureResult<Table> {
    log::info!("Scaling {} columns using {method:?}", columns.len());
    let scaled = Scaler::fit(table, columns, method)?.transform(table);
    if let Err(e) = &scaled {
        log::error!("Scaling failed: {e}");
    }
    scaled
}

/// Min-max scale `columns` into [0, 1].
pub fn normalize_columns(table: &Table, columns: &[String]) -> FeatureResult<Table> {
    normalize_numerical_features(table, columns, ScaleMethod::MinMax)
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct ScaleStage {
    config: ScalingConfig,
}

impl ScaleStage {
    pub fn new(config: ScalingConfig) -> Self {
        Self { config }
    }

    /// Explicit columns if configured, otherwise every numeric column;
    /// excluded names are removed either way.
    fn resolve_columns(&self, table: &Table) -> Vec<String> {
        let candidates: Vec<String> = match &self.config.columns {
            Some(cols) => cols.clone(),
            None => table
                .columns()
                .filter(|(_, col)| col.is_numeric())
                .map(|(name, _)| name.to_string())
                .collect(),
        };
        candidates
            .into_iter()
            .filter(|c| !self.config.exclude.contains(c))
            .collect()
    }
}

impl FeatureStage for ScaleStage {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn policy(&self) -> StagePolicy {
        StagePolicy::FailFast
    }

    fn apply(&self, table: &Table, _reporter: &mut dyn Reporter) -> FeatureResult<Table> {
        let columns = self.resolve_columns(table);
        normalize_numerical_features(table, &columns, self.config.method)
    }
}
