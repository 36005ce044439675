//! Categorical encoders.
//!
//! `OneHotEncoder` replaces a column with `{column}_{category}` indicator
//! columns; `LabelEncoder` replaces an identifier column with a dense
//! integer code. Both learn their categories in `fit` and apply them in
//! `transform`.

use crate::{
    config::PipelineConfig,
    error::{FeatureError, FeatureResult},
    event::{PipelineEvent, Reporter},
    stage::{FeatureStage, StagePolicy},
    table::{Column, Table},
    types::GroupKey,
};
use std::collections::{BTreeSet, HashMap};

/// Rendering of a missing cell for label encoding.
pub const MISSING_LABEL: &str = "nan";

fn sorted_categories(column: &Column) -> Vec<GroupKey> {
    let distinct: BTreeSet<GroupKey> = (0..column.len()).filter_map(|r| column.key_at(r)).collect();
    let mut categories: Vec<GroupKey> = distinct.into_iter().collect();
    if column.is_numeric() {
        categories.sort_by(|a, b| {
            let a = a.parse::<f64>().unwrap_or(f64::NAN);
            let b = b.parse::<f64>().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        });
    }
    categories
}

// ── One-hot ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OneHotEncoder {
    categories: Vec<(String, Vec<GroupKey>)>,
}

impl OneHotEncoder {
    /// Learn the sorted distinct non-missing categories of each column.
    pub fn fit(table: &Table, columns: &[String]) -> FeatureResult<Self> {
        let categories = columns
            .iter()
            .map(|name| Ok((name.clone(), sorted_categories(table.column(name)?))))
            .collect::<FeatureResult<Vec<_>>>()?;
        Ok(Self { categories })
    }

    pub fn categories(&self, column: &str) -> Option<&[GroupKey]> {
        self.categories
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cats)| cats.as_slice())
    }

    /// Output column names, in the order `transform` appends them.
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|(name, cats)| cats.iter().map(move |c| format!("{name}_{c}")))
            .collect()
    }

    /// Replace each fitted column with indicator columns appended at the end.
    /// Unknown and missing values produce all-zero indicators.
    pub fn transform(&self, table: &Table) -> FeatureResult<Table> {
        let mut out = table.clone();
        let mut indicators = Vec::new();
        for (name, cats) in &self.categories {
            let column = out.drop_column(name)?;
            for cat in cats {
                let values = (0..column.len())
                    .map(|r| {
                        let hit = column.key_at(r).as_deref() == Some(cat.as_str());
                        Some(if hit { 1.0 } else { 0.0 })
                    })
                    .collect();
                indicators.push((format!("{name}_{cat}"), Column::Float(values)));
            }
        }
        for (name, column) in indicators {
            out.set_column(name, column)?;
        }
        Ok(out)
    }
}

// ── Label ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LabelEncoder {
    column:  String,
    classes: Vec<GroupKey>,
}

impl LabelEncoder {
    /// Learn the sorted distinct values of `column`. Missing cells count as
    /// their own class, rendered as [`MISSING_LABEL`].
    pub fn fit(table: &Table, column: &str) -> FeatureResult<Self> {
        let values = table.column(column)?;
        let classes: BTreeSet<GroupKey> = (0..values.len())
            .map(|r| values.key_at(r).unwrap_or_else(|| MISSING_LABEL.to_string()))
            .collect();
        Ok(Self {
            column:  column.to_string(),
            classes: classes.into_iter().collect(),
        })
    }

    pub fn classes(&self) -> &[GroupKey] {
        &self.classes
    }

    /// Replace the column with codes in `0..classes.len()`.
    pub fn transform(&self, table: &Table) -> FeatureResult<Table> {
        let values = table.column(&self.column)?;
        let lookup: HashMap<&str, i64> = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i as i64))
            .collect();
        let codes = (0..values.len())
            .map(|r| {
                let key = values.key_at(r).unwrap_or_else(|| MISSING_LABEL.to_string());
                lookup.get(key.as_str()).copied().map(Some).ok_or_else(|| {
                    FeatureError::invalid(format!(
                        "unseen label '{key}' in column '{}'",
                        self.column
                    ))
                })
            })
            .collect::<FeatureResult<Vec<_>>>()?;
        table.clone().with_column(self.column.clone(), Column::Int(codes))
    }
}

/// One-hot encode `one_hot` and label-encode `label` (skipped when absent
/// from the table), fitting on the table itself.
pub fn encode_categorical(
    table: &Table,
    one_hot: &[String],
    label: Option<&str>,
    reporter: &mut dyn Reporter,
) -> FeatureResult<Table> {
    let encoder = OneHotEncoder::fit(table, one_hot)?;
    for (column, cats) in &encoder.categories {
        reporter.report(PipelineEvent::CategoriesFitted {
            column:     column.clone(),
            categories: cats.len(),
        });
    }
    let mut out = encoder.transform(table)?;

    if let Some(label) = label {
        if out.has_column(label) {
            let encoder = LabelEncoder::fit(&out, label)?;
            reporter.report(PipelineEvent::CategoriesFitted {
                column:     label.to_string(),
                categories: encoder.classes().len(),
            });
            out = encoder.transform(&out)?;
        } else {
            log::debug!("Label column '{label}' absent; skipping label encoding");
        }
    }
    Ok(out)
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct EncodeStage {
    one_hot: Vec<String>,
    label:   Option<String>,
}

impl EncodeStage {
    pub fn new(one_hot: Vec<String>, label: Option<String>) -> Self {
        Self { one_hot, label }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.encoding.one_hot_columns(&config.columns),
            config.encoding.label_column(&config.columns),
        )
    }
}

impl FeatureStage for EncodeStage {
    fn name(&self) -> &'static str {
        "encode"
    }

    fn policy(&self) -> StagePolicy {
        StagePolicy::FailFast
    }

    fn apply(&self, table: &Table, reporter: &mut dyn Reporter) -> FeatureResult<Table> {
        encode_categorical(table, &self.one_hot, self.label.as_deref(), reporter)
    }
}
