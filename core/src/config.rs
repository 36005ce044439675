use crate::scale::ScaleMethod;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Column names ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub customer_id:      String,
    pub transaction_id:   String,
    pub amount:           String,
    pub timestamp:        String,
    pub product_category: String,
    pub channel_id:       String,
    pub provider_id:      String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            customer_id:      "CustomerId".into(),
            transaction_id:   "TransactionId".into(),
            amount:           "Amount".into(),
            timestamp:        "TransactionStartTime".into(),
            product_category: "ProductCategory".into(),
            channel_id:       "ChannelId".into(),
            provider_id:      "ProviderId".into(),
        }
    }
}

// ── RFMS / WoE ───────────────────────────────────────────────────────────────

/// Explicit labeling thresholds. `None` means "median of the column".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfmsConfig {
    pub recency_threshold:   Option<f64>,
    pub frequency_threshold: Option<f64>,
    pub monetary_threshold:  Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WoeConfig {
    pub epsilon: f64,
}

impl Default for WoeConfig {
    fn default() -> Self {
        Self { epsilon: crate::woe::DEFAULT_EPSILON }
    }
}

// ── Preprocessing ────────────────────────────────────────────────────────────

/// Categorical encoding. Unset column lists fall back to the names in
/// [`ColumnConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Replaced by `{column}_{category}` indicator columns.
    /// Default: product category and channel.
    pub one_hot:      Option<Vec<String>>,
    /// Replaced by a dense integer code. Default: provider.
    pub label:        Option<String>,
    pub label_encode: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self { one_hot: None, label: None, label_encode: true }
    }
}

impl EncodingConfig {
    pub fn one_hot_columns(&self, columns: &ColumnConfig) -> Vec<String> {
        self.one_hot.clone().unwrap_or_else(|| {
            vec![columns.product_category.clone(), columns.channel_id.clone()]
        })
    }

    /// `None` when label encoding is switched off.
    pub fn label_column(&self, columns: &ColumnConfig) -> Option<String> {
        self.label_encode
            .then(|| self.label.clone().unwrap_or_else(|| columns.provider_id.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    pub method:  ScaleMethod,
    /// Explicit columns to scale. `None` scales every numeric column.
    pub columns: Option<Vec<String>>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Aggregate and time stages log-and-continue instead of failing.
    pub lenient_enrichment: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { lenient_enrichment: true }
    }
}

// ── Top level ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub columns:  ColumnConfig,
    pub rfms:     RfmsConfig,
    pub woe:      WoeConfig,
    pub encoding: EncodingConfig,
    pub scaling:  ScalingConfig,
    pub pipeline: PipelineOptions,
}

impl PipelineConfig {
    /// Load from a JSON file. Absent sections take their defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        if !(config.woe.epsilon.is_finite() && config.woe.epsilon > 0.0) {
            anyhow::bail!("woe.epsilon must be a positive number, got {}", config.woe.epsilon);
        }
        log::debug!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Config used by unit and integration tests: strict stages, standard scaling.
    pub fn default_test() -> Self {
        Self {
            pipeline: PipelineOptions { lenient_enrichment: false },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{ "rfms": {{ "recency_threshold": 0 }}, "scaling": {{ "method": "min_max" }} }}"#
        )
        .unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.rfms.recency_threshold, Some(0.0));
        assert_eq!(config.rfms.frequency_threshold, None);
        assert_eq!(config.scaling.method, ScaleMethod::MinMax);
        assert_eq!(config.columns.customer_id, "CustomerId");
        assert!(config.pipeline.lenient_enrichment);
    }

    #[test]
    fn bad_epsilon_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "woe": {{ "epsilon": 0.0 }} }}"#).unwrap();
        assert!(PipelineConfig::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_names_path() {
        let err = PipelineConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn shipped_config_matches_defaults_except_exclude() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/pipeline.json");
        let config = PipelineConfig::load(path).unwrap();
        assert_eq!(config.scaling.exclude, vec!["FraudResult".to_string()]);
        assert_eq!(
            PipelineConfig { scaling: ScalingConfig::default(), ..config },
            PipelineConfig::default()
        );
    }

    #[test]
    fn encoding_follows_renamed_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{ "columns": {{ "channel_id": "Channel", "provider_id": "Provider" }} }}"#
        )
        .unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(
            config.encoding.one_hot_columns(&config.columns),
            vec!["ProductCategory".to_string(), "Channel".to_string()]
        );
        assert_eq!(config.encoding.label_column(&config.columns), Some("Provider".into()));
    }

    #[test]
    fn explicit_encoding_overrides_columns() {
        let encoding = EncodingConfig {
            one_hot:      Some(vec!["Kind".into()]),
            label:        None,
            label_encode: false,
        };
        let columns = ColumnConfig::default();
        assert_eq!(encoding.one_hot_columns(&columns), vec!["Kind".to_string()]);
        assert_eq!(encoding.label_column(&columns), None);
    }
}
