use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Column '{column}' not found in table")]
    Schema { column: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Cannot parse timestamp '{value}' in column '{column}' at row {row}")]
    TimestampParse {
        column: String,
        row:    usize,
        value:  String,
    },

    #[error("Label mapping error: {0}")]
    Mapping(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FeatureError {
    pub fn schema(column: impl Into<String>) -> Self {
        FeatureError::Schema { column: column.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        FeatureError::InvalidValue(message.into())
    }
}

pub type FeatureResult<T> = Result<T, FeatureError>;
