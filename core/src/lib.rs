//! credit-risk-core: feature engineering and risk labeling for
//! transaction-level credit scoring data.

pub mod aggregate;
pub mod binning;
pub mod config;
pub mod encoding;
pub mod error;
pub mod event;
pub mod impute;
pub mod pipeline;
pub mod plot;
pub mod rfms;
pub mod scale;
pub mod stage;
pub mod stats;
pub mod store;
pub mod table;
pub mod time_features;
pub mod timestamp;
pub mod types;
pub mod woe;
