//! Shared primitive types used across the feature pipeline.

/// A column name inside a [`crate::table::Table`].
pub type ColumnName = String;

/// The canonical rendering of a grouping key (customer id, bin value, category).
pub type GroupKey = String;

/// Binary outcome label. 0 = Good, 1 = Bad.
pub type RiskLabel = i64;

/// Label value for a good outcome.
pub const GOOD: RiskLabel = 0;

/// Label value for a bad outcome.
pub const BAD: RiskLabel = 1;
