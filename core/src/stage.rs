//! Stage trait.
//!
//! RULE: every pipeline step implements FeatureStage.
//! The pipeline calls apply() on each registered stage in registration
//! order. The order is fixed and documented in pipeline.rs.

use crate::{error::FeatureResult, event::Reporter, table::Table};

/// What the runner does when a stage returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePolicy {
    /// Report the failure and return the error to the caller.
    FailFast,
    /// Report the failure and continue with the stage's input table.
    BestEffort,
}

/// The contract every stage must fulfill.
pub trait FeatureStage {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    fn policy(&self) -> StagePolicy {
        StagePolicy::FailFast
    }

    /// Build the stage's output table from `table`.
    ///
    /// - `reporter`: receives feature-level events emitted by the stage.
    ///
    /// The input is never modified.
    fn apply(&self, table: &Table, reporter: &mut dyn Reporter) -> FeatureResult<Table>;
}
