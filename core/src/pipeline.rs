//! The feature pipeline: an ordered list of stages run over one table.
//!
//! EXECUTION ORDER of `FeaturePipeline::build` (fixed, never reordered):
//!   1. aggregate      per-customer totals, means, deviations and counts
//!   2. time_features  hour / day / month / year / weekday
//!   3. encode         one-hot and label encoding
//!   4. impute         median / most-frequent fills
//!   5. scale          standardization over the numeric columns
//!
//! RULES:
//!   - Stages execute in registration order.
//!   - Each stage sees only the table produced by the stage before it.
//!   - No stage calls another stage directly.
//!   - Every stage outcome is reported to the Reporter.

use crate::{
    aggregate::AggregateStage,
    config::PipelineConfig,
    encoding::EncodeStage,
    error::FeatureResult,
    event::{PipelineEvent, Reporter},
    impute::ImputeStage,
    rfms::RfmsStage,
    scale::ScaleStage,
    stage::{FeatureStage, StagePolicy},
    table::Table,
    time_features::TimeFeatureStage,
};

pub struct FeaturePipeline {
    name:   String,
    stages: Vec<Box<dyn FeatureStage>>,
}

impl FeaturePipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), stages: Vec::new() }
    }

    /// Build the full preprocessing pipeline.
    /// Call this instead of new() + manual register() calls.
    pub fn build(config: &PipelineConfig) -> Self {
        let enrichment = if config.pipeline.lenient_enrichment {
            StagePolicy::BestEffort
        } else {
            StagePolicy::FailFast
        };

        let mut pipeline = FeaturePipeline::new("features");
        pipeline.register(Box::new(AggregateStage::new(config.columns.clone(), enrichment)));
        pipeline.register(Box::new(TimeFeatureStage::new(config.columns.timestamp.clone(), enrichment)));
        pipeline.register(Box::new(EncodeStage::from_config(config)));
        pipeline.register(Box::new(ImputeStage));
        pipeline.register(Box::new(ScaleStage::new(config.scaling.clone())));
        pipeline
    }

    /// Single-stage pipeline producing RFMS risk labels.
    pub fn rfms(config: &PipelineConfig) -> Self {
        let mut pipeline = FeaturePipeline::new("rfms");
        pipeline.register(Box::new(RfmsStage::new(config.clone())));
        pipeline
    }

    /// Append a stage. Call in the documented execution order.
    pub fn register(&mut self, stage: Box<dyn FeatureStage>) {
        self.stages.push(stage);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order over a copy of `table`.
    ///
    /// A failing `BestEffort` stage is reported as skipped and its input
    /// table flows on to the next stage. A failing `FailFast` stage stops
    /// the run and its error is returned.
    pub fn run(&self, table: &Table, reporter: &mut dyn Reporter) -> FeatureResult<Table> {
        reporter.report(PipelineEvent::RunStarted {
            pipeline: self.name.clone(),
            rows:     table.height(),
            columns:  table.width(),
        });

        let mut current = table.clone();
        for stage in &self.stages {
            match stage.apply(&current, reporter) {
                Ok(next) => {
                    reporter.report(PipelineEvent::StageCompleted {
                        stage:   stage.name().to_string(),
                        rows:    next.height(),
                        columns: next.width(),
                    });
                    current = next;
                }
                Err(e) if stage.policy() == StagePolicy::BestEffort => {
                    log::warn!("Stage '{}' skipped: {e}", stage.name());
                    reporter.report(PipelineEvent::StageSkipped {
                        stage: stage.name().to_string(),
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    reporter.report(PipelineEvent::StageFailed {
                        stage: stage.name().to_string(),
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }

        reporter.report(PipelineEvent::RunCompleted {
            pipeline: self.name.clone(),
            rows:     current.height(),
            columns:  current.width(),
        });
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::FeatureError, event::EventLog, table::Column};

    struct Failing(StagePolicy);

    impl FeatureStage for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn policy(&self) -> StagePolicy {
            self.0
        }

        fn apply(&self, _table: &Table, _reporter: &mut dyn Reporter) -> FeatureResult<Table> {
            Err(FeatureError::invalid("boom"))
        }
    }

    fn table() -> Table {
        Table::from_columns(vec![("x", Column::ints([1, 2]))]).unwrap()
    }

    #[test]
    fn build_registers_stages_in_order() {
        let p = FeaturePipeline::build(&PipelineConfig::default_test());
        assert_eq!(p.stage_names(), vec!["aggregate", "time_features", "encode", "impute", "scale"]);
    }

    #[test]
    fn best_effort_failure_keeps_input() {
        let mut p = FeaturePipeline::new("t");
        p.register(Box::new(Failing(StagePolicy::BestEffort)));
        let mut log = EventLog::new();
        let out = p.run(&table(), &mut log).unwrap();
        assert_eq!(out, table());
        let kinds: Vec<_> = log.entries().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["run_started", "stage_skipped", "run_completed"]);
    }

    #[test]
    fn fail_fast_failure_stops_run() {
        let mut p = FeaturePipeline::new("t");
        p.register(Box::new(Failing(StagePolicy::FailFast)));
        let mut log = EventLog::new();
        assert!(p.run(&table(), &mut log).is_err());
        assert_eq!(log.entries().last().map(|e| e.kind()), Some("stage_failed"));
    }
}
