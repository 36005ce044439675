//! Pipeline events and the reporting interface.
//!
//! RULE: stages report through the `Reporter` they are handed.
//! They never construct a reporter and never configure logging.
//! The binary configures the `log` backend once at startup.

use crate::error::FeatureResult;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Everything worth recording about a pipeline run.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    // ── Runner events ──────────────────────────────
    RunStarted {
        pipeline: String,
        rows:     usize,
        columns:  usize,
    },
    StageCompleted {
        stage:   String,
        rows:    usize,
        columns: usize,
    },
    StageSkipped {
        stage: String,
        error: String,
    },
    StageFailed {
        stage: String,
        error: String,
    },
    RunCompleted {
        pipeline: String,
        rows:     usize,
        columns:  usize,
    },

    // ── Feature events ─────────────────────────────
    TimestampsCoerced {
        column:  String,
        coerced: usize,
    },
    CategoriesFitted {
        column:     String,
        categories: usize,
    },
    ColumnImputed {
        column:   String,
        strategy: String,
        filled:   usize,
    },
    ColumnDropped {
        column: String,
        reason: String,
    },
    ThresholdsResolved {
        recency:   f64,
        frequency: f64,
        monetary:  f64,
    },
    LabelsAssigned {
        good: usize,
        bad:  usize,
    },
    WoeComputed {
        feature:           String,
        bins:              usize,
        information_value: f64,
    },
}

impl PipelineEvent {
    /// Stable snake_case name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::RunStarted { .. }         => "run_started",
            PipelineEvent::StageCompleted { .. }     => "stage_completed",
            PipelineEvent::StageSkipped { .. }       => "stage_skipped",
            PipelineEvent::StageFailed { .. }        => "stage_failed",
            PipelineEvent::RunCompleted { .. }       => "run_completed",
            PipelineEvent::TimestampsCoerced { .. }  => "timestamps_coerced",
            PipelineEvent::CategoriesFitted { .. }   => "categories_fitted",
            PipelineEvent::ColumnImputed { .. }      => "column_imputed",
            PipelineEvent::ColumnDropped { .. }      => "column_dropped",
            PipelineEvent::ThresholdsResolved { .. } => "thresholds_resolved",
            PipelineEvent::LabelsAssigned { .. }     => "labels_assigned",
            PipelineEvent::WoeComputed { .. }        => "woe_computed",
        }
    }

    fn is_problem(&self) -> bool {
        matches!(
            self,
            PipelineEvent::StageSkipped { .. }
                | PipelineEvent::StageFailed { .. }
                | PipelineEvent::TimestampsCoerced { .. }
                | PipelineEvent::ColumnDropped { .. }
        )
    }
}

/// The injected reporting interface.
pub trait Reporter {
    fn report(&mut self, event: PipelineEvent);
}

/// Reporter that mirrors events to `log` and keeps them in memory.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<PipelineEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PipelineEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist one JSON object per line.
    pub fn write_jsonl(&self, path: impl AsRef<Path>) -> FeatureResult<()> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        for event in &self.entries {
            serde_json::to_writer(&mut out, event)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Reporter for EventLog {
    fn report(&mut self, event: PipelineEvent) {
        match &event {
            PipelineEvent::StageFailed { stage, error } => {
                log::error!("stage '{stage}' failed: {error}");
            }
            e if e.is_problem() => log::warn!("{e:?}"),
            e => log::info!("{}: {e:?}", e.kind()),
        }
        self.entries.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};

    #[test]
    fn jsonl_round_trip_is_tagged() {
        let mut log = EventLog::new();
        log.report(PipelineEvent::LabelsAssigned { good: 2, bad: 1 });
        log.report(PipelineEvent::StageSkipped { stage: "time".into(), error: "x".into() });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        log.write_jsonl(&path).unwrap();

        let lines: Vec<String> = BufReader::new(File::open(&path).unwrap())
            .lines()
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"type\":\"labels_assigned\""));
        let back: PipelineEvent = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(back, log.entries()[1]);
    }
}
