use credit_risk_core::{
    aggregate::TOTAL_AMOUNT,
    config::PipelineConfig,
    error::FeatureError,
    event::{EventLog, PipelineEvent},
    pipeline::FeaturePipeline,
    rfms::USER_LABEL,
    stats, store,
    table::Table,
    time_features::TRANSACTION_HOUR,
};
use std::io::BufRead;

// ── Helpers ──────────────────────────────────────────────────────────────────

const XENTE_SAMPLE: &str = "\
TransactionId,CustomerId,ProviderId,ProductCategory,ChannelId,Amount,TransactionStartTime,FraudResult
TransactionId_1,CustomerId_1,ProviderId_6,airtime,ChannelId_3,1000,2018-11-15T02:18:49Z,0
TransactionId_2,CustomerId_1,ProviderId_4,financial_services,ChannelId_2,-20,2018-11-15T02:19:08Z,0
TransactionId_3,CustomerId_2,ProviderId_6,airtime,ChannelId_3,500,2018-11-15T02:44:21Z,0
TransactionId_4,CustomerId_3,ProviderId_1,utility_bill,ChannelId_3,20000,2018-11-15T03:32:55Z,0
TransactionId_5,CustomerId_3,ProviderId_4,financial_services,ChannelId_2,,2018-11-16T08:20:00Z,1
TransactionId_6,CustomerId_2,ProviderId_6,airtime,ChannelId_3,600,not-a-time,0
";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample() -> Table {
    store::read_csv_from(XENTE_SAMPLE.as_bytes()).expect("sample parses")
}

fn kinds(log: &EventLog) -> Vec<&'static str> {
    log.entries().iter().map(|e| e.kind()).collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The full pipeline runs every stage in order and brackets them with run events.
#[test]
fn full_pipeline_reports_every_stage() {
    init_logging();
    let mut log = EventLog::new();
    let pipeline = FeaturePipeline::build(&PipelineConfig::default_test());

    pipeline.run(&sample(), &mut log).expect("pipeline runs");

    let stages: Vec<String> = log
        .entries()
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StageCompleted { stage, .. } => Some(stage.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(stages, vec!["aggregate", "time_features", "encode", "impute", "scale"]);
    assert_eq!(kinds(&log).first(), Some(&"run_started"));
    assert_eq!(kinds(&log).last(), Some(&"run_completed"));
}

/// After the pipeline: no missing numeric cells, encoded columns present,
/// aggregates standardized to mean ≈ 0.
#[test]
fn full_pipeline_output_shape() {
    init_logging();
    let mut log = EventLog::new();
    let out = FeaturePipeline::build(&PipelineConfig::default_test())
        .run(&sample(), &mut log)
        .expect("pipeline runs");

    assert_eq!(out.height(), 6);
    assert!(!out.has_column("ProductCategory"));
    assert!(out.has_column("ProductCategory_airtime"));
    assert!(out.has_column("ChannelId_ChannelId_3"));
    assert!(out.has_column(TRANSACTION_HOUR));

    for (name, column) in out.columns() {
        if column.is_numeric() {
            assert_eq!(column.null_count(), 0, "column {name} still has gaps");
        }
    }
    let totals = stats::present(&out.column(TOTAL_AMOUNT).unwrap().to_f64().unwrap());
    assert!(stats::mean(&totals).unwrap().abs() < 1e-6);

    assert!(kinds(&log).contains(&"timestamps_coerced"));
    assert!(kinds(&log).contains(&"column_imputed"));
}

/// Renamed channel and provider columns reach the encoders without an
/// explicit encoding section.
#[test]
fn renamed_columns_are_encoded() {
    init_logging();
    let renamed = XENTE_SAMPLE.replacen("ChannelId,", "Channel,", 1).replacen("ProviderId,", "Provider,", 1);
    let table = store::read_csv_from(renamed.as_bytes()).unwrap();
    let mut config = PipelineConfig::default_test();
    config.columns.channel_id = "Channel".into();
    config.columns.provider_id = "Provider".into();

    let out = FeaturePipeline::build(&config)
        .run(&table, &mut EventLog::new())
        .expect("pipeline runs");

    assert!(!out.has_column("Channel"));
    assert!(out.has_column("Channel_ChannelId_3"));
    assert!(out.column("Provider").unwrap().is_numeric());
}

/// With lenient enrichment, a failing aggregate stage is skipped and the run continues.
#[test]
fn lenient_enrichment_skips_failed_aggregate() {
    init_logging();
    let mut table = sample();
    table.drop_column("TransactionId").unwrap();

    let mut log = EventLog::new();
    let out = FeaturePipeline::build(&PipelineConfig::default())
        .run(&table, &mut log)
        .expect("lenient run completes");

    assert!(!out.has_column(TOTAL_AMOUNT));
    assert!(log
        .entries()
        .iter()
        .any(|e| matches!(e, PipelineEvent::StageSkipped { stage, .. } if stage == "aggregate")));
    assert_eq!(kinds(&log).last(), Some(&"run_completed"));
}

/// The strict configuration turns the same failure into an error.
#[test]
fn strict_enrichment_fails_fast() {
    init_logging();
    let mut table = sample();
    table.drop_column("TransactionId").unwrap();

    let mut log = EventLog::new();
    let err = FeaturePipeline::build(&PipelineConfig::default_test())
        .run(&table, &mut log)
        .unwrap_err();

    assert!(matches!(err, FeatureError::Schema { column } if column == "TransactionId"));
    assert_eq!(kinds(&log), vec!["run_started", "stage_failed"]);
}

/// The RFMS pipeline never skips: one bad timestamp stops it.
#[test]
fn rfms_pipeline_fails_on_bad_timestamp() {
    init_logging();
    let mut log = EventLog::new();
    let err = FeaturePipeline::rfms(&PipelineConfig::default_test())
        .run(&sample(), &mut log)
        .unwrap_err();

    assert!(matches!(err, FeatureError::TimestampParse { row: 5, .. }));
    assert_eq!(kinds(&log).last(), Some(&"stage_failed"));
}

/// RFMS over clean input, persisted through CSV and the JSONL event log.
#[test]
fn rfms_pipeline_end_to_end() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.csv");
    let output = dir.path().join("labeled.csv");
    let events = dir.path().join("events.jsonl");

    let clean = XENTE_SAMPLE.replace("not-a-time", "2018-11-16T09:00:00Z");
    std::fs::write(&input, clean).unwrap();

    let mut log = EventLog::new();
    let table = store::read_csv(&input).unwrap();
    let out = FeaturePipeline::rfms(&PipelineConfig::default_test())
        .run(&table, &mut log)
        .expect("rfms runs");
    store::write_csv(&out, &output).unwrap();
    log.write_jsonl(&events).unwrap();

    let reread = store::read_csv(&output).unwrap();
    let labels = reread.column(USER_LABEL).unwrap();
    assert!((0..reread.height()).all(|r| matches!(labels.render(r).as_str(), "Good" | "Bad")));

    let lines = std::io::BufReader::new(std::fs::File::open(&events).unwrap())
        .lines()
        .count();
    assert_eq!(lines, log.len());
}
