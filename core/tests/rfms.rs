use credit_risk_core::{
    config::{PipelineConfig, RfmsConfig},
    error::FeatureError,
    event::EventLog,
    rfms::{self, FREQUENCY, MONETARY, RECENCY, RFMS_LABEL, USER_LABEL},
    store,
    table::{Column, Table},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn transactions() -> Table {
    Table::from_columns(vec![
        ("CustomerId", Column::text(["C1", "C1", "C2", "C3"])),
        ("TransactionId", Column::text(["T1", "T2", "T3", "T4"])),
        ("Amount", Column::floats([100.0, -50.0, 200.0, 10.0])),
        (
            "TransactionStartTime",
            Column::text([
                "2023-01-01 10:00:00",
                "2023-01-05 12:00:00",
                "2023-01-10 08:00:00",
                "2023-01-02 09:00:00",
            ]),
        ),
    ])
    .unwrap()
}

fn labeled(config: &PipelineConfig) -> Table {
    rfms::calculate_rfms(&transactions(), config, &mut EventLog::new()).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Recency counts whole days back from the latest transaction in the table.
#[test]
fn recency_is_days_since_latest_transaction() {
    let out = labeled(&PipelineConfig::default_test());
    assert_eq!(out.column(RECENCY).unwrap(), &Column::ints([8, 4, 0, 7]));
}

/// Frequency and Monetary are per customer, repeated on every row of that customer.
/// Refunds reduce Monetary: 100 + (−50) = 50.
#[test]
fn frequency_and_monetary_are_per_customer() {
    let out = labeled(&PipelineConfig::default_test());
    assert_eq!(out.column(FREQUENCY).unwrap(), &Column::ints([2, 2, 1, 1]));
    assert_eq!(
        out.column(MONETARY).unwrap(),
        &Column::floats([50.0, 50.0, 200.0, 10.0])
    );
}

/// Median thresholds: recency 5.5, frequency 1.5, monetary 50.
/// Only row 2 is recent, frequent and valuable enough (50 ≥ 50 ties Good).
#[test]
fn median_thresholds_label_rows() {
    let mut log = EventLog::new();
    let out = rfms::calculate_rfms(&transactions(), &PipelineConfig::default_test(), &mut log).unwrap();

    assert_eq!(out.column(RFMS_LABEL).unwrap(), &Column::ints([1, 0, 1, 1]));
    assert_eq!(
        out.column(USER_LABEL).unwrap(),
        &Column::text(["Bad", "Good", "Bad", "Bad"])
    );

    let kinds: Vec<_> = log.entries().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["thresholds_resolved", "labels_assigned"]);
}

/// Explicit thresholds replace the medians they are given for.
#[test]
fn explicit_thresholds_override_medians() {
    let mut config = PipelineConfig::default_test();
    config.rfms = RfmsConfig {
        recency_threshold:   Some(10.0),
        frequency_threshold: Some(1.0),
        monetary_threshold:  Some(0.0),
    };
    let out = labeled(&config);
    assert_eq!(out.column(RFMS_LABEL).unwrap(), &Column::ints([0, 0, 0, 0]));
}

/// A single-transaction customer has Frequency 1 and Monetary equal to its amount.
#[test]
fn single_transaction_customer() {
    let out = labeled(&PipelineConfig::default_test());
    assert_eq!(out.column(FREQUENCY).unwrap().f64_at(2), Some(1.0));
    assert_eq!(out.column(MONETARY).unwrap().f64_at(2), Some(200.0));
}

/// Labeling the same table twice gives the same labels.
#[test]
fn labeling_is_deterministic() {
    let config = PipelineConfig::default_test();
    assert_eq!(labeled(&config), labeled(&config));
}

/// One bad timestamp fails the whole computation with its row and raw value.
#[test]
fn unparseable_timestamp_fails() {
    let table = transactions()
        .with_column(
            "TransactionStartTime",
            Column::text(["2023-01-01 10:00:00", "yesterday", "2023-01-10", "2023-01-02"]),
        )
        .unwrap();
    let err = rfms::calculate_rfms(&table, &PipelineConfig::default_test(), &mut EventLog::new())
        .unwrap_err();
    match err {
        FeatureError::TimestampParse { row, value, .. } => {
            assert_eq!(row, 1);
            assert_eq!(value, "yesterday");
        }
        other => panic!("expected timestamp error, got {other:?}"),
    }
}

/// A missing required column is a schema error naming it.
#[test]
fn missing_amount_column_is_schema_error() {
    let mut table = transactions();
    table.drop_column("Amount").unwrap();
    let err = rfms::calculate_rfms(&table, &PipelineConfig::default_test(), &mut EventLog::new())
        .unwrap_err();
    assert!(matches!(err, FeatureError::Schema { column } if column == "Amount"));
}

/// A `NaN` amount read from CSV is missing: it adds nothing to Monetary and
/// the medians stay finite. Monetary is [100, 100, 200, 10], median 100.
#[test]
fn nan_amount_is_skipped_in_monetary() {
    let csv = "CustomerId,TransactionId,Amount,TransactionStartTime\n\
               C1,T1,100,2023-01-01 10:00:00\n\
               C1,T2,NaN,2023-01-05 12:00:00\n\
               C2,T3,200,2023-01-10 08:00:00\n\
               C3,T4,10,2023-01-02 09:00:00\n";
    let table = store::read_csv_from(csv.as_bytes()).unwrap();
    let out = rfms::calculate_rfms(&table, &PipelineConfig::default_test(), &mut EventLog::new())
        .unwrap();

    let monetary = out.column(MONETARY).unwrap();
    let values: Vec<_> = (0..4).map(|r| monetary.f64_at(r)).collect();
    assert_eq!(values, vec![Some(100.0), Some(100.0), Some(200.0), Some(10.0)]);
    assert_eq!(out.column(RFMS_LABEL).unwrap(), &Column::ints([1, 0, 1, 1]));
}

/// An infinite amount cannot be labeled; it fails instead of turning every row Bad.
#[test]
fn infinite_amount_fails() {
    let table = transactions()
        .with_column("Amount", Column::floats([100.0, f64::INFINITY, 200.0, 10.0]))
        .unwrap();
    match rfms::calculate_rfms(&table, &PipelineConfig::default_test(), &mut EventLog::new()) {
        Err(FeatureError::InvalidValue(msg)) => assert!(msg.contains("non-finite")),
        other => panic!("expected invalid value, got {other:?}"),
    }
}
