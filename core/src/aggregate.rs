//! Per-customer transaction aggregates.
//!
//! Groups rows by customer, computes amount statistics and distinct
//! counts, and left-joins them back so every row carries its customer's
//! aggregates.

use crate::{
    config::ColumnConfig,
    error::{FeatureError, FeatureResult},
    event::Reporter,
    stage::{FeatureStage, StagePolicy},
    stats,
    table::{Aggregate, Column, Table},
};
use std::collections::HashSet;

pub const TOTAL_AMOUNT: &str = "total_amount";
pub const AVG_AMOUNT: &str = "avg_amount";
pub const STD_AMOUNT: &str = "std_amount";
pub const AMOUNT_COUNT: &str = "amount_count";
pub const UNIQUE_TRANSACTIONS: &str = "unique_transactions";
pub const UNIQUE_PRODUCTS: &str = "unique_products";

/// Add per-customer sum, mean, sample std, count and distinct
/// transaction/product counts to every row.
pub fn create_aggregate_features(table: &Table, cols: &ColumnConfig) -> FeatureResult<Table> {
    table.require(&[
        cols.customer_id.as_str(),
        cols.amount.as_str(),
        cols.transaction_id.as_str(),
        cols.product_category.as_str(),
    ])?;
    let amount = table.column(&cols.amount)?;
    let amounts = amount.to_f64().ok_or_else(|| {
        FeatureError::invalid(format!("column '{}' must be numeric", cols.amount))
    })?;
    let transactions = table.column(&cols.transaction_id)?;
    let products = table.column(&cols.product_category)?;

    let groups = table.group_rows(&cols.customer_id)?;
    let groups: Vec<_> = groups.into_iter().filter(|g| g.key.is_some()).collect();

    let mut keys = Vec::with_capacity(groups.len());
    let mut total = Vec::with_capacity(groups.len());
    let mut avg = Vec::with_capacity(groups.len());
    let mut std = Vec::with_capacity(groups.len());
    let mut count = Vec::with_capacity(groups.len());
    let mut unique_txn = Vec::with_capacity(groups.len());
    let mut unique_prod = Vec::with_capacity(groups.len());

    for group in groups {
        let values: Vec<f64> = group.rows.iter().filter_map(|&r| amounts[r]).collect();
        total.push(Some(stats::sum(&values)));
        avg.push(stats::mean(&values));
        std.push(stats::std_dev(&values, 1));
        count.push(Some(values.len() as i64));

        let distinct_txn: HashSet<_> = group.rows.iter().filter_map(|&r| transactions.key_at(r)).collect();
        let distinct_prod: HashSet<_> = group.rows.iter().filter_map(|&r| products.key_at(r)).collect();
        unique_txn.push(Some(distinct_txn.len() as i64));
        unique_prod.push(Some(distinct_prod.len() as i64));

        keys.extend(group.key);
    }

    log::info!("Aggregated {} customers over {} rows", keys.len(), table.height());

    let aggregate = Aggregate::new(keys)?
        .with_column(TOTAL_AMOUNT, Column::Float(total))?
        .with_column(AVG_AMOUNT, Column::Float(avg))?
        .with_column(STD_AMOUNT, Column::Float(std))?
        .with_column(AMOUNT_COUNT, Column::Int(count))?
        .with_column(UNIQUE_TRANSACTIONS, Column::Int(unique_txn))?
        .with_column(UNIQUE_PRODUCTS, Column::Int(unique_prod))?;

    table.left_join_aggregate(&cols.customer_id, &aggregate)
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct AggregateStage {
    columns: ColumnConfig,
    policy:  StagePolicy,
}

impl AggregateStage {
    pub fn new(columns: ColumnConfig, policy: StagePolicy) -> Self {
        Self { columns, policy }
    }
}

impl FeatureStage for AggregateStage {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn policy(&self) -> StagePolicy {
        self.policy
    }

    fn apply(&self, table: &Table, _reporter: &mut dyn Reporter) -> FeatureResult<Table> {
        create_aggregate_features(table, &self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            ("CustomerId", Column::ints([1, 1, 2])),
            ("Amount", Column::ints([100, -50, 200])),
            ("TransactionId", Column::text(["T1", "T2", "T3"])),
            ("ProductCategory", Column::text(["cat1", "cat1", "cat2"])),
        ])
        .unwrap()
    }

    #[test]
    fn single_row_customer_has_no_std() {
        let out = create_aggregate_features(&sample(), &ColumnConfig::default()).unwrap();
        let std = out.column(STD_AMOUNT).unwrap();
        assert!(std.f64_at(0).is_some());
        assert!(std.is_null(2));
        assert_eq!(out.column(UNIQUE_PRODUCTS).unwrap(), &Column::ints([1, 1, 1]));
        assert_eq!(out.column(UNIQUE_TRANSACTIONS).unwrap(), &Column::ints([2, 2, 1]));
    }

    #[test]
    fn text_amount_rejected() {
        let table = sample()
            .with_column("Amount", Column::text(["a", "b", "c"]))
            .unwrap();
        assert!(matches!(
            create_aggregate_features(&table, &ColumnConfig::default()),
            Err(FeatureError::InvalidValue(_))
        ));
    }
}
