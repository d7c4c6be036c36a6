use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::info;

use crate::error::{Result, ToolError};
use crate::types::{amount::Amount, common::Dataset};

/// Finds every transaction id that carries `target` in `amount_col` and
/// returns all rows belonging to those transactions, in input order.
pub fn lookup(
    dataset: &Dataset,
    amount_col: &str,
    tx_col: &str,
    target: Decimal,
) -> Result<Dataset> {
    let tx_idx = dataset.column_index(tx_col)?;
    let amounts = dataset.amounts(amount_col)?;
    let target = Amount(target);

    let tx_ids: HashSet<&str> = dataset
        .rows
        .iter()
        .zip(&amounts)
        .filter(|(_, amount)| **amount == target)
        .filter_map(|(row, _)| row.get(tx_idx))
        .filter(|tx| !tx.is_empty())
        .collect();

    if tx_ids.is_empty() {
        return Err(ToolError::NoMatches(format!(
            "no rows with {amount_col} = {}",
            target.0
        )));
    }
    info!(transactions = tx_ids.len(), amount = %target.0, "found matching transactions");

    let rows = dataset
        .rows
        .iter()
        .filter(|row| row.get(tx_idx).is_some_and(|tx| tx_ids.contains(tx)))
        .cloned()
        .collect();

    Ok(dataset.with_rows(rows))
}
