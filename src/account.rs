use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::engine::find_pairs;
use crate::error::{Result, ToolError};
use crate::types::{
    amount::Amount,
    common::{Dataset, line_of},
};

/// Selects the rows of one account inside an inclusive posting-date range.
#[derive(Debug, Clone)]
pub struct AccountFilter {
    pub acct_col: String,
    pub acct_num: String,
    pub date_col: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug)]
pub struct AccountDedup {
    pub dataset: Dataset,
    /// Rows of the account inside the date range, before any removal.
    pub matched_rows: usize,
    pub dropped_tx: Vec<String>,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

impl AccountFilter {
    /// Rows for the account whose posting date lies in `[start, end]`. Only
    /// the account's own rows need a parseable date.
    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset> {
        if self.start > self.end {
            return Err(ToolError::InvalidArgument(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }

        let acct_idx = dataset.column_index(&self.acct_col)?;
        let date_idx = dataset.column_index(&self.date_col)?;
        let acct_num = self.acct_num.trim();

        let mut rows = Vec::new();
        for (row_idx, row) in dataset.rows.iter().enumerate() {
            if row.get(acct_idx).map(str::trim) != Some(acct_num) {
                continue;
            }

            let raw = row.get(date_idx).unwrap_or_default();
            let date = parse_date(raw).ok_or_else(|| ToolError::MalformedValue {
                column: self.date_col.clone(),
                line: line_of(row, row_idx),
                value: raw.to_string(),
            })?;

            if (self.start..=self.end).contains(&date) {
                rows.push(row.clone());
            }
        }

        Ok(dataset.with_rows(rows))
    }
}

/// Removes transactions of one account that cancel each other. Amounts are
/// summed per transaction id first; two transactions cancel when their sums
/// have equal magnitude and opposite sign, and then all of their rows go.
pub fn dedup_account(
    dataset: &Dataset,
    filter: &AccountFilter,
    tx_col: &str,
    amount_col: &str,
) -> Result<AccountDedup> {
    let tx_idx = dataset.column_index(tx_col)?;
    let selected = filter.apply(dataset)?;
    if selected.is_empty() {
        return Err(ToolError::NoMatches(
            "no rows matched the account / date criteria".to_string(),
        ));
    }
    let amount_idx = selected.column_index(amount_col)?;
    let amounts = selected.amounts(amount_col)?;

    let mut totals: Vec<(String, Decimal)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (row_idx, (row, amount)) in selected.rows.iter().zip(&amounts).enumerate() {
        let tx = row.get(tx_idx).unwrap_or_default().to_string();
        match positions.get(&tx) {
            Some(&pos) => {
                totals[pos].1 = totals[pos].1.checked_add(amount.0).ok_or_else(|| {
                    ToolError::MalformedValue {
                        column: amount_col.to_string(),
                        line: line_of(row, row_idx),
                        value: format!(
                            "{} (total of transaction {} overflows)",
                            row.get(amount_idx).unwrap_or_default(),
                            tx
                        ),
                    }
                })?;
            }
            None => {
                positions.insert(tx.clone(), totals.len());
                totals.push((tx, amount.0));
            }
        }
    }

    let pairs = find_pairs(totals.iter().map(|(_, total)| ((), Amount(*total))));
    let dropped_tx: Vec<String> = pairs
        .iter()
        .flat_map(|pair| [pair.positive, pair.negative])
        .map(|pos| totals[pos].0.clone())
        .collect();

    for pair in &pairs {
        debug!(
            positive = %totals[pair.positive].0,
            negative = %totals[pair.negative].0,
            "cancelling transactions"
        );
    }

    let dropped: HashSet<&str> = dropped_tx.iter().map(String::as_str).collect();
    let rows = selected
        .rows
        .iter()
        .filter(|row| !dropped.contains(row.get(tx_idx).unwrap_or_default()))
        .cloned()
        .collect();

    if dropped_tx.is_empty() {
        info!("no cancelling transactions found; rows are unchanged");
    } else {
        info!(transactions = dropped_tx.len(), "removing cancelling transactions");
    }

    Ok(AccountDedup {
        matched_rows: selected.len(),
        dataset: selected.with_rows(rows),
        dropped_tx,
    })
}
