use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::Result;
use crate::types::{
    amount::{Amount, Sign},
    common::{Dataset, Row},
};

/// Decides which rows are allowed to cancel each other on top of having
/// opposite amounts of equal magnitude.
pub trait MatchRule {
    type Key: Eq + Hash;

    fn key(&self, row: &Row) -> Self::Key;
}

/// Any two rows with opposite amounts of equal magnitude cancel.
pub struct MagnitudeOnly;

impl MatchRule for MagnitudeOnly {
    type Key = ();

    fn key(&self, _row: &Row) -> Self::Key {}
}

/// Rows cancel only when the listed columns hold identical values.
pub struct SameColumns {
    columns: Vec<usize>,
}

impl SameColumns {
    pub fn new(dataset: &Dataset, columns: &[String]) -> Result<Self> {
        let columns = columns
            .iter()
            .map(|column| dataset.column_index(column))
            .collect::<Result<Vec<_>>>()?;
        Ok(SameColumns { columns })
    }
}

impl MatchRule for SameColumns {
    type Key = Vec<String>;

    fn key(&self, row: &Row) -> Self::Key {
        self.columns
            .iter()
            .map(|&idx| row.get(idx).unwrap_or_default().to_string())
            .collect()
    }
}

/// Input positions of a cancelling pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub positive: usize,
    pub negative: usize,
}

#[derive(Debug)]
pub struct Deduped {
    pub dataset: Dataset,
    pub pairs: Vec<Pair>,
}

#[derive(Default)]
struct Pending {
    positives: VecDeque<usize>,
    negatives: VecDeque<usize>,
}

/// Pairs up entries whose amounts cancel, scanning in order. Each entry is
/// matched with the earliest still-unmatched entry of the opposite sign that
/// has the same key and magnitude. Zero amounts never pair.
pub fn find_pairs<K, I>(entries: I) -> Vec<Pair>
where
    K: Eq + Hash,
    I: IntoIterator<Item = (K, Amount)>,
{
    let mut pending: HashMap<(K, Decimal), Pending> = HashMap::new();
    let mut pairs = Vec::new();

    for (idx, (key, amount)) in entries.into_iter().enumerate() {
        let positive = match amount.sign() {
            Sign::Zero => continue,
            Sign::Positive => true,
            Sign::Negative => false,
        };

        let slot = pending.entry((key, amount.magnitude())).or_default();
        if positive {
            match slot.negatives.pop_front() {
                Some(negative) => pairs.push(Pair {
                    positive: idx,
                    negative,
                }),
                None => slot.positives.push_back(idx),
            }
        } else {
            match slot.positives.pop_front() {
                Some(positive) => pairs.push(Pair {
                    positive,
                    negative: idx,
                }),
                None => slot.negatives.push_back(idx),
            }
        }
    }

    pairs
}

/// Removes cancelling in-and-out rows, matching on amount magnitude alone.
pub fn dedup(dataset: &Dataset, amount_field: &str) -> Result<Deduped> {
    dedup_with(dataset, amount_field, &MagnitudeOnly)
}

pub fn dedup_with<R: MatchRule>(
    dataset: &Dataset,
    amount_field: &str,
    rule: &R,
) -> Result<Deduped> {
    let amounts = dataset.amounts(amount_field)?;

    let pairs = find_pairs(
        dataset
            .rows
            .iter()
            .zip(amounts)
            .map(|(row, amount)| (rule.key(row), amount)),
    );

    let removed: HashSet<usize> = pairs
        .iter()
        .flat_map(|pair| [pair.positive, pair.negative])
        .collect();

    for pair in &pairs {
        debug!(
            positive = pair.positive,
            negative = pair.negative,
            "cancelling pair"
        );
    }

    let rows = dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(idx, _)| !removed.contains(idx))
        .map(|(_, row)| row.clone())
        .collect();

    Ok(Deduped {
        dataset: dataset.with_rows(rows),
        pairs,
    })
}
