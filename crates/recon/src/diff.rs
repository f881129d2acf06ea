use std::collections::{BTreeSet, HashSet};

use crate::error::ReconError;
use crate::model::{DiffOutcome, Row};

/// Hash every target tuple. One pass, O(|target|) space.
pub fn build_target_set<T>(target: T) -> Result<HashSet<Row>, ReconError>
where
    T: IntoIterator<Item = Result<Row, ReconError>>,
{
    target.into_iter().collect()
}

/// Stream source tuples and keep the ones with no exact match in `target`.
///
/// Relational EXCEPT: a source tuple equal to any target tuple is removed no
/// matter how often it occurs on either side, and a missing tuple is reported
/// once. `total_source_records` still counts every source row.
pub fn subtract<S>(source: S, target: &HashSet<Row>) -> Result<DiffOutcome, ReconError>
where
    S: IntoIterator<Item = Result<Row, ReconError>>,
{
    let mut total_source_records = 0u64;
    let mut missing = BTreeSet::new();

    for row in source {
        let row = row?;
        total_source_records += 1;
        if !target.contains(&row) {
            missing.insert(row);
        }
    }

    let missing: Vec<Row> = missing.into_iter().collect();
    Ok(DiffOutcome {
        total_source_records,
        total_missing_records: missing.len() as u64,
        missing,
    })
}

/// `source − target` under exact, type-sensitive tuple equality.
pub fn set_difference<S, T>(source: S, target: T) -> Result<DiffOutcome, ReconError>
where
    S: IntoIterator<Item = Result<Row, ReconError>>,
    T: IntoIterator<Item = Result<Row, ReconError>>,
{
    let target = build_target_set(target)?;
    subtract(source, &target)
}
