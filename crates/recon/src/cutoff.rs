use chrono::NaiveDateTime;

use crate::error::ReconError;
use crate::model::{FilterCriteria, Row, TemporalCutoff};
use crate::scan::{RelationScanner, ScanRequest};

/// Compute the temporal cutoff from an optional reference relation.
///
/// `None` reference → `Ok(None)` (no temporal filtering at all). Otherwise a
/// single pass takes the max of each timestamp column, ignoring nulls; an
/// empty or all-null reference yields a cutoff with both halves `None`.
pub fn resolve_cutoff(
    scanner: &dyn RelationScanner,
    reference: Option<&str>,
    criteria: &FilterCriteria,
) -> Result<Option<TemporalCutoff>, ReconError> {
    let Some(relation) = reference else {
        return Ok(None);
    };

    let columns = [criteria.created_column.clone(), criteria.updated_column.clone()];
    let rows = scanner.scan(&ScanRequest {
        relation,
        columns: &columns,
    })?;

    let mut cutoff = TemporalCutoff::default();
    let mut scanned = 0u64;
    for row in rows {
        let row = row?;
        scanned += 1;
        let created = timestamp_cell(relation, &row, &columns, 0)?;
        let updated = timestamp_cell(relation, &row, &columns, 1)?;
        cutoff.max_created_at = cutoff.max_created_at.max(created);
        cutoff.max_updated_at = cutoff.max_updated_at.max(updated);
    }

    log::debug!(
        "reference '{relation}': {scanned} rows, max {}={:?}, max {}={:?}",
        columns[0],
        cutoff.max_created_at,
        columns[1],
        cutoff.max_updated_at,
    );
    if cutoff.max_created_at.is_none() || cutoff.max_updated_at.is_none() {
        log::warn!(
            "reference '{relation}' has no non-null value on at least one timestamp column; \
             that dimension is unbounded"
        );
    }

    Ok(Some(cutoff))
}

fn timestamp_cell(
    relation: &str,
    row: &Row,
    columns: &[String],
    idx: usize,
) -> Result<Option<NaiveDateTime>, ReconError> {
    let value = row.get(idx).ok_or_else(|| {
        ReconError::schema(relation, format!("scanned row has no value for '{}'", columns[idx]))
    })?;
    value
        .to_timestamp()
        .map_err(|e| ReconError::schema(relation, format!("{}: {e}", columns[idx])))
}
