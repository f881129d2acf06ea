//! Soft-delete and temporal filtering.
//!
//! A relation is scanned with its projection plus whatever filter columns the
//! projection does not already contain. [`RecordFilter`] evaluates the
//! predicate on the widened row and strips it back down to the projection.

use chrono::NaiveDateTime;

use crate::error::ReconError;
use crate::model::{FilterCriteria, Row, TemporalCutoff};
use crate::value::Value;

/// Columns to request from the scanner plus the filter that consumes them.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub columns: Vec<String>,
    pub filter: RecordFilter,
}

#[derive(Debug, Clone)]
pub struct RecordFilter {
    relation: String,
    /// Projection width; kept rows are truncated to this.
    width: usize,
    deleted: Option<(usize, String)>,
    temporal: Option<TemporalBound>,
}

#[derive(Debug, Clone)]
struct TemporalBound {
    created: (usize, String),
    updated: (usize, String),
    cutoff: TemporalCutoff,
}

impl RecordFilter {
    /// Plan a filtered scan of `relation` over `projection`.
    ///
    /// Temporal columns are only requested when a cutoff is present.
    pub fn plan(
        relation: &str,
        projection: &[String],
        criteria: &FilterCriteria,
        cutoff: Option<&TemporalCutoff>,
    ) -> ScanPlan {
        let mut columns = projection.to_vec();
        let mut locate = |name: &str| -> (usize, String) {
            let idx = match columns.iter().position(|c| c == name) {
                Some(i) => i,
                None => {
                    columns.push(name.to_string());
                    columns.len() - 1
                }
            };
            (idx, name.to_string())
        };

        let deleted = criteria.deleted_flag_column.as_deref().map(&mut locate);
        let temporal = cutoff.map(|c| TemporalBound {
            created: locate(&criteria.created_column),
            updated: locate(&criteria.updated_column),
            cutoff: *c,
        });

        ScanPlan {
            columns,
            filter: RecordFilter {
                relation: relation.to_string(),
                width: projection.len(),
                deleted,
                temporal,
            },
        }
    }

    /// Whether a widened row passes soft-delete and temporal bounding.
    pub fn keep(&self, row: &Row) -> Result<bool, ReconError> {
        if let Some((idx, ref name)) = self.deleted {
            match row.get(idx) {
                Some(Value::Bool(false)) => {}
                Some(Value::Bool(true)) | Some(Value::Null) => return Ok(false),
                None => return Err(self.short_row(name)),
                Some(other) => {
                    return Err(ReconError::schema(
                        &self.relation,
                        format!(
                            "deleted flag column '{name}' must be boolean, found {} '{other}'",
                            other.type_name()
                        ),
                    ))
                }
            }
        }

        if let Some(ref bound) = self.temporal {
            let created = self.timestamp_at(row, &bound.created)?;
            let updated = self.timestamp_at(row, &bound.updated)?;
            let (Some(created), Some(updated)) = (created, updated) else {
                return Ok(false);
            };
            if !below(created, bound.cutoff.max_created_at)
                || !below(updated, bound.cutoff.max_updated_at)
            {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Lazily filter a stream of widened rows, yielding projected rows.
    pub fn apply<I>(&self, rows: I) -> FilteredRows<'_, I>
    where
        I: Iterator<Item = Result<Row, ReconError>>,
    {
        FilteredRows { filter: self, rows }
    }

    fn timestamp_at(
        &self,
        row: &Row,
        (idx, name): &(usize, String),
    ) -> Result<Option<NaiveDateTime>, ReconError> {
        row.get(*idx)
            .ok_or_else(|| self.short_row(name))?
            .to_timestamp()
            .map_err(|e| ReconError::schema(&self.relation, format!("{name}: {e}")))
    }

    fn short_row(&self, column: &str) -> ReconError {
        ReconError::schema(
            &self.relation,
            format!("scanned row has no value for '{column}'"),
        )
    }
}

/// A missing bound places no limit on that dimension.
fn below(value: NaiveDateTime, bound: Option<NaiveDateTime>) -> bool {
    bound.map_or(true, |max| value < max)
}

pub struct FilteredRows<'a, I> {
    filter: &'a RecordFilter,
    rows: I,
}

impl<I> Iterator for FilteredRows<'_, I>
where
    I: Iterator<Item = Result<Row, ReconError>>,
{
    type Item = Result<Row, ReconError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut row = match self.rows.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            match self.filter.keep(&row) {
                Ok(true) => {
                    row.truncate(self.filter.width);
                    return Some(Ok(row));
                }
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
