use chrono::NaiveDateTime;
use serde::Serialize;

use crate::value::Value;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A tuple of values, positionally aligned with the projection it was scanned with.
pub type Row = Vec<Value>;

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Ordered column lists for both sides. Field `i` of a source row corresponds
/// to field `i` of a target row regardless of name. Index 0 is the id column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projections {
    pub source: Vec<String>,
    pub target: Vec<String>,
}

impl Projections {
    pub fn width(&self) -> usize {
        self.source.len()
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Per-relation soft-delete and timestamp columns.
///
/// `deleted_flag_column` is `None` for the reference relation, which is only
/// scanned for its timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub deleted_flag_column: Option<String>,
    pub created_column: String,
    pub updated_column: String,
}

/// Upper bound derived from the reference relation.
///
/// A `None` half means no value was seen on that dimension; it imposes no
/// bound rather than excluding every row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TemporalCutoff {
    pub max_created_at: Option<NaiveDateTime>,
    pub max_updated_at: Option<NaiveDateTime>,
}

// ---------------------------------------------------------------------------
// Diff + Tolerance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DiffOutcome {
    /// Distinct source rows with no equal target row, sorted.
    pub missing: Vec<Row>,
    pub total_source_records: u64,
    pub total_missing_records: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToleranceVerdict {
    pub missing_percentage: f64,
    pub tolerance_percentage: f64,
    pub passed: bool,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    /// `[id] + mapped target columns`, naming the fields of `missing_rows`.
    pub columns: Vec<String>,
    pub missing_rows: Vec<Row>,
    pub total_source_records: u64,
    pub total_missing_records: u64,
    pub missing_percentage: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub source_table: String,
    pub target_table: String,
    pub reference_table: Option<String>,
    pub cutoff: Option<TemporalCutoff>,
    pub tolerance_percentage: f64,
    pub engine_version: String,
    pub run_at: String,
}
