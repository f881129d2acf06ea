//! Diagnostic-row output.
//!
//! A passing run produces no rows. A failing run produces one row per missing
//! tuple with the summary statistics repeated on every row:
//! `[id] + mapped target columns + [total_source_records, total_missing_records, missing_percentage]`.

use std::io::Write;

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use crate::error::ReconError;
use crate::model::{ReconResult, Row};
use crate::value::Value;

pub const STAT_COLUMNS: [&str; 3] = [
    "total_source_records",
    "total_missing_records",
    "missing_percentage",
];

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub passed: bool,
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub values: Row,
    pub total_source_records: u64,
    pub total_missing_records: u64,
    pub missing_percentage: f64,
}

impl ReportRow {
    /// The row as emitted: mapped values followed by the three statistics.
    pub fn flatten(&self) -> Row {
        let mut out = self.values.clone();
        out.push(Value::Int(self.total_source_records as i64));
        out.push(Value::Int(self.total_missing_records as i64));
        out.push(Value::float(self.missing_percentage));
        out
    }
}

impl Serialize for ReportRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.values.len() + STAT_COLUMNS.len()))?;
        for v in &self.values {
            seq.serialize_element(v)?;
        }
        seq.serialize_element(&self.total_source_records)?;
        seq.serialize_element(&self.total_missing_records)?;
        seq.serialize_element(&self.missing_percentage)?;
        seq.end()
    }
}

/// Assemble the diagnostic rows for a result.
pub fn build_report(result: &ReconResult) -> ReconReport {
    let mut columns = result.columns.clone();
    columns.extend(STAT_COLUMNS.iter().map(|c| c.to_string()));

    let rows = if result.passed {
        Vec::new()
    } else {
        result
            .missing_rows
            .iter()
            .map(|values| ReportRow {
                values: values.clone(),
                total_source_records: result.total_source_records,
                total_missing_records: result.total_missing_records,
                missing_percentage: result.missing_percentage,
            })
            .collect()
    };

    ReconReport {
        passed: result.passed,
        columns,
        rows,
    }
}

impl ReconReport {
    pub fn is_clean(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name, in column order.
    pub fn to_json_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.flatten().into_iter().map(|v| {
                        serde_json::to_value(&v).unwrap_or(serde_json::Value::Null)
                    }))
                    .collect()
            })
            .collect()
    }

    /// Write header + rows as CSV. Nulls become empty cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReconError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.flatten().iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReconMeta;

    fn result(passed: bool) -> ReconResult {
        ReconResult {
            meta: ReconMeta {
                config_name: "t".into(),
                source_table: "s".into(),
                target_table: "t".into(),
                reference_table: None,
                cutoff: None,
                tolerance_percentage: 1.0,
                engine_version: "0".into(),
                run_at: "now".into(),
            },
            columns: vec!["ID".into(), "NAME".into()],
            missing_rows: vec![
                vec![Value::Int(1), Value::text("a")],
                vec![Value::Int(2), Value::Null],
            ],
            total_source_records: 4,
            total_missing_records: 2,
            missing_percentage: 50.0,
            passed,
        }
    }

    #[test]
    fn passed_report_is_empty() {
        let report = build_report(&result(true));
        assert!(report.is_clean());
        assert_eq!(report.columns.len(), 5);
    }

    #[test]
    fn failed_report_denormalizes_stats() {
        let report = build_report(&result(false));
        assert_eq!(
            report.columns,
            vec![
                "ID",
                "NAME",
                "total_source_records",
                "total_missing_records",
                "missing_percentage"
            ]
        );
        assert_eq!(report.rows.len(), 2);
        for row in &report.rows {
            assert_eq!(row.total_source_records, 4);
            assert_eq!(row.total_missing_records, 2);
            assert_eq!(row.missing_percentage, 50.0);
        }
        assert_eq!(
            report.rows[0].flatten(),
            vec![
                Value::Int(1),
                Value::text("a"),
                Value::Int(4),
                Value::Int(2),
                Value::float(50.0)
            ]
        );
    }

    #[test]
    fn json_rows_are_flat_arrays() {
        let report = build_report(&result(false));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rows"][1], serde_json::json!([2, null, 4, 2, 50.0]));
    }

    #[test]
    fn json_records_keep_column_order() {
        let report = build_report(&result(false));
        let records = report.to_json_records();
        let keys: Vec<_> = records[0].keys().cloned().collect();
        assert_eq!(keys, report.columns);
        assert_eq!(records[0]["NAME"], serde_json::json!("a"));
    }

    #[test]
    fn csv_output() {
        let report = build_report(&result(false));
        let mut buf = Vec::new();
        report.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "ID,NAME,total_source_records,total_missing_records,missing_percentage\n\
             1,a,4,2,50\n\
             2,,4,2,50\n"
        );
    }
}
