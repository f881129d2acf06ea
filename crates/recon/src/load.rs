//! Materialize CSV / JSON / NDJSON files into [`Table`]s.
//!
//! Values keep the type their format gives them. CSV has no types, so every
//! cell is text unless the table source declares a column type. Nothing is
//! inferred from the data.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{ColumnType, TableFormat, TableSource};
use crate::error::ReconError;
use crate::scan::Table;
use crate::value::{parse_timestamp, Value};

/// Load a table from disk, resolving `source.file` relative to `base_dir`.
pub fn load_table_file(
    relation: &str,
    source: &TableSource,
    base_dir: &Path,
) -> Result<Table, ReconError> {
    let path = base_dir.join(&source.file);
    let format = source
        .format
        .or_else(|| TableFormat::from_path(&source.file))
        .ok_or_else(|| {
            ReconError::Configuration(format!(
                "tables.{relation}: cannot infer format of '{}'; set format = \"csv\" | \"json\" | \"ndjson\"",
                source.file
            ))
        })?;

    let data = std::fs::read_to_string(&path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;

    let table = match format {
        TableFormat::Csv => load_csv_table(relation, &data, &source.columns)?,
        TableFormat::Json => load_json_table(relation, &data, &source.columns)?,
        TableFormat::Ndjson => load_ndjson_table(relation, &data, &source.columns)?,
    };
    log::debug!(
        "loaded '{relation}' from {} ({} rows, {} columns)",
        path.display(),
        table.len(),
        table.columns.len()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub fn load_csv_table(
    relation: &str,
    csv_data: &str,
    types: &BTreeMap<String, ColumnType>,
) -> Result<Table, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    for declared in types.keys() {
        if !headers.contains(declared) {
            return Err(ReconError::missing_column(relation, declared));
        }
    }
    let column_types: Vec<Option<ColumnType>> =
        headers.iter().map(|h| types.get(h).copied()).collect();

    let mut table = Table::new(headers.iter().cloned());
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let mut row = Vec::with_capacity(headers.len());
        for (i, ty) in column_types.iter().enumerate() {
            let cell = record.get(i).unwrap_or("");
            let value = match ty {
                None => Value::Text(cell.to_string()),
                Some(ty) => parse_typed(cell, *ty).map_err(|msg| {
                    ReconError::schema(
                        relation,
                        format!("row {}, column '{}': {msg}", line + 1, headers[i]),
                    )
                })?,
            };
            row.push(value);
        }
        table.push(row);
    }

    Ok(table)
}

/// Parse one CSV cell according to its declared type. Empty cells are `Null`.
fn parse_typed(cell: &str, ty: ColumnType) -> Result<Value, String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    let bad = || format!("cannot parse '{cell}' as {ty}");
    match ty {
        ColumnType::Text => Ok(Value::Text(cell.to_string())),
        ColumnType::Int => trimmed.parse::<i64>().map(Value::Int).map_err(|_| bad()),
        ColumnType::Float => trimmed.parse::<f64>().map(Value::float).map_err(|_| bad()),
        ColumnType::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "0" => Ok(Value::Bool(false)),
            _ => Err(bad()),
        },
        ColumnType::Timestamp => parse_timestamp(trimmed).map(Value::Timestamp).ok_or_else(bad),
    }
}

// ---------------------------------------------------------------------------
// JSON / NDJSON
// ---------------------------------------------------------------------------

/// A JSON array of flat objects.
pub fn load_json_table(
    relation: &str,
    json_data: &str,
    types: &BTreeMap<String, ColumnType>,
) -> Result<Table, ReconError> {
    let parsed: serde_json::Value = serde_json::from_str(json_data)
        .map_err(|e| ReconError::Io(format!("{relation}: invalid JSON: {e}")))?;
    let serde_json::Value::Array(items) = parsed else {
        return Err(ReconError::schema(relation, "expected a JSON array of objects"));
    };
    objects_to_table(relation, items, types)
}

/// One JSON object per line; blank lines are skipped.
pub fn load_ndjson_table(
    relation: &str,
    ndjson_data: &str,
    types: &BTreeMap<String, ColumnType>,
) -> Result<Table, ReconError> {
    let mut items = Vec::new();
    for (line, text) in ndjson_data.lines().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(text)
            .map_err(|e| ReconError::Io(format!("{relation}: line {}: invalid JSON: {e}", line + 1)))?;
        items.push(item);
    }
    objects_to_table(relation, items, types)
}

fn objects_to_table(
    relation: &str,
    items: Vec<serde_json::Value>,
    types: &BTreeMap<String, ColumnType>,
) -> Result<Table, ReconError> {
    let mut objects = Vec::with_capacity(items.len());
    let mut columns: Vec<String> = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        let serde_json::Value::Object(map) = item else {
            return Err(ReconError::schema(
                relation,
                format!("row {}: expected a JSON object", i + 1),
            ));
        };
        for key in map.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        objects.push(map);
    }

    let mut table = Table::new(columns.iter().cloned());
    for (i, mut map) in objects.into_iter().enumerate() {
        let mut row = Vec::with_capacity(columns.len());
        for column in &columns {
            let raw = map.remove(column).unwrap_or(serde_json::Value::Null);
            let value = json_to_value(raw, types.get(column).copied()).map_err(|msg| {
                ReconError::schema(relation, format!("row {}, column '{column}': {msg}", i + 1))
            })?;
            row.push(value);
        }
        table.push(row);
    }

    Ok(table)
}

fn json_to_value(raw: serde_json::Value, ty: Option<ColumnType>) -> Result<Value, String> {
    use serde_json::Value as J;

    let value = match raw {
        J::Null => Value::Null,
        J::Bool(b) => Value::Bool(b),
        J::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n
                .as_f64()
                .map(Value::float)
                .ok_or_else(|| format!("number {n} out of range"))?,
        },
        J::String(s) => Value::Text(s),
        J::Array(_) | J::Object(_) => return Err("nested values are not supported".into()),
    };

    match (ty, value) {
        (Some(ColumnType::Timestamp), Value::Text(s)) => parse_timestamp(&s)
            .map(Value::Timestamp)
            .ok_or_else(|| format!("cannot parse '{s}' as timestamp")),
        (_, value) => Ok(value),
    }
}
