use std::cell::Cell;
use std::path::PathBuf;

use rowaudit_recon::load::load_table_file;
use rowaudit_recon::scan::RowIter;
use rowaudit_recon::{
    build_report, run, ColumnPair, MemoryCatalog, ReconConfig, ReconError, ReconResult,
    RelationScanner, ScanRequest, Table, Value,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_catalog(config: &ReconConfig) -> MemoryCatalog {
    let dir = fixtures_dir();
    let mut catalog = MemoryCatalog::new();
    for (name, source) in &config.tables {
        let table = load_table_file(name, source, &dir)
            .unwrap_or_else(|e| panic!("cannot load {name}: {e}"));
        catalog.insert(name.clone(), table);
    }
    catalog
}

fn fixture_config() -> ReconConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("orders.recon.toml")).unwrap();
    ReconConfig::from_toml(&toml).unwrap()
}

fn load_and_run(config: &ReconConfig) -> ReconResult {
    let catalog = load_catalog(config);
    run(config, &catalog).unwrap()
}

fn missing_ids(result: &ReconResult) -> Vec<Value> {
    result.missing_rows.iter().map(|r| r[0].clone()).collect()
}

// -------------------------------------------------------------------------
// Fixture tests
// -------------------------------------------------------------------------

#[test]
fn fixture_with_reference_cutoff() {
    let result = load_and_run(&fixture_config());

    // dave is deleted, heidi has a null flag, frank was created after the cutoff.
    assert_eq!(result.total_source_records, 5);
    // carol is absent, erin's amount differs.
    assert_eq!(missing_ids(&result), vec![Value::Int(3), Value::Int(5)]);
    assert_eq!(result.total_missing_records, 2);
    assert_eq!(result.missing_percentage, 40.0);
    assert!(!result.passed);
    assert_eq!(result.columns, vec!["ORDER_ID", "CUSTOMER_NAME", "AMOUNT_CENTS"]);

    let cutoff = result.meta.cutoff.unwrap();
    assert_eq!(cutoff.max_created_at.unwrap().to_string(), "2026-01-06 00:00:00");
    assert_eq!(cutoff.max_updated_at.unwrap().to_string(), "2026-01-08 18:00:00");
}

#[test]
fn fixture_without_reference() {
    let mut config = fixture_config();
    config.reference_table = None;
    let result = load_and_run(&config);

    // frank is back in scope and absent from the target.
    assert_eq!(result.total_source_records, 6);
    assert_eq!(
        missing_ids(&result),
        vec![Value::Int(3), Value::Int(5), Value::Int(6)]
    );
    assert_eq!(result.missing_percentage, 50.0);
    assert!(result.meta.cutoff.is_none());
}

#[test]
fn fixture_report_rows() {
    let result = load_and_run(&fixture_config());
    let report = build_report(&result);

    assert_eq!(report.rows.len(), 2);
    assert_eq!(
        report.rows[0].flatten(),
        vec![
            Value::Int(3),
            Value::text("carol"),
            Value::Int(75),
            Value::Int(5),
            Value::Int(2),
            Value::float(40.0),
        ]
    );

    let mut buf = Vec::new();
    report.write_csv(&mut buf).unwrap();
    let csv = String::from_utf8(buf).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("ORDER_ID,CUSTOMER_NAME,AMOUNT_CENTS,total_source_records,total_missing_records,missing_percentage")
    );
    assert_eq!(lines.next(), Some("3,carol,75,5,2,40"));
    assert_eq!(lines.next(), Some("5,erin,40,5,2,40"));
    assert_eq!(lines.next(), None);
}

#[test]
fn fixture_generous_tolerance_passes_with_empty_report() {
    let mut config = fixture_config();
    config.tolerance_percentage = 40.5;
    let result = load_and_run(&config);
    assert!(result.passed);
    assert_eq!(result.total_missing_records, 2);
    assert!(build_report(&result).is_clean());
}

#[test]
fn fixture_tolerance_equal_to_percentage_fails() {
    let mut config = fixture_config();
    config.tolerance_percentage = 40.0;
    let result = load_and_run(&config);
    assert!(!result.passed);
}

#[test]
fn fixture_untyped_csv_ids_never_match_json_numbers() {
    // Without a declared type the CSV ids are text; the JSON ids are numbers.
    let mut config = fixture_config();
    config
        .tables
        .get_mut("raw.orders")
        .unwrap()
        .columns
        .remove("ID");
    let result = load_and_run(&config);
    assert_eq!(result.total_missing_records, result.total_source_records);
    assert_eq!(result.missing_percentage, 100.0);
    assert_eq!(result.missing_rows[0][0], Value::text("1"));
}

// -------------------------------------------------------------------------
// In-memory scenarios
// -------------------------------------------------------------------------

const COLUMNS: [&str; 6] = ["ID", "NAME", "AMOUNT", "_FIVETRAN_DELETED", "CREATED_AT", "UPDATED_AT"];

fn order(id: i64, name: &str, amount: i64) -> Vec<Value> {
    vec![
        Value::Int(id),
        Value::text(name),
        Value::Int(amount),
        Value::Bool(false),
        Value::Null,
        Value::Null,
    ]
}

fn orders_config() -> ReconConfig {
    ReconConfig::new(
        "src",
        "tgt",
        vec![ColumnPair::new("NAME", "NAME"), ColumnPair::new("AMOUNT", "AMOUNT")],
    )
}

#[test]
fn ten_thousand_rows_five_missing() {
    let mut source = Table::new(COLUMNS);
    let mut target = Table::new(COLUMNS);
    for id in 0..10_000 {
        let row = order(id, &format!("customer {id}"), id * 3);
        if id % 2_000 != 7 {
            target.push(row.clone());
        }
        source.push(row);
    }
    let catalog = MemoryCatalog::new()
        .with_table("src", source)
        .with_table("tgt", target);

    let mut config = orders_config();
    let result = run(&config, &catalog).unwrap();
    assert_eq!(result.total_source_records, 10_000);
    assert_eq!(result.total_missing_records, 5);
    assert_eq!(result.missing_percentage, 0.05);
    assert!(result.passed);
    assert!(build_report(&result).is_clean());

    config.tolerance_percentage = 0.0;
    let result = run(&config, &catalog).unwrap();
    assert!(!result.passed);
    let report = build_report(&result);
    assert_eq!(report.rows.len(), 5);
    for row in &report.rows {
        assert_eq!(row.total_source_records, 10_000);
        assert_eq!(row.total_missing_records, 5);
        assert_eq!(row.missing_percentage, 0.05);
    }
    assert_eq!(report.rows[0].values[0], Value::Int(7));
}

#[test]
fn empty_source_passes_regardless_of_target() {
    let catalog = MemoryCatalog::new()
        .with_table("src", Table::new(COLUMNS))
        .with_table("tgt", Table::new(COLUMNS).with_row(order(1, "a", 1)));
    let result = run(&orders_config(), &catalog).unwrap();
    assert_eq!(result.total_source_records, 0);
    assert_eq!(result.missing_percentage, 0.0);
    assert!(result.passed);
}

#[test]
fn duplicates_do_not_inflate_missing() {
    let catalog = MemoryCatalog::new()
        .with_table(
            "src",
            Table::new(COLUMNS)
                .with_row(order(1, "a", 10))
                .with_row(order(1, "a", 10))
                .with_row(order(2, "b", 20)),
        )
        .with_table("tgt", Table::new(COLUMNS).with_row(order(1, "a", 10)));
    let result = run(&orders_config(), &catalog).unwrap();
    assert_eq!(result.total_source_records, 3);
    assert_eq!(result.total_missing_records, 1);
    assert_eq!(result.missing_rows, vec![vec![Value::Int(2), Value::text("b"), Value::Int(20)]]);
}

#[test]
fn all_null_reference_does_not_exclude_everything() {
    let with_ts = |id: i64| {
        let mut row = order(id, "x", id);
        row[4] = Value::text("2026-01-01 00:00:00");
        row[5] = Value::text("2026-01-01 00:00:00");
        row
    };
    let source = Table::new(COLUMNS)
        .with_row(with_ts(1))
        .with_row(with_ts(2))
        // null timestamps are excluded once any cutoff is active
        .with_row(order(3, "x", 3));
    let reference = Table::new(["CREATED_AT", "UPDATED_AT"]).with_row(vec![Value::Null, Value::Null]);
    let catalog = MemoryCatalog::new()
        .with_table("src", source)
        .with_table("tgt", Table::new(COLUMNS).with_row(with_ts(1)))
        .with_table("ref", reference);

    let mut config = orders_config();
    config.reference_table = Some("ref".into());
    let result = run(&config, &catalog).unwrap();
    assert_eq!(result.total_source_records, 2);
    assert_eq!(result.total_missing_records, 1);
    let cutoff = result.meta.cutoff.unwrap();
    assert!(cutoff.max_created_at.is_none());
    assert!(cutoff.max_updated_at.is_none());
}

#[test]
fn text_deleted_flag_is_schema_error() {
    let mut row = order(1, "a", 1);
    row[3] = Value::text("false");
    let catalog = MemoryCatalog::new()
        .with_table("src", Table::new(COLUMNS).with_row(row))
        .with_table("tgt", Table::new(COLUMNS));
    let err = run(&orders_config(), &catalog).unwrap_err();
    assert!(matches!(err, ReconError::Schema { ref relation, .. } if relation == "src"));
}

// -------------------------------------------------------------------------
// Scan collaborator behaviour
// -------------------------------------------------------------------------

/// Wraps a catalog, counting scans and optionally failing mid-stream.
struct CountingScanner {
    inner: MemoryCatalog,
    scans: Cell<usize>,
    fail_relation: Option<&'static str>,
}

impl RelationScanner for CountingScanner {
    fn scan<'a>(&'a self, request: &ScanRequest<'_>) -> Result<RowIter<'a>, ReconError> {
        self.scans.set(self.scans.get() + 1);
        let rows = self.inner.scan(request)?;
        if self.fail_relation == Some(request.relation) {
            let failing = rows
                .take(1)
                .chain(std::iter::once(Err(ReconError::Io("connection reset".into()))));
            return Ok(Box::new(failing));
        }
        Ok(rows)
    }
}

fn counting_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_table("src", Table::new(COLUMNS).with_row(order(1, "a", 1)).with_row(order(2, "b", 2)))
        .with_table("tgt", Table::new(COLUMNS).with_row(order(1, "a", 1)))
        .with_table("ref", Table::new(COLUMNS))
}

#[test]
fn one_scan_per_relation() {
    let scanner = CountingScanner {
        inner: counting_catalog(),
        scans: Cell::new(0),
        fail_relation: None,
    };
    let mut config = orders_config();
    run(&config, &scanner).unwrap();
    assert_eq!(scanner.scans.get(), 2);

    config.reference_table = Some("ref".into());
    scanner.scans.set(0);
    run(&config, &scanner).unwrap();
    assert_eq!(scanner.scans.get(), 3);
}

#[test]
fn scan_failure_propagates_without_result() {
    let scanner = CountingScanner {
        inner: counting_catalog(),
        scans: Cell::new(0),
        fail_relation: Some("src"),
    };
    let err = run(&orders_config(), &scanner).unwrap_err();
    assert_eq!(err, ReconError::Io("connection reset".into()));
}

#[test]
fn invalid_config_never_scans() {
    let scanner = CountingScanner {
        inner: counting_catalog(),
        scans: Cell::new(0),
        fail_relation: None,
    };
    let config = ReconConfig::new(
        "src",
        "tgt",
        vec![ColumnPair::new("NAME", "NAME"), ColumnPair::new("NAME", "AMOUNT")],
    );
    let err = run(&config, &scanner).unwrap_err();
    assert!(matches!(err, ReconError::Configuration(_)));
    assert_eq!(scanner.scans.get(), 0);
}
