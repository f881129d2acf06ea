//! `rowaudit run` / `rowaudit validate`: config-driven completeness checks.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use rowaudit_recon::load::load_table_file;
use rowaudit_recon::model::ReconMeta;
use rowaudit_recon::{build_report, MemoryCatalog, ReconConfig, ReconReport, ReconResult};
use serde::Serialize;

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_RECON_FAILED, EXIT_RUNTIME};
use crate::{CliError, OutputFormat};

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

/// JSON document written by `--json` and `--format json`.
#[derive(Serialize)]
struct RunOutput<'a> {
    meta: &'a ReconMeta,
    passed: bool,
    total_source_records: u64,
    total_missing_records: u64,
    missing_percentage: f64,
    columns: &'a [String],
    rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl<'a> RunOutput<'a> {
    fn new(result: &'a ReconResult, report: &'a ReconReport) -> Self {
        Self {
            meta: &result.meta,
            passed: result.passed,
            total_source_records: result.total_source_records,
            total_missing_records: result.total_missing_records,
            missing_percentage: result.missing_percentage,
            columns: &report.columns,
            rows: report.to_json_records(),
        }
    }
}

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        recon_err(EXIT_RUNTIME, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    ReconConfig::from_toml(&config_str).map_err(CliError::recon)
}

/// Relations the run will scan, in scan order.
fn required_relations(config: &ReconConfig) -> Vec<&str> {
    let mut relations: Vec<&str> = Vec::with_capacity(3);
    if let Some(reference) = config.reference_table.as_deref() {
        relations.push(reference);
    }
    for relation in [config.target_table.as_str(), config.source_table.as_str()] {
        if !relations.contains(&relation) {
            relations.push(relation);
        }
    }
    relations
}

fn check_tables_declared(config: &ReconConfig) -> Result<(), CliError> {
    for relation in required_relations(config) {
        if !config.tables.contains_key(relation) {
            return Err(recon_err(
                EXIT_INVALID_CONFIG,
                format!("no [tables] entry for relation '{relation}'"),
            )
            .with_hint(format!("add [tables.\"{relation}\"] with file = \"<path>\"")));
        }
    }
    Ok(())
}

/// Load every relation the run needs, resolving paths against the config's directory.
fn load_catalog(config: &ReconConfig, base_dir: &Path) -> Result<MemoryCatalog, CliError> {
    let mut catalog = MemoryCatalog::new();
    for relation in required_relations(config) {
        // Checked by check_tables_declared.
        let Some(source) = config.tables.get(relation) else {
            continue;
        };
        tracing::debug!(relation, file = %source.file, "loading table");
        let table = load_table_file(relation, source, base_dir).map_err(CliError::recon)?;
        catalog.insert(relation, table);
    }
    Ok(catalog)
}

fn bound<T: std::fmt::Display>(ts: Option<T>) -> String {
    ts.map(|t| t.to_string()).unwrap_or_else(|| "none".into())
}

fn resolve_format(output: &Path, format: Option<OutputFormat>) -> OutputFormat {
    format.unwrap_or_else(|| match output.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => OutputFormat::Csv,
        _ => OutputFormat::Json,
    })
}

fn write_output(
    path: &Path,
    format: OutputFormat,
    report: &ReconReport,
    json_str: &str,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => std::fs::write(path, json_str)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?,
        OutputFormat::Csv => {
            let file = File::create(path)
                .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
            report.write_csv(BufWriter::new(file)).map_err(CliError::recon)?;
        }
    }
    eprintln!("wrote {}", path.display());
    Ok(())
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    format: Option<OutputFormat>,
    tolerance: Option<f64>,
) -> Result<(), CliError> {
    let mut config = load_config(&config_path)?;
    if let Some(tolerance) = tolerance {
        tracing::debug!(
            from = config.tolerance_percentage,
            to = tolerance,
            "tolerance overridden on the command line"
        );
        config.tolerance_percentage = tolerance;
    }
    // Fail on config problems before touching any data file.
    config.validate().map_err(CliError::recon)?;
    check_tables_declared(&config)?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let catalog = load_catalog(&config, base_dir)?;

    let result = rowaudit_recon::run(&config, &catalog).map_err(CliError::recon)?;
    let report = build_report(&result);

    let output = RunOutput::new(&result, &report);
    let json_str = serde_json::to_string_pretty(&output)
        .map_err(|e| recon_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        write_output(path, resolve_format(path, format), &report, &json_str)?;
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    eprintln!(
        "recon '{}': {} of {} source rows missing from '{}' ({}%, tolerance {}%): {}",
        config.name,
        result.total_missing_records,
        result.total_source_records,
        config.target_table,
        result.missing_percentage,
        config.tolerance_percentage,
        if result.passed { "passed" } else { "failed" },
    );
    if let Some(cutoff) = result.meta.cutoff {
        eprintln!(
            "cutoff from '{}': created < {}, updated < {}",
            config.reference_table.as_deref().unwrap_or_default(),
            bound(cutoff.max_created_at),
            bound(cutoff.max_updated_at),
        );
    }

    if !result.passed {
        return Err(recon_err(
            EXIT_RECON_FAILED,
            format!("{} missing row(s) at or above tolerance", result.total_missing_records),
        ));
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    config.validate().map_err(CliError::recon)?;
    check_tables_declared(&config)?;

    eprintln!(
        "valid: recon '{}' {} -> {} with {} mapped column(s), reference: {}, tolerance {}%",
        config.name,
        config.source_table,
        config.target_table,
        config.columns_mapping.len(),
        config.reference_table.as_deref().unwrap_or("none"),
        config.tolerance_percentage,
    );
    Ok(())
}
