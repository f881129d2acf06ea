use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::ReconConfig;
use crate::cutoff::resolve_cutoff;
use crate::diff::{build_target_set, subtract};
use crate::error::ReconError;
use crate::filter::RecordFilter;
use crate::mapper::build_projections;
use crate::model::{ReconMeta, ReconResult};
use crate::scan::{RelationScanner, ScanRequest};
use crate::tolerance;

/// Cooperative cancellation, checked between the major passes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn checkpoint(&self) -> Result<(), ReconError> {
        if self.is_cancelled() {
            return Err(ReconError::Cancelled);
        }
        Ok(())
    }
}

/// Run reconciliation per config against relations provided by `scanner`.
pub fn run(config: &ReconConfig, scanner: &dyn RelationScanner) -> Result<ReconResult, ReconError> {
    run_with_cancel(config, scanner, &CancelFlag::new())
}

/// Like [`run`], but stops with [`ReconError::Cancelled`] if `cancel` is set
/// before the reference scan, the target build, or the source scan.
pub fn run_with_cancel(
    config: &ReconConfig,
    scanner: &dyn RelationScanner,
    cancel: &CancelFlag,
) -> Result<ReconResult, ReconError> {
    // Everything configuration-related fails before the first scan.
    config.validate()?;
    let projections = build_projections(
        &config.columns_mapping,
        &config.source_id_column,
        &config.target_id_column,
    )?;

    log::info!(
        "reconciling '{}' -> '{}' over {} column(s), tolerance {}%",
        config.source_table,
        config.target_table,
        projections.width(),
        config.tolerance_percentage,
    );

    // Pass 1: reference
    cancel.checkpoint()?;
    let cutoff = resolve_cutoff(
        scanner,
        config.reference_table.as_deref(),
        &config.reference_criteria(),
    )?;

    // Pass 2: target hash set
    cancel.checkpoint()?;
    let target_plan = RecordFilter::plan(
        &config.target_table,
        &projections.target,
        &config.target_criteria(),
        cutoff.as_ref(),
    );
    let target_rows = scanner.scan(&ScanRequest {
        relation: &config.target_table,
        columns: &target_plan.columns,
    })?;
    let target_set = build_target_set(target_plan.filter.apply(target_rows))?;
    log::debug!("target '{}': {} distinct rows after filtering", config.target_table, target_set.len());

    // Pass 3: stream source
    cancel.checkpoint()?;
    let source_plan = RecordFilter::plan(
        &config.source_table,
        &projections.source,
        &config.source_criteria(),
        cutoff.as_ref(),
    );
    let source_rows = scanner.scan(&ScanRequest {
        relation: &config.source_table,
        columns: &source_plan.columns,
    })?;
    let outcome = subtract(source_plan.filter.apply(source_rows), &target_set)?;
    drop(target_set);

    let verdict = tolerance::evaluate(
        outcome.total_source_records,
        outcome.total_missing_records,
        config.tolerance_percentage,
    );

    log::info!(
        "{} of {} source rows missing ({}%): {}",
        outcome.total_missing_records,
        outcome.total_source_records,
        verdict.missing_percentage,
        if verdict.passed { "pass" } else { "fail" },
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            source_table: config.source_table.clone(),
            target_table: config.target_table.clone(),
            reference_table: config.reference_table.clone(),
            cutoff,
            tolerance_percentage: config.tolerance_percentage,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        columns: projections.target,
        missing_rows: outcome.missing,
        total_source_records: outcome.total_source_records,
        total_missing_records: outcome.total_missing_records,
        missing_percentage: verdict.missing_percentage,
        passed: verdict.passed,
    })
}
