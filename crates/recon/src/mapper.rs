use std::collections::HashSet;

use crate::config::ColumnPair;
use crate::error::ReconError;
use crate::model::Projections;

/// Build `[id] + mapped columns` for each side.
///
/// Fails on an empty mapping, empty names, or a column mapped twice on
/// either side. Column existence is left to the scanner.
pub fn build_projections(
    mapping: &[ColumnPair],
    source_id_column: &str,
    target_id_column: &str,
) -> Result<Projections, ReconError> {
    if mapping.is_empty() {
        return Err(ReconError::Configuration(
            "columns_mapping must contain at least one pair".into(),
        ));
    }

    let mut seen_source = HashSet::new();
    let mut seen_target = HashSet::new();
    let mut source = Vec::with_capacity(mapping.len() + 1);
    let mut target = Vec::with_capacity(mapping.len() + 1);
    source.push(source_id_column.to_string());
    target.push(target_id_column.to_string());

    for (i, pair) in mapping.iter().enumerate() {
        if pair.source.trim().is_empty() || pair.target.trim().is_empty() {
            return Err(ReconError::Configuration(format!(
                "columns_mapping[{i}]: column names must not be empty"
            )));
        }
        if !seen_source.insert(pair.source.as_str()) {
            return Err(ReconError::Configuration(format!(
                "columns_mapping: duplicate source column '{}'",
                pair.source
            )));
        }
        if !seen_target.insert(pair.target.as_str()) {
            return Err(ReconError::Configuration(format!(
                "columns_mapping: duplicate target column '{}'",
                pair.target
            )));
        }
        source.push(pair.source.clone());
        target.push(pair.target.clone());
    }

    Ok(Projections { source, target })
}
