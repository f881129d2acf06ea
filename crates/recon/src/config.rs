use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::FilterCriteria;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub source_table: String,
    pub target_table: String,
    pub columns_mapping: Vec<ColumnPair>,
    #[serde(default)]
    pub reference_table: Option<String>,

    #[serde(default = "default_id_column")]
    pub source_id_column: String,
    #[serde(default = "default_id_column")]
    pub target_id_column: String,

    #[serde(default = "default_deleted_flag")]
    pub source_deleted_flag: String,
    #[serde(default = "default_deleted_flag")]
    pub target_deleted_flag: String,

    #[serde(default = "default_created_col")]
    pub source_created_col: String,
    #[serde(default = "default_updated_col")]
    pub source_updated_col: String,
    #[serde(default = "default_created_col")]
    pub target_created_col: String,
    #[serde(default = "default_updated_col")]
    pub target_updated_col: String,
    #[serde(default = "default_created_col")]
    pub reference_created_col: String,
    #[serde(default = "default_updated_col")]
    pub reference_updated_col: String,

    #[serde(default = "default_tolerance")]
    pub tolerance_percentage: f64,

    /// Where the CLI loads each relation from. Ignored by the engine.
    #[serde(default)]
    pub tables: BTreeMap<String, TableSource>,
}

fn default_name() -> String {
    "reconciliation".into()
}

fn default_id_column() -> String {
    "ID".into()
}

fn default_deleted_flag() -> String {
    "_FIVETRAN_DELETED".into()
}

fn default_created_col() -> String {
    "CREATED_AT".into()
}

fn default_updated_col() -> String {
    "UPDATED_AT".into()
}

fn default_tolerance() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// One `(source, target)` column correspondence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnPair {
    pub source: String,
    pub target: String,
}

impl ColumnPair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table sources (CLI)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TableSource {
    pub file: String,
    #[serde(default)]
    pub format: Option<TableFormat>,
    /// Declared column types. Undeclared CSV columns are text.
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    Csv,
    Json,
    Ndjson,
}

impl TableFormat {
    /// Guess from the file extension; `.jsonl` and `.ndjson` are newline-delimited.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::Ndjson),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Int,
    Float,
    Bool,
    Timestamp,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
            Self::Timestamp => write!(f, "timestamp"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    /// A config with every optional field at its default.
    pub fn new(
        source_table: impl Into<String>,
        target_table: impl Into<String>,
        columns_mapping: Vec<ColumnPair>,
    ) -> Self {
        Self {
            name: default_name(),
            source_table: source_table.into(),
            target_table: target_table.into(),
            columns_mapping,
            reference_table: None,
            source_id_column: default_id_column(),
            target_id_column: default_id_column(),
            source_deleted_flag: default_deleted_flag(),
            target_deleted_flag: default_deleted_flag(),
            source_created_col: default_created_col(),
            source_updated_col: default_updated_col(),
            target_created_col: default_created_col(),
            target_updated_col: default_updated_col(),
            reference_created_col: default_created_col(),
            reference_updated_col: default_updated_col(),
            tolerance_percentage: default_tolerance(),
            tables: BTreeMap::new(),
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that can be checked without scanning.
    ///
    /// Mapping shape is checked by [`crate::mapper::build_projections`].
    pub fn validate(&self) -> Result<(), ReconError> {
        require("source_table", &self.source_table)?;
        require("target_table", &self.target_table)?;
        require("source_id_column", &self.source_id_column)?;
        require("target_id_column", &self.target_id_column)?;
        require("source_deleted_flag", &self.source_deleted_flag)?;
        require("target_deleted_flag", &self.target_deleted_flag)?;

        if !self.tolerance_percentage.is_finite() || self.tolerance_percentage < 0.0 {
            return Err(ReconError::Configuration(format!(
                "tolerance_percentage must be a finite value >= 0, got {}",
                self.tolerance_percentage
            )));
        }

        if let Some(ref reference) = self.reference_table {
            require("reference_table", reference)?;
            for (field, value) in [
                ("source_created_col", &self.source_created_col),
                ("source_updated_col", &self.source_updated_col),
                ("target_created_col", &self.target_created_col),
                ("target_updated_col", &self.target_updated_col),
                ("reference_created_col", &self.reference_created_col),
                ("reference_updated_col", &self.reference_updated_col),
            ] {
                if value.trim().is_empty() {
                    return Err(ReconError::Configuration(format!(
                        "{field} is required when reference_table is set"
                    )));
                }
            }
        }

        crate::mapper::build_projections(
            &self.columns_mapping,
            &self.source_id_column,
            &self.target_id_column,
        )?;

        Ok(())
    }

    pub fn source_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            deleted_flag_column: Some(self.source_deleted_flag.clone()),
            created_column: self.source_created_col.clone(),
            updated_column: self.source_updated_col.clone(),
        }
    }

    pub fn target_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            deleted_flag_column: Some(self.target_deleted_flag.clone()),
            created_column: self.target_created_col.clone(),
            updated_column: self.target_updated_col.clone(),
        }
    }

    pub fn reference_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            deleted_flag_column: None,
            created_column: self.reference_created_col.clone(),
            updated_column: self.reference_updated_col.clone(),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ReconError> {
    if value.trim().is_empty() {
        return Err(ReconError::Configuration(format!("{field} must not be empty")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
