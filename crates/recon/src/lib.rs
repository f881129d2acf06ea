//! `rowaudit-recon`: source/target completeness reconciliation engine.
//!
//! Pure engine crate: scans relations through a [`RelationScanner`], returns
//! the source rows missing from the target plus a tolerance verdict.
//! No CLI dependencies.

pub mod config;
pub mod cutoff;
pub mod diff;
pub mod engine;
pub mod error;
pub mod filter;
pub mod load;
pub mod mapper;
pub mod model;
pub mod report;
pub mod scan;
pub mod tolerance;
pub mod value;

pub use config::{ColumnPair, ReconConfig};
pub use engine::{run, run_with_cancel, CancelFlag};
pub use error::{ErrorKind, ReconError};
pub use model::{ReconResult, Row, TemporalCutoff};
pub use report::{build_report, ReconReport};
pub use scan::{MemoryCatalog, RelationScanner, ScanRequest, Table};
pub use value::Value;
