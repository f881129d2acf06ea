//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: schedulers and CI jobs gate on them.
//!
//! | Code | Meaning                                                |
//! |------|--------------------------------------------------------|
//! | 0    | Reconciliation passed (missing % below tolerance)      |
//! | 1    | Reconciliation failed (missing % at or above tolerance)|
//! | 2    | CLI usage error (bad args)                             |
//! | 3    | Invalid config (TOML, mapping, tolerance, tables)      |
//! | 4    | Schema error (unknown relation/column, bad flag type)  |
//! | 5    | Runtime error (file IO, cancellation, output write)    |

use rowaudit_recon::ErrorKind;

/// Success - reconciliation passed.
pub const EXIT_SUCCESS: u8 = 0;

/// Missing percentage reached the tolerance.
/// Like `diff(1)`, exit 1 means "data differs."
pub const EXIT_RECON_FAILED: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A relation or column did not match what the config expects.
pub const EXIT_SCHEMA: u8 = 4;

/// IO failure or cancelled run.
pub const EXIT_RUNTIME: u8 = 5;

/// Map an engine error classification to its exit code.
pub fn recon_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Configuration => EXIT_INVALID_CONFIG,
        ErrorKind::Schema => EXIT_SCHEMA,
        ErrorKind::Io | ErrorKind::Cancelled => EXIT_RUNTIME,
    }
}
