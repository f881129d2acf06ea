use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty mapping, duplicate column, bad tolerance, etc.).
    Configuration(String),
    /// Relation or column problem surfaced while scanning.
    Schema { relation: String, message: String },
    /// A requested column does not exist in the relation.
    MissingColumn { relation: String, column: String },
    /// IO error from the scan collaborator (file read, etc.).
    Io(String),
    /// Run was cancelled between passes.
    Cancelled,
}

/// Coarse classification used by callers to pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Schema,
    Io,
    Cancelled,
}

impl ReconError {
    pub fn schema(relation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            relation: relation.into(),
            message: message.into(),
        }
    }

    pub fn missing_column(relation: &str, column: &str) -> Self {
        Self::MissingColumn {
            relation: relation.to_string(),
            column: column.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigParse(_) | Self::Configuration(_) => ErrorKind::Configuration,
            Self::Schema { .. } | Self::MissingColumn { .. } => ErrorKind::Schema,
            Self::Io(_) => ErrorKind::Io,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::Configuration(msg) => write!(f, "config validation error: {msg}"),
            Self::Schema { relation, message } => {
                write!(f, "relation '{relation}': {message}")
            }
            Self::MissingColumn { relation, column } => {
                write!(f, "relation '{relation}': missing column '{column}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Cancelled => write!(f, "reconciliation cancelled"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<std::io::Error> for ReconError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(ReconError::ConfigParse("x".into()).kind(), ErrorKind::Configuration);
        assert_eq!(ReconError::Configuration("x".into()).kind(), ErrorKind::Configuration);
        assert_eq!(ReconError::missing_column("t", "c").kind(), ErrorKind::Schema);
        assert_eq!(ReconError::Io("x".into()).kind(), ErrorKind::Io);
        assert_eq!(ReconError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn schema_message_names_relation_and_column() {
        let err = ReconError::missing_column("raw.orders", "AMOUNT");
        assert_eq!(err.to_string(), "relation 'raw.orders': missing column 'AMOUNT'");
    }
}
