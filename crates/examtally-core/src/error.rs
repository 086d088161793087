//! Error types for export parsing and consolidation.
//!
//! Export errors are file-local: the engine records the offending export as
//! skipped and keeps going. Only [`ConsolidationError`] aborts a run.

use thiserror::Error;

/// Errors raised while turning one export into responses.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A cell could not be interpreted.
    #[error("malformed export {source_name}: row {row}, column {column}: {reason}")]
    Malformed {
        source_name: String,
        row: usize,
        column: String,
        reason: String,
    },

    /// The header does not describe a usable schema.
    #[error("malformed export {source_name}: {reason}")]
    MalformedHeader { source_name: String, reason: String },

    /// The CSV itself could not be read.
    #[error("failed to read CSV from {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },
}

impl ExportError {
    /// Name of the export that failed.
    pub fn source_name(&self) -> &str {
        match self {
            ExportError::Malformed { source_name, .. }
            | ExportError::MalformedHeader { source_name, .. }
            | ExportError::Csv { source_name, .. } => source_name,
        }
    }

    /// 1-based data row of the failure, when it is row-specific.
    pub fn row(&self) -> Option<usize> {
        match self {
            ExportError::Malformed { row, .. } => Some(*row),
            _ => None,
        }
    }
}

/// Fatal run-level errors.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    /// Nothing usable was found where exports were expected.
    #[error("no valid exam exports found in {location} (expected one CSV export per exam sitting)")]
    NoValidInput { location: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_error_names_row_and_column() {
        let err = ExportError::Malformed {
            source_name: "e1.csv".into(),
            row: 3,
            column: "Points2".into(),
            reason: "not a number: 'abc'".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("row 3"));
        assert!(msg.contains("Points2"));
        assert_eq!(err.source_name(), "e1.csv");
        assert_eq!(err.row(), Some(3));
    }

    #[test]
    fn no_valid_input_names_location() {
        let err = ConsolidationError::NoValidInput {
            location: "exports/".into(),
        };
        assert!(err.to_string().contains("exports/"));
    }
}
