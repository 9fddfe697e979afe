//! Error types for incident-insight.

use thiserror::Error;

/// All errors produced by incident-insight operations.
///
/// Small samples in confidence intervals and t-tests are not errors:
/// those operations report absent bounds or no result instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InsightError {
    /// Raw input could not be parsed into a table.
    #[error("malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },
    /// No data was loaded; the caller must halt dependent analysis.
    #[error("no dataset loaded")]
    EmptyDataset,
    /// Insufficient data for the requested operation.
    #[error("need at least {min_required} values, got {actual}")]
    InsufficientData { min_required: usize, actual: usize },
    /// Column not found in DataFrame.
    #[error("column '{name}' not found")]
    ColumnNotFound { name: String },
    /// Column is not numeric where numeric data is required.
    #[error("column '{column}' is not numeric")]
    NonNumericColumn { column: String },
    /// A column name would appear twice in the same table.
    #[error("duplicate column name '{name}'")]
    DuplicateColumn { name: String },
    /// Dimension mismatch.
    #[error("expected {expected} elements, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// A caller-supplied parameter is out of range.
    #[error("invalid {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },
    /// I/O error while reading an input source.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for InsightError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = InsightError::MalformedInput {
            line: 3,
            message: "expected 2 fields, got 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed input at line 3: expected 2 fields, got 1"
        );
        assert_eq!(
            InsightError::ColumnNotFound { name: "Ano".into() }.to_string(),
            "column 'Ano' not found"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: InsightError = io.into();
        assert!(matches!(err, InsightError::Io(msg) if msg.contains("gone")));
    }
}
