//! Error types for CSV schema loading and import.

/// Result type for CSV operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for CSV schema/import operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<concur_core::BoxedError>,
}

/// The kind of CSV error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No header file could be discovered in the import directory.
    MissingHeader,
    /// A header cell didn't parse into a known column type.
    InvalidSchema,
    /// A data row had a different column count than the header.
    ColumnCountMismatch,
    /// A [`LineVisitor`](crate::LineVisitor) returned an error for a row.
    VisitorFailed,
    /// Reading or parsing a CSV file failed at the `csv`-crate level.
    Malformed,
}

impl Error {
    /// Creates a new error.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Adds a source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Creates a missing-header error.
    #[must_use]
    pub fn missing_header(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingHeader, message)
    }

    /// Creates an invalid-schema error.
    #[must_use]
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSchema, message)
    }

    /// Creates a column-count-mismatch error.
    #[must_use]
    pub fn column_count_mismatch(expected: usize, found: usize, line_no: u64) -> Self {
        Self::new(
            ErrorKind::ColumnCountMismatch,
            format!("row {line_no}: expected {expected} columns, found {found}"),
        )
    }

    /// Creates a visitor-failed error.
    #[must_use]
    pub fn visitor_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::VisitorFailed, message)
    }

    /// Creates a malformed-CSV error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed, message)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "missing header"),
            Self::InvalidSchema => write!(f, "invalid schema"),
            Self::ColumnCountMismatch => write!(f, "column count mismatch"),
            Self::VisitorFailed => write!(f, "visitor failed"),
            Self::Malformed => write!(f, "malformed csv"),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::malformed(err.to_string()).with_source(err)
    }
}

impl From<Error> for concur_core::Error {
    fn from(err: Error) -> Self {
        let kind = match err.kind {
            ErrorKind::MissingHeader | ErrorKind::InvalidSchema | ErrorKind::ColumnCountMismatch | ErrorKind::Malformed => {
                concur_core::ErrorKind::InvalidArgument
            }
            ErrorKind::VisitorFailed => concur_core::ErrorKind::TaskFailure,
        };
        concur_core::Error::new(kind, err.message.clone()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display_is_human_readable() {
        assert_eq!(ErrorKind::MissingHeader.to_string(), "missing header");
        assert_eq!(ErrorKind::ColumnCountMismatch.to_string(), "column count mismatch");
    }

    #[test]
    fn column_count_mismatch_message_is_descriptive() {
        let err = Error::column_count_mismatch(4, 3, 7);
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains('4'));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn converts_into_concur_core_error_preserving_message() {
        let err = Error::visitor_failed("row 3 rejected");
        let core: concur_core::Error = err.into();
        assert_eq!(core.kind(), concur_core::ErrorKind::TaskFailure);
        assert!(core.message().contains("row 3 rejected"));
    }
}
