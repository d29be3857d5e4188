use backtrace::Backtrace;
use serde::{de, ser};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

/// Error kinds for FlatDoc operations
///
/// Each kind names one category of failure so callers can branch on
/// [`FlatDocError::kind`] instead of parsing messages.
///
/// # Examples
///
/// ```rust
/// use flatdoc::errors::{FlatDocError, ErrorKind, FlatDocResult};
///
/// fn example() -> FlatDocResult<()> {
///     Err(FlatDocError::new("Document must be an object", ErrorKind::InvalidDocument))
/// }
/// assert_eq!(example().unwrap_err().kind(), &ErrorKind::InvalidDocument);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Document Errors
    /// A value handed to `insert` is not object-shaped
    InvalidDocument,
    /// The provided document id is invalid
    InvalidId,

    // Naming Errors
    /// Field name cannot be used for an index
    InvalidFieldName,
    /// Collection name cannot be used on disk
    InvalidCollectionName,

    // Query Errors
    /// Error during query evaluation
    FilterError,

    // Index Errors
    /// Persisted index data has an inconsistent shape
    IndexCorrupted,

    // Data Encoding Errors
    /// Error mapping a value to/from a typed representation
    ObjectMappingError,
    /// Malformed persisted content
    EncodingError,

    // IO Errors
    /// Generic IO error
    IOError,
    /// The file was not found
    FileNotFound,
    /// Permission denied for file operation
    PermissionDenied,

    // Operation Errors
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Invalid configuration value
    ValidationError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidDocument => write!(f, "Invalid document"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::InvalidFieldName => write!(f, "Invalid field name"),
            ErrorKind::InvalidCollectionName => write!(f, "Invalid collection name"),
            ErrorKind::FilterError => write!(f, "Filter error"),
            ErrorKind::IndexCorrupted => write!(f, "Index corrupted"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom FlatDoc error type.
///
/// `FlatDocError` carries a message, a kind and an optional cause, and records
/// a backtrace at the point of creation.
///
/// # Examples
///
/// ```rust
/// use flatdoc::errors::{FlatDocError, ErrorKind};
///
/// let cause = FlatDocError::new("unexpected end of input", ErrorKind::EncodingError);
/// let err = FlatDocError::new_with_cause("Failed to load collection", ErrorKind::EncodingError, cause);
/// assert!(err.cause().is_some());
/// ```
#[derive(Clone)]
pub struct FlatDocError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<FlatDocError>>,
    backtrace: Backtrace,
}

impl FlatDocError {
    /// Creates a new `FlatDocError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        FlatDocError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Backtrace::new(),
        }
    }

    /// Creates a new `FlatDocError` wrapping an underlying cause.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: FlatDocError) -> Self {
        FlatDocError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Backtrace::new(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&FlatDocError> {
        self.cause.as_deref()
    }
}

impl Display for FlatDocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for FlatDocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for FlatDocError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for FlatDoc operations.
pub type FlatDocResult<T> = Result<T, FlatDocError>;

impl de::Error for FlatDocError {
    fn custom<T: Display>(msg: T) -> Self {
        FlatDocError::new(&msg.to_string(), ErrorKind::ObjectMappingError)
    }
}

impl ser::Error for FlatDocError {
    fn custom<T: Display>(msg: T) -> Self {
        FlatDocError::new(&msg.to_string(), ErrorKind::ObjectMappingError)
    }
}

impl From<std::io::Error> for FlatDocError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IOError,
        };
        FlatDocError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for FlatDocError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            return FlatDocError::new(&format!("IO error: {}", err), ErrorKind::IOError);
        }
        FlatDocError::new(&format!("JSON error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<regex::Error> for FlatDocError {
    fn from(err: regex::Error) -> Self {
        FlatDocError::new(&format!("Invalid regex: {}", err), ErrorKind::FilterError)
    }
}

impl From<String> for FlatDocError {
    fn from(msg: String) -> Self {
        FlatDocError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for FlatDocError {
    fn from(msg: &str) -> Self {
        FlatDocError::new(msg, ErrorKind::InternalError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatdoc_error_new_creates_error() {
        let error = FlatDocError::new("An error occurred", ErrorKind::IOError);
        assert_eq!(error.message(), "An error occurred");
        assert_eq!(error.kind(), &ErrorKind::IOError);
        assert!(error.cause().is_none());
    }

    #[test]
    fn flatdoc_error_new_with_cause_creates_error() {
        let error = FlatDocError::new_with_cause(
            "Failed to load collection",
            ErrorKind::EncodingError,
            FlatDocError::new("trailing characters", ErrorKind::EncodingError),
        );
        assert_eq!(error.kind(), &ErrorKind::EncodingError);
        let cause = error.cause().map(|c| c.message());
        assert_eq!(cause, Some("trailing characters"));
        assert!(error.source().is_some());
    }

    #[test]
    fn flatdoc_error_display_formats_message_only() {
        let error = FlatDocError::new("Document must be an object", ErrorKind::InvalidDocument);
        assert_eq!(format!("{}", error), "Document must be an object");
    }

    #[test]
    fn flatdoc_error_debug_formats_with_cause() {
        let error = FlatDocError::new_with_cause(
            "outer",
            ErrorKind::IOError,
            FlatDocError::new("inner", ErrorKind::FileNotFound),
        );
        let formatted = format!("{:?}", error);
        assert!(formatted.contains("outer"));
        assert!(formatted.contains("Caused by:"));
        assert!(formatted.contains("inner"));
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidDocument.to_string(), "Invalid document");
        assert_eq!(ErrorKind::IndexCorrupted.to_string(), "Index corrupted");
    }

    #[test]
    fn test_from_io_error_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FlatDocError = io_err.into();
        assert_eq!(err.kind(), &ErrorKind::FileNotFound);
        assert!(err.message().contains("IO error"));
    }

    #[test]
    fn test_from_io_error_permission_denied() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: FlatDocError = io_err.into();
        assert_eq!(err.kind(), &ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_from_io_error_other() {
        let err: FlatDocError = std::io::Error::other("boom").into();
        assert_eq!(err.kind(), &ErrorKind::IOError);
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        let err: FlatDocError = json_err.into();
        assert_eq!(err.kind(), &ErrorKind::EncodingError);
        assert!(err.message().contains("JSON"));
    }

    #[test]
    fn test_from_regex_error() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let err: FlatDocError = regex_err.into();
        assert_eq!(err.kind(), &ErrorKind::FilterError);
    }

    #[test]
    fn test_from_str_and_string() {
        let err: FlatDocError = "plain".into();
        assert_eq!(err.kind(), &ErrorKind::InternalError);
        let err: FlatDocError = String::from("owned").into();
        assert_eq!(err.message(), "owned");
    }

    #[test]
    fn test_question_mark_operator_with_from() {
        fn read_missing() -> FlatDocResult<String> {
            let content = std::fs::read_to_string("/definitely/not/here/flatdoc.json")?;
            Ok(content)
        }

        let err = read_missing().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::FileNotFound);
    }
}
