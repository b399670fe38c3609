use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Error kinds for adapter operations
///
/// Every backend translates its native failures into one of these kinds, so
/// callers can branch on the category of failure without knowing which driver
/// produced it.
///
/// # Examples
///
/// ```rust,ignore
/// use trendsense::errors::{DbError, DbResult, ErrorKind};
///
/// fn example() -> DbResult<()> {
///     Err(DbError::new("Adapter is not connected", ErrorKind::StoreNotInitialized))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Connection Errors
    /// The backend could not be reached or refused the connection
    ConnectionError,
    /// The adapter has not been connected yet, or was disconnected
    StoreNotInitialized,

    // Write Errors
    /// A document with the same `_id` already exists
    DuplicateKey,
    /// The provided document id is invalid for the backend
    InvalidId,

    // Query Errors
    /// The filter could not be parsed or translated
    FilterError,
    /// The update specification could not be parsed or applied
    UpdateError,
    /// The aggregation pipeline could not be parsed or translated
    PipelineError,
    /// The operation is not valid in the current context
    InvalidOperation,

    // Encoding Errors
    /// Error mapping a document to or from the backend representation
    ObjectMappingError,

    // Configuration Errors
    /// Invalid or missing configuration value
    ConfigError,
    /// Error reading credentials or other local files
    IOError,

    // Backend Errors
    /// Error reported by the storage backend
    BackendError,

    // Migration Errors
    /// Error while copying collections between adapters
    MigrationError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ConnectionError => write!(f, "Connection error"),
            ErrorKind::StoreNotInitialized => write!(f, "Store not initialized"),
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::FilterError => write!(f, "Filter error"),
            ErrorKind::UpdateError => write!(f, "Update error"),
            ErrorKind::PipelineError => write!(f, "Pipeline error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::ConfigError => write!(f, "Configuration error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::MigrationError => write!(f, "Migration error"),
        }
    }
}

/// Error type returned by every adapter operation.
///
/// `DbError` carries a message, an [ErrorKind], an optional cause and the
/// backtrace captured where it was created.
///
/// # Examples
///
/// ```rust,ignore
/// use trendsense::errors::{DbError, ErrorKind};
///
/// let cause = DbError::new("server selection timeout", ErrorKind::ConnectionError);
/// let err = DbError::new_with_cause("Failed to connect to MongoDB", ErrorKind::ConnectionError, cause);
/// ```
#[derive(Clone)]
pub struct DbError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<DbError>>,
    backtrace: Arc<Backtrace>,
}

impl DbError {
    /// Creates a new `DbError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        DbError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    /// Creates a new `DbError` that wraps the error which caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: DbError) -> Self {
        DbError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&DbError> {
        self.cause.as_deref()
    }

    /// Returns `true` when the backend rejected a write because the `_id`
    /// is already taken.
    pub fn is_duplicate_key(&self) -> bool {
        self.error_kind == ErrorKind::DuplicateKey
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({})\nCaused by: {:?}", self.message, self.error_kind, cause),
            None => {
                let mut backtrace = (*self.backtrace).clone();
                backtrace.resolve();
                write!(f, "{} ({})\n{:?}", self.message, self.error_kind, backtrace)
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for adapter operations.
pub type DbResult<T> = Result<T, DbError>;

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::new(&format!("IO error: {}", err), ErrorKind::IOError)
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        let kind = if err.is_io() {
            ErrorKind::IOError
        } else {
            ErrorKind::ObjectMappingError
        };
        DbError::new(&format!("JSON error: {}", err), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_error_new_creates_error() {
        let error = DbError::new("An error occurred", ErrorKind::BackendError);
        assert_eq!(error.message(), "An error occurred");
        assert_eq!(error.kind(), &ErrorKind::BackendError);
        assert!(error.cause().is_none());
    }

    #[test]
    fn db_error_new_with_cause_creates_error() {
        let cause = DbError::new("socket closed", ErrorKind::ConnectionError);
        let error = DbError::new_with_cause("Ping failed", ErrorKind::ConnectionError, cause);
        assert_eq!(error.message(), "Ping failed");
        assert_eq!(error.cause().map(|c| c.message()), Some("socket closed"));
    }

    #[test]
    fn db_error_display_formats_message_only() {
        let error = DbError::new("An error occurred", ErrorKind::IOError);
        assert_eq!(format!("{}", error), "An error occurred");
    }

    #[test]
    fn db_error_debug_includes_cause() {
        let cause = DbError::new("socket closed", ErrorKind::ConnectionError);
        let error = DbError::new_with_cause("Ping failed", ErrorKind::ConnectionError, cause);
        let formatted = format!("{:?}", error);
        assert!(formatted.contains("Ping failed"));
        assert!(formatted.contains("Caused by:"));
        assert!(formatted.contains("socket closed"));
    }

    #[test]
    fn db_error_source_follows_cause() {
        let plain = DbError::new("plain", ErrorKind::BackendError);
        assert!(plain.source().is_none());

        let chained = DbError::new_with_cause("outer", ErrorKind::BackendError, plain);
        assert!(chained.source().is_some());
    }

    #[test]
    fn duplicate_key_is_detected() {
        let error = DbError::new("E11000 duplicate key", ErrorKind::DuplicateKey);
        assert!(error.is_duplicate_key());
        assert!(!DbError::new("x", ErrorKind::InvalidId).is_duplicate_key());
    }

    #[test]
    fn io_error_converts_to_io_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let error: DbError = io.into();
        assert_eq!(error.kind(), &ErrorKind::IOError);
        assert!(error.message().contains("missing.json"));
    }

    #[test]
    fn json_error_converts_to_mapping_kind() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: DbError = parse.into();
        assert_eq!(error.kind(), &ErrorKind::ObjectMappingError);
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::DuplicateKey.to_string(), "Duplicate key");
        assert_eq!(ErrorKind::StoreNotInitialized.to_string(), "Store not initialized");
        assert_eq!(ErrorKind::ConfigError.to_string(), "Configuration error");
    }
}
