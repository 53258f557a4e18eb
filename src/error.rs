//! Error types for Predecir operations.
//!
//! Provides rich error context for library consumers.

use std::fmt;

/// Main error type for Predecir operations.
///
/// Provides detailed context about failures including malformed model
/// definitions, unrecognized missing-value strategies, and degenerate
/// distributions.
///
/// # Examples
///
/// ```
/// use predecir::error::PredecirError;
///
/// let err = PredecirError::UnsupportedStrategy {
///     strategy: "majority_vote".to_string(),
/// };
/// assert!(err.to_string().contains("missing-value strategy"));
/// ```
#[derive(Debug)]
pub enum PredecirError {
    /// A predicate or tree node in the model definition does not match
    /// any of the expected tagged forms.
    InvalidModelStructure {
        /// Description of the offending shape
        message: String,
    },

    /// An unrecognized missing-value strategy token was requested.
    UnsupportedStrategy {
        /// The strategy token as given by the caller
        strategy: String,
    },

    /// A distribution's total weight is zero or negative where a ratio
    /// is required.
    InvalidDistribution {
        /// Description of the degenerate distribution
        message: String,
    },

    /// A predicate or item references a field id absent from the field
    /// dictionary.
    MissingField {
        /// The unresolved field id
        field_id: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for PredecirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredecirError::InvalidModelStructure { message } => {
                write!(f, "Invalid model structure: {message}")
            }
            PredecirError::UnsupportedStrategy { strategy } => {
                write!(f, "Unsupported missing-value strategy: {strategy}")
            }
            PredecirError::InvalidDistribution { message } => {
                write!(f, "Invalid distribution: {message}")
            }
            PredecirError::MissingField { field_id } => {
                write!(f, "Field not found in field dictionary: {field_id}")
            }
            PredecirError::Io(e) => write!(f, "I/O error: {e}"),
            PredecirError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PredecirError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PredecirError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PredecirError {
    fn from(err: std::io::Error) -> Self {
        PredecirError::Io(err)
    }
}

impl From<&str> for PredecirError {
    fn from(msg: &str) -> Self {
        PredecirError::Other(msg.to_string())
    }
}

impl From<String> for PredecirError {
    fn from(msg: String) -> Self {
        PredecirError::Other(msg)
    }
}

/// Convenience result type for Predecir operations.
pub type Result<T> = std::result::Result<T, PredecirError>;

/// Shorthand constructor for `InvalidModelStructure`.
pub(crate) fn invalid_structure(message: impl Into<String>) -> PredecirError {
    PredecirError::InvalidModelStructure {
        message: message.into(),
    }
}
