//! Error types for the model graph.

use thiserror::Error;

/// Main error type for template construction and configuration.
///
/// Per-frame operations never produce these; structural problems are
/// caught once when templates are built.
#[derive(Error, Debug)]
pub enum Error {
    /// Node parent/child indices break topological order or point outside the armature
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// Bad argument to an operation (negative track, length mismatch, empty input)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Matrix cannot be decomposed into scale/rotation/translation without skew
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    /// Drawable or instance request references a missing node, mesh or template
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings JSON could not be parsed
    #[error("Invalid settings: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid hierarchy error.
    pub fn hierarchy(msg: impl Into<String>) -> Self {
        Self::InvalidHierarchy(msg.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid transform error.
    pub fn invalid_transform(msg: impl Into<String>) -> Self {
        Self::InvalidTransform(msg.into())
    }

    /// Create a missing reference error.
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingReference(msg.into())
    }
}

impl From<keyframes::KeyframeError> for Error {
    fn from(e: keyframes::KeyframeError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

/// Result type alias for model graph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::hierarchy("node 3 has parent 5");
        assert!(e.to_string().contains("hierarchy"));
        assert!(e.to_string().contains("node 3"));

        let e = Error::missing("mesh 9");
        assert!(e.to_string().contains("mesh 9"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_keyframes() {
        let err: Error = keyframes::KeyframeError::Empty.into();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
