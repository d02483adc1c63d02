//! Errors raised by resource stores.

use std::fmt;

/// Errors that can occur while loading or persisting resources.
#[derive(Debug)]
pub enum StorageError {
    /// Stored data could not be turned into a resource.
    InvalidData {
        message: String,
        cause: Option<String>,
    },

    /// The resource changed between load and store.
    ConcurrentModification {
        key: String,
        expected_version: String,
        actual_version: String,
    },

    /// Generic internal storage error.
    Internal {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidData { message, cause } => match cause {
                Some(cause) => write!(f, "Invalid data: {message} (cause: {cause})"),
                None => write!(f, "Invalid data: {message}"),
            },
            StorageError::ConcurrentModification {
                key,
                expected_version,
                actual_version,
            } => write!(
                f,
                "Concurrent modification detected for {key}: expected version {expected_version}, found {actual_version}"
            ),
            StorageError::Internal { message, .. } => {
                write!(f, "Internal storage error: {message}")
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Internal { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl StorageError {
    pub fn invalid_data_with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn concurrent_modification(
        key: impl fmt::Display,
        expected_version: impl Into<String>,
        actual_version: impl Into<String>,
    ) -> Self {
        Self::ConcurrentModification {
            key: key.to_string(),
            expected_version: expected_version.into(),
            actual_version: actual_version.into(),
        }
    }

    pub fn internal_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source),
        }
    }
}
