//! Error types and handling for the `LoungeMap` pipeline

use thiserror::Error;

/// Main error type for the `LoungeMap` application
#[derive(Error, Debug)]
pub enum LoungeMapError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Airport reference dataset missing or malformed. Fatal: nothing can be
    /// reconciled without the reference table.
    #[error("Reference data error: {message}")]
    DataLoad { message: String },

    /// Network failure for a single fetch target after retry exhaustion
    #[error("Network error: {message}")]
    Network { message: String },

    /// Rate limiting by the listing source after retry exhaustion
    #[error("Rate limit error: {message}")]
    RateLimit { message: String },

    /// Malformed listing payload
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Page cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl LoungeMapError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new reference data error
    pub fn data_load<S: Into<String>>(message: S) -> Self {
        Self::DataLoad {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new rate limit error
    pub fn rate_limit<S: Into<String>>(message: S) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// True for failures that are isolated to a single work-list item.
    ///
    /// Only `DataLoad` (and setup-time `Config`/`Validation`/`Io`) abort the
    /// run; per-item fetch and parse failures are counted and skipped.
    #[must_use]
    pub fn is_item_local(&self) -> bool {
        matches!(
            self,
            LoungeMapError::Network { .. }
                | LoungeMapError::RateLimit { .. }
                | LoungeMapError::Parse { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            LoungeMapError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            LoungeMapError::DataLoad { message } => {
                format!("Airport reference dataset could not be loaded: {message}")
            }
            LoungeMapError::Network { .. } => {
                "Unable to reach the lounge listing source. Please check your internet connection."
                    .to_string()
            }
            LoungeMapError::RateLimit { .. } => {
                "The lounge listing source is rate limiting requests. Try again later or reduce the worker count."
                    .to_string()
            }
            LoungeMapError::Parse { message } => {
                format!("Listing page could not be parsed: {message}")
            }
            LoungeMapError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            LoungeMapError::Cache { .. } => {
                "Page cache operation failed. You may need to clear the cache directory.".to_string()
            }
            LoungeMapError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let data_err = LoungeMapError::data_load("missing column");
        assert!(matches!(data_err, LoungeMapError::DataLoad { .. }));

        let net_err = LoungeMapError::network("connection failed");
        assert!(matches!(net_err, LoungeMapError::Network { .. }));

        let parse_err = LoungeMapError::parse("no entries");
        assert!(matches!(parse_err, LoungeMapError::Parse { .. }));
    }

    #[test]
    fn test_item_local_classification() {
        assert!(LoungeMapError::network("timeout").is_item_local());
        assert!(LoungeMapError::rate_limit("429").is_item_local());
        assert!(LoungeMapError::parse("bad payload").is_item_local());
        assert!(!LoungeMapError::data_load("missing file").is_item_local());
        assert!(!LoungeMapError::config("bad value").is_item_local());
    }

    #[test]
    fn test_user_messages() {
        let data_err = LoungeMapError::data_load("test");
        assert!(data_err.user_message().contains("reference dataset"));

        let net_err = LoungeMapError::network("test");
        assert!(net_err.user_message().contains("Unable to reach"));

        let validation_err = LoungeMapError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let lounge_err: LoungeMapError = io_err.into();
        assert!(matches!(lounge_err, LoungeMapError::Io { .. }));
    }
}
