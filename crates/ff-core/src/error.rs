//! Error types for the ff-core crate.

use camino::Utf8PathBuf;

/// Errors from configuration loading and validation.
///
/// # Examples
///
/// ```
/// use ff_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingFile(Utf8PathBuf::from("/etc/fastfind.json"));
/// assert!(error.to_string().contains("/etc/fastfind.json"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {0}")]
    MissingFile(Utf8PathBuf),

    /// A configuration value fails validation.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The offending key.
        option: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// An I/O error occurred while reading or writing the file.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON for the config schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Shorthand for an [`ConfigError::InvalidOption`].
    #[must_use]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("indexing_threads", "must be at least 1");
        let msg = error.to_string();
        assert!(msg.contains("indexing_threads"));
        assert!(msg.contains("at least 1"));
    }

    #[test]
    fn test_missing_file_display() {
        let error = ConfigError::MissingFile(Utf8PathBuf::from("/no/such.json"));
        assert!(error.to_string().contains("/no/such.json"));
    }
}
