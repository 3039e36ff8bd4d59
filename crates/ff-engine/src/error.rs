//! Error types for the ff-engine crate.

/// Query validation and execution errors.
///
/// These surface to the caller before any index state changes; a malformed
/// query never costs a scan.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The query text is empty.
    #[error("empty query")]
    EmptyQuery,

    /// A regex-mode query failed to compile.
    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex {
        /// The pattern as submitted.
        pattern: String,
        /// The compiler's explanation.
        message: String,
    },

    /// The requested mode is disabled by configuration.
    #[error("search mode '{0}' is disabled")]
    ModeDisabled(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_regex_display() {
        let error = QueryError::InvalidRegex {
            pattern: "[".to_owned(),
            message: "unclosed character class".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains('['));
        assert!(msg.contains("unclosed"));
    }
}
