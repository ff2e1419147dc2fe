//! Structured configuration issues
//!
//! [`FileConfig::validate`](super::FileConfig::validate) reports every
//! problem it finds as a [`ConfigIssue`]. Warnings fall back to a default and
//! never stop startup; errors do.

use thiserror::Error;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: a default is used instead.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A string field did not parse into its enum
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// A numeric field is outside its allowed range
    OutOfRange { field: String },
    /// A weight table is keyed by an unknown category
    UnknownCategory { section: String, category: String },
    /// Two catalog entries share an id
    DuplicateId { section: String, id: String },
    /// A required string is empty
    EmptyValue { field: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Configuration rejected because of at least one error-level issue
#[derive(Debug, Error)]
#[error("Invalid configuration: {}", .messages.join("; "))]
pub struct ConfigValidationError {
    pub messages: Vec<String>,
}

impl ConfigValidationError {
    /// Fail when any issue is an error; warnings pass through
    pub fn check(issues: &[ConfigIssue]) -> Result<(), ConfigValidationError> {
        let messages: Vec<String> = issues
            .iter()
            .filter(|i| i.is_error())
            .map(|i| i.message.clone())
            .collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(ConfigValidationError { messages })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_ignores_warnings() {
        let issues = vec![ConfigIssue::warning(
            ConfigIssueCode::EmptyValue {
                field: "x".to_string(),
            },
            "x is empty",
        )];
        assert!(ConfigValidationError::check(&issues).is_ok());
    }

    #[test]
    fn test_check_collects_errors() {
        let issues = vec![
            ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "a".to_string(),
                },
                "a out of range",
            ),
            ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "b".to_string(),
                },
                "b out of range",
            ),
        ];
        let err = ConfigValidationError::check(&issues).unwrap_err();
        assert_eq!(err.messages.len(), 2);
        assert_eq!(
            err.to_string(),
            "Invalid configuration: a out of range; b out of range"
        );
    }
}
