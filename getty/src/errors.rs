use std::{borrow::Cow, fmt};

use thiserror::Error;

/// Top-level error type returned by the getty repositories.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Validation failed for one or more fields. Raised before any write.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The store could not be reached (non-Redis backends).
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// A conditional commit found a newer version than the one it was planned against.
    #[error("version conflict at {path} (expected {expected:?}, actual {actual})")]
    VersionConflict {
        path: String,
        expected: Option<u64>,
        actual: u64,
    },

    /// Target document was not found when performing a mutation.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// An idempotency guard tripped (e.g. already following).
    #[error("{message}")]
    Conflict { message: String },

    /// A multi-path write committed some paths but not all of them.
    #[error("partial write: {written:?} committed but {failed} failed: {message}")]
    PartialConsistency {
        written: Vec<String>,
        failed: String,
        message: String,
    },

    /// Corrupt documents and other unexpected failures.
    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl RepoError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::Validation(_) => ErrorKind::Validation,
            RepoError::NotFound { .. } => ErrorKind::NotFound,
            RepoError::Conflict { .. } | RepoError::VersionConflict { .. } => ErrorKind::Conflict,
            RepoError::Redis(_) | RepoError::Unavailable { .. } => ErrorKind::Transport,
            RepoError::PartialConsistency { .. } => ErrorKind::PartialConsistency,
            RepoError::Other { .. } => ErrorKind::Internal,
        }
    }

    /// The field or path the error refers to, when one is known.
    pub fn param(&self) -> String {
        match self {
            RepoError::Validation(err) => err.issues.first().map(|issue| issue.field.clone()).unwrap_or_default(),
            RepoError::NotFound { id, .. } => id.clone(),
            RepoError::VersionConflict { path, .. } => path.clone(),
            RepoError::PartialConsistency { failed, .. } => failed.clone(),
            _ => String::new(),
        }
    }

    /// Human-readable message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            RepoError::Validation(err) => err.summary(),
            other => other.to_string(),
        }
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, RepoError::VersionConflict { .. })
    }

    pub(crate) fn corrupt(path: &str, err: serde_json::Error) -> Self {
        RepoError::Other {
            message: Cow::Owned(format!("failed to deserialize document at {path}: {err}")),
        }
    }
}

/// Error categories exposed across the component boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Transport,
    PartialConsistency,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Transport => 503,
            ErrorKind::PartialConsistency | ErrorKind::Internal => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found_error",
            ErrorKind::Conflict => "conflict_error",
            ErrorKind::Transport => "transport_error",
            ErrorKind::PartialConsistency => "partial_consistency_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// `field: message` pairs joined for display in envelopes and CLI output.
    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|issue| format!("{}: {}", issue.field, issue.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Detailed validation failure for a single field or logical path.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_codes() {
        let err = RepoError::conflict("already following");
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.kind().code(), 409);
        assert_eq!(err.message(), "already following");

        let err = RepoError::VersionConflict {
            path: "friends/a".into(),
            expected: Some(1),
            actual: 2,
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.param(), "friends/a");
    }

    #[test]
    fn validation_summary_lists_fields() {
        let err = ValidationError::new([
            ValidationIssue::new("user_id", "validation.required", "field is required"),
            ValidationIssue::new("image", "validation.required", "field is required"),
        ]);
        assert_eq!(
            err.summary(),
            "user_id: field is required; image: field is required"
        );
        let repo: RepoError = err.into();
        assert_eq!(repo.param(), "user_id");
        assert_eq!(repo.kind().as_str(), "validation_error");
    }
}
