//! Error types for Venturer.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Venturer operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    NotFound,

    // Validation (exit 4)
    InvalidStep,
    InvalidArgument,

    // Association graph (exit 5)
    CycleDetected,
    DuplicateAssociation,

    // Templates (exit 6)
    TemplateError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Analysis (exit 9)
    AnalysisError,

    // Auth (exit 10)
    Unauthorized,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidStep => "INVALID_STEP",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::CycleDetected => "CYCLE_DETECTED",
            Self::DuplicateAssociation => "DUPLICATE_ASSOCIATION",
            Self::TemplateError => "TEMPLATE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::AnalysisError => "ANALYSIS_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-10).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::NotFound => 3,
            Self::InvalidStep | Self::InvalidArgument => 4,
            Self::CycleDetected | Self::DuplicateAssociation => 5,
            Self::TemplateError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
            Self::AnalysisError => 9,
            Self::Unauthorized => 10,
        }
    }

    /// Whether a caller should retry with corrected input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidStep | Self::InvalidArgument | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Venturer operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `vt init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} not found: {id} (did you mean: {}?)", similar.join(", "))]
    NotFoundSimilar {
        kind: &'static str,
        id: String,
        similar: Vec<String>,
    },

    #[error("Invalid {field}: {value} (expected {expected})")]
    InvalidStep {
        field: &'static str,
        value: i64,
        expected: &'static str,
    },

    #[error("Association would create a cycle: {from} -> {to}")]
    CycleDetected { from: String, to: String },

    #[error("Association already exists: {from} {relationship} {to}")]
    DuplicateAssociation {
        from: String,
        relationship: String,
        to: String,
    },

    #[error("Invalid template file: {0}")]
    InvalidTemplate(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("No current user")]
    NoCurrentUser,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a not-found error of the given record kind.
    #[must_use]
    pub fn not_found(kind: &'static str, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::NotFound { .. } | Self::NotFoundSimilar { .. } => ErrorCode::NotFound,
            Self::InvalidStep { .. } => ErrorCode::InvalidStep,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::DuplicateAssociation { .. } => ErrorCode::DuplicateAssociation,
            Self::InvalidTemplate(_) => ErrorCode::TemplateError,
            Self::Unauthorized | Self::NoCurrentUser => ErrorCode::Unauthorized,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Analysis(_) => ErrorCode::AnalysisError,
            Self::Io(_) | Self::Csv(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `vt init` to initialize the database".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::NotFound { kind, id } => Some(format!(
                "No {} with ID '{id}'. Use `vt {} list` to see what exists.",
                kind.to_lowercase(),
                command_for_kind(kind)
            )),
            Self::NotFoundSimilar { similar, .. } => {
                Some(format!("Did you mean: {}?", similar.join(", ")))
            }

            Self::InvalidStep { field, .. } => Some(format!(
                "{field} accepts {}. Names also work: high/medium/low, short/medium/long.",
                match *field {
                    "sextant" => "1-6",
                    _ => "1-3",
                }
            )),

            Self::CycleDetected { .. } => Some(
                "parent_of/child_of links must form a tree. Remove the opposite link first \
                 (`vt assoc list <id>`)."
                    .to_string(),
            ),

            Self::DuplicateAssociation { .. } => {
                Some("Use `vt assoc list <id>` to see existing links.".to_string())
            }

            Self::InvalidTemplate(_) => Some(
                "Template files must contain top-level \"version\" and \"template\" keys \
                 (as written by `vt template export`)."
                    .to_string(),
            ),

            Self::Unauthorized => Some(
                "Issue a session token with `vt user token <email>` and send it as \
                 `Authorization: Bearer <token>`."
                    .to_string(),
            ),

            Self::NoCurrentUser => Some(
                "Pass --user <email>, set VT_USER, or run `vt config set default_user <email>`."
                    .to_string(),
            ),

            Self::InvalidArgument(msg) => {
                if msg.contains("status") {
                    Some(
                        "Valid item statuses: todo, in_progress, blocked, completed. \
                         Synonyms: done→completed, wip→in_progress"
                            .to_string(),
                    )
                } else if msg.contains("relationship") {
                    Some(
                        "Valid relationships: blocks, blocked_by, depends_on, aids, aided_by, \
                         relates_to, parent_of, child_of"
                            .to_string(),
                    )
                } else if msg.contains("type") {
                    Some("Valid item types: task, note, idea".to_string())
                } else {
                    None
                }
            }

            Self::Analysis(_) => Some(
                "Check VT_LLM_ENDPOINT / VT_LLM_MODEL or `vt config show`.".to_string(),
            ),

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Csv(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

fn command_for_kind(kind: &str) -> &'static str {
    match kind {
        "Venture" => "venture",
        "Project" => "project",
        "Milestone" => "milestone",
        "Workstream" => "workstream",
        "Association" => "assoc",
        "Team" | "Team member" => "team",
        "Template" => "template",
        "User" => "user",
        _ => "item",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::not_found("Item", "x").exit_code(), 3);
        assert_eq!(
            Error::CycleDetected {
                from: "a".into(),
                to: "b".into()
            }
            .exit_code(),
            5
        );
        assert_eq!(Error::InvalidTemplate("x".into()).exit_code(), 6);
        assert_eq!(Error::Unauthorized.exit_code(), 10);
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::not_found("Venture", "ven_1");
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Venture not found: ven_1");
        assert!(json["error"]["hint"].as_str().unwrap().contains("vt venture list"));
    }

    #[test]
    fn test_unauthorized_message() {
        assert_eq!(Error::Unauthorized.to_string(), "Unauthorized");
    }
}
