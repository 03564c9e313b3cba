use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Callers match on these,
// never on the human-readable message string.

/// Stable error code constants.
pub mod error_code {
    pub const MALFORMED: &str = "MALFORMED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const NOT_INSTALLED: &str = "NOT_INSTALLED";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── TrackerError ────────────────────────────────────────────────────

/// Unified error type for every tracker operation.
///
/// Each variant maps to a stable error code (see [`error_code`]) and a
/// suggested process exit status. Any of them aborts the enclosing
/// transaction; none is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// Identifier, address or rack-slot syntax error. User-correctable.
    #[error("{0}")]
    Malformed(String),

    /// A resolved reference does not exist.
    #[error("{0}")]
    NotFound(String),

    /// State-machine violation, or a uniqueness violation at the store.
    #[error("{0}")]
    Conflict(String),

    /// The component is not installed in any node.
    #[error("{0}")]
    NotInstalled(String),

    /// Unexpected storage failure.
    #[error("{0}")]
    Internal(String),
}

impl TrackerError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            TrackerError::Malformed(_) => error_code::MALFORMED,
            TrackerError::NotFound(_) => error_code::NOT_FOUND,
            TrackerError::Conflict(_) => error_code::CONFLICT,
            TrackerError::NotInstalled(_) => error_code::NOT_INSTALLED,
            TrackerError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// Suggested process exit status for a command-line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            TrackerError::Malformed(_) => 2,
            TrackerError::NotFound(_) => 3,
            TrackerError::Conflict(_) | TrackerError::NotInstalled(_) => 4,
            TrackerError::Internal(_) => 70,
        }
    }

    /// True for state-machine refusals (including `NotInstalled`).
    pub fn is_conflict(&self) -> bool {
        matches!(self, TrackerError::Conflict(_) | TrackerError::NotInstalled(_))
    }
}
