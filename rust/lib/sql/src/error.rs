use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// UNIQUE / FOREIGN KEY / CHECK / trigger abort. The payload is the
    /// engine's message, e.g. `UNIQUE constraint failed: node.serial`.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("transaction error: {0}")]
    Transaction(String),
}

impl SQLError {
    pub fn is_constraint(&self) -> bool {
        matches!(self, SQLError::Constraint(_))
    }
}
