use galley_core::{PostError, StateError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Post(#[from] PostError),

    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Domain rejections the operator can fix and retry.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Post(err.into())
    }
}

impl From<StateError> for LedgerError {
    fn from(err: StateError) -> Self {
        LedgerError::Post(err.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
