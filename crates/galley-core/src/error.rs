use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Input problems found before any mutation happens.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("line {line}: unknown item `{item_id}`")]
    UnknownItem { line: usize, item_id: String },

    #[error("unknown product `{item_id}`")]
    UnknownProduct { item_id: String },

    #[error("unknown location `{location_id}`")]
    UnknownLocation { location_id: String },

    #[error("line {line}: {field} {reason} (got {value})")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        reason: &'static str,
        value: Decimal,
    },

    #[error("{field} {reason} (got {value})")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
        value: Decimal,
    },

    #[error("{kind} has no lines")]
    EmptyDocument { kind: &'static str },

    /// A derived total or balance no longer fits in a decimal.
    #[error("{field} is out of range")]
    OutOfRange { field: &'static str },
}

/// Lifecycle violations: the document is in the wrong state for the request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StateError {
    #[error("{kind} {id} is already {status}")]
    AlreadyPosted {
        kind: &'static str,
        id: Uuid,
        status: &'static str,
    },

    #[error("{kind} {id} is not {expected}")]
    NotEditable {
        kind: &'static str,
        id: Uuid,
        expected: &'static str,
    },

    #[error("transfer source and destination are both `{location_id}`")]
    SameLocation { location_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortfall {
    pub line: usize,
    pub item_id: String,
    pub requested: Decimal,
    pub available: Decimal,
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: `{}` requested {}, available {}",
            self.line, self.item_id, self.requested, self.available
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PostError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("insufficient stock at `{location_id}`: {}", join_shortfalls(.shortfalls))]
    InsufficientStock {
        location_id: String,
        shortfalls: Vec<Shortfall>,
    },
}

fn join_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
