//! The back-office service: posting documents against the Item Master,
//! drafting production, and reporting stock and variance.

pub mod backoffice;
pub mod document;
pub mod error;
pub mod items;
pub mod production;
pub mod queries;

pub use backoffice::{Backoffice, Posted};
pub use document::Document;
pub use error::{LedgerError, LedgerResult};
pub use production::ProductionDraft;
