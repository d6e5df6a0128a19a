pub mod config;
pub mod contracts;
pub mod file_store;

pub use config::ServiceConfig;
pub use contracts::{ErrorResponse, ExplodeResponse, PostKind, ReconcileQuery, StockResponse};
pub use file_store::FileStore;
