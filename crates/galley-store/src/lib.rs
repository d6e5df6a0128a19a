pub mod audit;
pub mod memory;
pub mod repository;
pub mod table;

pub use audit::KeyValueEventStore;
pub use memory::InMemoryStore;
pub use repository::{ItemRepository, MasterData, MasterDataRepository, TransactionLogRepository};
pub use table::{Record, Table};
