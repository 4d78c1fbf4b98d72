//! 数据库抽象层
//!
//! 提供账本世界状态的统一读写接口

pub mod traits;
pub mod keys;
pub mod memory;
pub mod redb_db;
pub mod cache;

pub use traits::{StateStore, StoreError, TransactionBuffer};
pub use memory::MemoryStore;
pub use redb_db::{RedbLedger, StoredEvent};
pub use cache::StateCache;
