//! Core types and traits for the relay: platform identifiers, persisted
//! message records, the record-store contract, and the reply-chain resolver.

pub mod chain;
pub mod ids;
pub mod record;
pub mod store;

pub use chain::{resolve_chain, ChainError};
pub use ids::{ChatId, MessageId, MessageKey, UserId};
pub use record::MessageRecord;
pub use store::{MemoryStore, RecordStore, StoreError, StoreResult};
